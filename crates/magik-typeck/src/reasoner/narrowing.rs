//! Type restrictions from guard expressions.
//!
//! A guard such as `a _is _unset` or `a.is_kind_of?(integer)` narrows the
//! type of `a` inside the body it governs. Only single guards, optionally
//! negated with `_not`, are recognised; `_and`/`_or` combinations narrow
//! nothing. When a branch of an `_if` leaves the body early, what the other
//! branches leave behind also narrows the statements after the `_if`.
//!
//! Restrictions live in a stack of frames, one per body being walked. A
//! read looks the binding up from the innermost frame outwards, and an
//! assignment drops the binding from every frame.

use std::collections::hash_map::Entry;

use magik_parser::ast::{BinaryOp, NodeId, NodeKind, UnaryOp};
use rustc_hash::FxHashMap;

use crate::builtins;
use crate::scope::BindingId;
use crate::ty::Type;

use super::LocalTypeReasoner;

/// A narrowing of one binding, derived from a guard.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Restriction {
    pub binding: BindingId,
    /// The binding's type where the guard is evaluated.
    pub unrestricted: Type,
    /// The type the guard compares against.
    pub restricted: Type,
    /// The comparison pins the value to exactly `restricted`, as for
    /// `_is _unset`.
    pub exact: bool,
    /// Holds when the comparison fails.
    pub inverted: bool,
}

impl Restriction {
    pub fn not(&self) -> Restriction {
        Restriction {
            inverted: !self.inverted,
            ..self.clone()
        }
    }

    /// The binding's type inside a body where the guard holds.
    pub fn narrowed(&self) -> Type {
        match (self.inverted, self.exact) {
            (false, true) => self.restricted.clone(),
            (false, false) => self.unrestricted.intersection(&self.restricted),
            (true, true) => self.unrestricted.difference(&self.restricted),
            (true, false) => self.unrestricted.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct NarrowingFrames {
    frames: Vec<FxHashMap<BindingId, Type>>,
}

impl NarrowingFrames {
    pub fn push(&mut self, restrictions: Vec<(BindingId, Type)>) {
        self.frames.push(restrictions.into_iter().collect());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn truncate(&mut self, len: usize) {
        self.frames.truncate(len);
    }

    pub fn lookup(&self, binding: BindingId) -> Option<&Type> {
        self.frames
            .iter()
            .rev()
            .find_map(|restrictions| restrictions.get(&binding))
    }

    /// Restrict `binding` for the rest of the innermost body.
    pub fn insert(&mut self, binding: BindingId, ty: Type) {
        if let Some(restrictions) = self.frames.last_mut() {
            restrictions.insert(binding, ty);
        }
    }

    pub fn invalidate(&mut self, binding: BindingId) {
        for restrictions in &mut self.frames {
            restrictions.remove(&binding);
        }
    }
}

/// Types known to hold together on one path, by binding.
pub(super) type Narrowing = FxHashMap<BindingId, Type>;

/// Add `ty` to what is known about `binding`, intersecting with any
/// earlier restriction on the same path.
pub(super) fn restrict(narrowing: &mut Narrowing, binding: BindingId, ty: Type) {
    match narrowing.entry(binding) {
        Entry::Occupied(mut entry) => {
            let both = entry.get().intersection(&ty);
            entry.insert(both);
        }
        Entry::Vacant(entry) => {
            entry.insert(ty);
        }
    }
}

/// Restrictions in binding order, ready for a body frame.
pub(super) fn frame(narrowing: Narrowing) -> Vec<(BindingId, Type)> {
    let mut restrictions: Vec<(BindingId, Type)> = narrowing.into_iter().collect();
    restrictions.sort_by_key(|(binding, _)| *binding);
    restrictions
}

/// What holds inside a body whose guard imposed `restrictions`.
pub(super) fn holding(restrictions: &[Restriction]) -> Narrowing {
    let mut narrowing = Narrowing::default();
    for r in restrictions {
        restrict(&mut narrowing, r.binding, r.narrowed());
    }
    narrowing
}

impl LocalTypeReasoner<'_> {
    /// The restrictions a walked guard expression imposes, if it is one of
    /// the recognised idioms. An identity test between two variables
    /// narrows both of them.
    pub(super) fn restrictions(&self, guard: NodeId) -> Vec<Restriction> {
        let ast = self.ast;
        match ast.kind(guard) {
            NodeKind::Tuple { elements } if elements.len() == 1 => self.restrictions(elements[0]),
            NodeKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.restrictions(*operand).iter().map(Restriction::not).collect(),
            NodeKind::Binary { op, left, right } => {
                let inverted = match op {
                    BinaryOp::Is | BinaryOp::Eq => false,
                    BinaryOp::Isnt | BinaryOp::Neq | BinaryOp::Ne => true,
                    _ => return Vec::new(),
                };
                let identity = matches!(op, BinaryOp::Is | BinaryOp::Isnt);
                [(*left, *right), (*right, *left)]
                    .into_iter()
                    .filter(|&(subject, other)| {
                        self.is_identifier(subject)
                            && (identity || matches!(ast.kind(other), NodeKind::Literal(_)))
                    })
                    .filter_map(|(subject, other)| {
                        let binding = self.scopes.binding_for_node(subject)?;
                        let restricted = self.state.result(other).nth(0, &self.unset);
                        Some(Restriction {
                            binding,
                            unrestricted: self.state.result(subject).nth(0, &self.unset),
                            exact: self.is_singleton(&restricted),
                            restricted,
                            inverted,
                        })
                    })
                    .collect()
            }
            NodeKind::MethodInvocation {
                receiver,
                name,
                arguments,
            } if name == "is_kind_of?()" || name == "is_class_of?()" => {
                let [argument] = arguments.as_slice() else {
                    return Vec::new();
                };
                if !self.is_identifier(*receiver) {
                    return Vec::new();
                }
                let Some(binding) = self.scopes.binding_for_node(*receiver) else {
                    return Vec::new();
                };
                vec![Restriction {
                    binding,
                    unrestricted: self.state.result(*receiver).nth(0, &self.unset),
                    restricted: self.state.result(*argument).nth(0, &self.unset),
                    exact: true,
                    inverted: false,
                }]
            }
            _ => Vec::new(),
        }
    }

    fn is_identifier(&self, node: NodeId) -> bool {
        matches!(self.ast.kind(node), NodeKind::Identifier { .. })
    }

    /// `sw:unset` and `sw:maybe` each have a single instance.
    fn is_singleton(&self, ty: &Type) -> bool {
        !ty.is_undefined()
            && (*ty == self.unset || *ty == self.registry.sw_type(builtins::MAYBE))
    }

    /// Narrow the statements after an `_if` that has a branch leaving the
    /// body early.
    ///
    /// `falling_through` holds what is known at the end of every branch
    /// that does not leave: a clause's own guard plus the failure of the
    /// guards before it, or the failure of every guard for the `_else` (or
    /// a missing one). A binding is narrowed to the union over those
    /// branches when each of them restricts it and no branch reassigned it.
    pub(super) fn narrow_upper_body(
        &mut self,
        if_node: NodeId,
        falling_through: &[Narrowing],
        guarded: &FxHashMap<BindingId, Option<NodeId>>,
    ) {
        let ast = self.ast;
        let in_body = ast.parent(if_node).is_some_and(|parent| {
            matches!(
                ast.kind(parent),
                NodeKind::Body { .. } | NodeKind::Module { .. }
            )
        });
        let Some(first) = falling_through.first() else {
            return;
        };
        if !in_body {
            return;
        }
        let mut bindings: Vec<BindingId> = first.keys().copied().collect();
        bindings.sort();
        for binding in bindings {
            let unchanged = guarded
                .get(&binding)
                .is_some_and(|&before| self.state.active_node(binding) == before);
            if !unchanged {
                continue;
            }
            let mut types = Vec::with_capacity(falling_through.len());
            for branch in falling_through {
                match branch.get(&binding) {
                    Some(ty) if !ty.is_undefined() => types.push(ty.clone()),
                    _ => break,
                }
            }
            if types.len() != falling_through.len() {
                continue;
            }
            tracing::trace!(?binding, "narrowing the rest of the body");
            self.narrowing.insert(binding, Type::combine_all(types));
        }
    }

    /// Whether a body always leaves through `_return` or an error raise.
    pub(super) fn body_exits(&self, body: NodeId) -> bool {
        match self.ast.kind(body) {
            NodeKind::Body { statements } => statements.iter().any(|&s| self.exits_body(s)),
            _ => false,
        }
    }

    /// `_return ...` or `condition.raise(:name)` for an error condition.
    fn exits_body(&self, statement: NodeId) -> bool {
        let ast = self.ast;
        match ast.kind(statement) {
            NodeKind::Return { .. } => true,
            NodeKind::MethodInvocation {
                receiver,
                name,
                arguments,
            } if name == "raise()" => {
                let is_condition = matches!(
                    ast.kind(*receiver),
                    NodeKind::Identifier { name } if name == "condition" || name == "sw:condition"
                );
                let raised = arguments.first().and_then(|&arg| match ast.kind(arg) {
                    NodeKind::Literal(magik_parser::ast::Literal::Symbol(symbol)) => {
                        Some(symbol.as_str())
                    }
                    _ => None,
                });
                is_condition
                    && raised.is_some_and(|sym| self.registry.condition_has_ancestor(sym, "error"))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::TypeId;

    fn t(i: u32) -> Type {
        Type::Concrete(TypeId::new(i))
    }

    fn some_binding() -> BindingId {
        let parse = magik_parser::parse("a");
        let ast = parse.ast();
        let scopes = crate::scope::ScopeTree::build(ast);
        let id = ast
            .ids()
            .find(|&n| matches!(ast.kind(n), NodeKind::Identifier { .. }))
            .unwrap();
        scopes.binding_for_node(id).unwrap()
    }

    fn restriction(exact: bool) -> Restriction {
        Restriction {
            binding: some_binding(),
            unrestricted: Type::combine_all([t(1), t(2)]),
            restricted: if exact { t(1) } else { t(2).combine(&t(3)) },
            exact,
            inverted: false,
        }
    }

    #[test]
    fn exact_guards_pin_and_exclude() {
        let r = restriction(true);
        assert_eq!(r.narrowed(), t(1));
        assert_eq!(r.not().narrowed(), t(2));
        assert_eq!(r.not().not(), r);
    }

    #[test]
    fn inexact_guards_intersect_but_never_exclude() {
        let r = restriction(false);
        assert_eq!(r.narrowed(), t(2));
        assert_eq!(r.not().narrowed(), Type::combine_all([t(1), t(2)]));
    }

    #[test]
    fn frames_shadow_and_invalidate() {
        let r = restriction(true);
        let mut frames = NarrowingFrames::default();
        frames.push(vec![(r.binding, t(1))]);
        frames.push(vec![(r.binding, t(2))]);
        assert_eq!(frames.lookup(r.binding), Some(&t(2)));
        frames.pop();
        assert_eq!(frames.lookup(r.binding), Some(&t(1)));
        frames.insert(r.binding, t(3));
        frames.invalidate(r.binding);
        assert_eq!(frames.lookup(r.binding), None);
    }
}
