//! Literals, atoms, identifiers, slots and parameters.

use magik_parser::ast::{Atom, Literal, NodeId, NodeKind, ParameterModifier};

use crate::builtins;
use crate::diagnostics::NoteKind;
use crate::error::ReasonerError;
use crate::result::ExpressionResult;
use crate::scope::{BindingId, BindingKind};
use crate::ty::Type;
use crate::type_string::TypeString;

use super::LocalTypeReasoner;

impl LocalTypeReasoner<'_> {
    pub(super) fn walk_literal(&mut self, node: NodeId, literal: &Literal) {
        let name = match literal {
            Literal::Integer(value) if *value > builtins::BIGNUM_THRESHOLD => builtins::BIGNUM,
            Literal::Integer(_) => builtins::INTEGER,
            Literal::Float(_) => builtins::FLOAT,
            Literal::String(_) => builtins::CHAR16_VECTOR,
            Literal::Character(_) => builtins::CHARACTER,
            Literal::Symbol(_) => builtins::SYMBOL,
        };
        let ty = self.registry.sw_type(name);
        self.state.set_result(node, ExpressionResult::single(ty));
    }

    pub(super) fn walk_atom(&mut self, node: NodeId, atom: Atom) {
        let ty = match atom {
            Atom::True | Atom::False => self.registry.sw_type(builtins::FALSE),
            Atom::Maybe => self.registry.sw_type(builtins::MAYBE),
            Atom::Unset => self.unset.clone(),
            Atom::ThisThread => self
                .registry
                .sw_type(builtins::LIGHT_THREAD)
                .combine(&self.registry.sw_type(builtins::HEAVY_THREAD)),
            Atom::SelfKw | Atom::Clone => Type::SelfType,
        };
        self.state.set_result(node, ExpressionResult::single(ty));
    }

    /// `_super` is every parent of the method owner, `_super(name)` the
    /// named one.
    pub(super) fn walk_super(&mut self, node: NodeId, parent: Option<&str>) {
        let ty = match self.owner() {
            Type::Concrete(id) => {
                let parents = self.registry.parents(id).into_iter().map(Type::Concrete);
                match parent {
                    Some(name) => {
                        let wanted = self
                            .registry
                            .resolve(&TypeString::parse(name, &self.package));
                        parents
                            .into_iter()
                            .find(|p| *p == wanted)
                            .unwrap_or(Type::Undefined)
                    }
                    None => Type::combine_all(parents),
                }
            }
            _ => Type::Undefined,
        };
        self.state.set_result(node, ExpressionResult::single(ty));
    }

    /// A slot read takes the slot's declared type on the method owner.
    pub(super) fn walk_slot(&mut self, node: NodeId, name: &str) {
        let owner = self.owner();
        let ty = match owner {
            Type::Concrete(id) if self.in_method() => match self.registry.slot_type(id, name) {
                Some(ty) => ty,
                None => {
                    let type_name = owner.display(self.registry);
                    self.note(
                        NoteKind::UnknownSlot {
                            type_name,
                            slot: name.to_string(),
                        },
                        self.ast.span(node),
                    );
                    Type::Undefined
                }
            },
            _ => Type::Undefined,
        };
        self.state.set_result(node, ExpressionResult::single(ty));
    }

    // ── Identifiers ────────────────────────────────────────────────────

    pub(super) fn walk_identifier(&mut self, node: NodeId) -> Result<(), ReasonerError> {
        let Some(binding) = self.scopes.binding_for_node(node) else {
            return Err(self.invariant(node, "identifier without a binding"));
        };
        let result = match self.narrowing.lookup(binding) {
            Some(narrowed) => ExpressionResult::single(narrowed.clone()),
            None => self.binding_result(binding),
        };
        self.state.set_result(node, result);
        Ok(())
    }

    /// What a read of `binding` sees at this point of the walk.
    pub(super) fn binding_result(&self, binding: BindingId) -> ExpressionResult {
        let b = self.scopes.binding(binding);
        match b.kind {
            BindingKind::Global | BindingKind::Dynamic => {
                ExpressionResult::single(self.registry.resolve_global(&self.package, &b.name))
            }
            BindingKind::Import => match b.imported {
                Some(imported) => self.active_result(imported),
                None => ExpressionResult::Undefined,
            },
            BindingKind::Parameter => match self.state.active_node(binding) {
                Some(active) => self.state.result(active),
                None => self.state.result(b.node),
            },
            BindingKind::Local | BindingKind::Constant | BindingKind::Definition => {
                self.active_result(binding)
            }
        }
    }

    fn active_result(&self, binding: BindingId) -> ExpressionResult {
        match self.state.active_node(binding) {
            Some(active) => self.state.result(active),
            None => ExpressionResult::Undefined,
        }
    }

    // ── Parameters ─────────────────────────────────────────────────────

    /// Type a parameter node from its modifier and any `@param {type}`
    /// documentation line.
    pub(super) fn walk_parameter(&mut self, parameter: NodeId, doc: &[String]) -> Type {
        let ast = self.ast;
        let NodeKind::Parameter { name, modifier } = ast.kind(parameter) else {
            return Type::Undefined;
        };
        let ty = match modifier {
            ParameterModifier::Gather => self.registry.sw_type(builtins::SIMPLE_VECTOR),
            _ => match documented_parameter_type(doc, name) {
                Some(text) => {
                    let declared = self
                        .registry
                        .resolve(&TypeString::parse(text, &self.package));
                    if *modifier == ParameterModifier::Optional {
                        declared.combine(&self.unset)
                    } else {
                        declared
                    }
                }
                None => Type::Undefined,
            },
        };
        self.state
            .set_result(parameter, ExpressionResult::single(ty.clone()));
        ty
    }
}

/// The `{type}` of a `@param {type} name` doc line.
fn documented_parameter_type<'d>(doc: &'d [String], parameter: &str) -> Option<&'d str> {
    doc.iter().find_map(|line| {
        let rest = line.trim().strip_prefix("@param")?.trim_start();
        let rest = rest.strip_prefix('{')?;
        let (ty, rest) = rest.split_once('}')?;
        let name = rest.split_whitespace().next()?;
        name.eq_ignore_ascii_case(parameter).then_some(ty.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::documented_parameter_type;

    #[test]
    fn reads_param_doc_lines() {
        let doc = vec![
            "Answers the size.".to_string(),
            "@param {integer} count How many".to_string(),
            "@param {sw:float|sw:unset} ratio".to_string(),
        ];
        assert_eq!(documented_parameter_type(&doc, "count"), Some("integer"));
        assert_eq!(documented_parameter_type(&doc, "ratio"), Some("sw:float|sw:unset"));
        assert_eq!(documented_parameter_type(&doc, "other"), None);
    }
}
