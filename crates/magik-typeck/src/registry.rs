//! Read-only type registry.
//!
//! [`TypeRegistry`] is the seam between the reasoner and whatever stores
//! exemplar, method, procedure, condition and operator signatures. The
//! required methods are plain lookups; the provided methods implement
//! resolution on top of them (package `uses` chains, ancestor method
//! search, operator lookup over unions).
//!
//! [`TypeKeeper`] is the in-memory implementation, filled from a type
//! database by [`crate::type_db`].

use std::rc::Rc;

use magik_parser::ast::ParameterModifier;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::builtins;
use crate::result::ExpressionResult;
use crate::ty::{ProcedureInstance, ProcedureParameter, Type, TypeId};
use crate::type_string::{ResultString, TypeString};

// ── Signatures ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub uses: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFormat {
    #[default]
    Intrinsic,
    Slotted,
    Indexed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotDefinition {
    pub name: String,
    pub type_string: TypeString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exemplar {
    pub name: TypeString,
    pub format: TypeFormat,
    pub slots: Vec<SlotDefinition>,
    /// Kept unresolved so parents may be declared after their children.
    pub parents: Vec<TypeString>,
    pub doc: Option<String>,
}

impl Exemplar {
    pub fn new(name: TypeString, format: TypeFormat) -> Exemplar {
        Exemplar {
            name,
            format,
            slots: Vec::new(),
            parents: Vec::new(),
            doc: None,
        }
    }

    pub fn with_parents(mut self, parents: Vec<TypeString>) -> Exemplar {
        self.parents = parents;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSignature {
    pub name: String,
    pub modifier: ParameterModifier,
    pub type_string: TypeString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub owner: TypeString,
    pub name: String,
    pub modifiers: Vec<String>,
    pub parameters: Vec<ParameterSignature>,
    pub assignment_parameter: Option<ParameterSignature>,
    pub result: ResultString,
    pub loop_result: ResultString,
    pub doc: Option<String>,
}

impl MethodSignature {
    /// Parameters in call order, the assigned value last.
    pub fn all_parameters(&self) -> impl Iterator<Item = &ParameterSignature> {
        self.parameters.iter().chain(self.assignment_parameter.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureSignature {
    /// Global the procedure is bound to, e.g. `sw:write`.
    pub name: TypeString,
    pub procedure_name: Option<String>,
    pub modifiers: Vec<String>,
    pub parameters: Vec<ParameterSignature>,
    pub result: ResultString,
    pub loop_result: ResultString,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionDefinition {
    pub name: String,
    pub parent: Option<String>,
    pub data_names: Vec<String>,
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryOperator {
    pub operator: String,
    pub lhs: TypeString,
    pub rhs: TypeString,
    pub result: TypeString,
}

// ── Registry trait ─────────────────────────────────────────────────────

pub trait TypeRegistry {
    /// Exact lookup of an exemplar by its qualified name.
    fn type_id(&self, name: &TypeString) -> Option<TypeId>;

    /// The qualified name of an exemplar.
    fn type_name(&self, id: TypeId) -> TypeString;

    fn exemplar(&self, id: TypeId) -> Option<&Exemplar>;

    fn package(&self, name: &str) -> Option<&Package>;

    /// Declared type of a global variable.
    fn global(&self, name: &TypeString) -> Option<&TypeString>;

    fn procedure(&self, name: &TypeString) -> Option<&ProcedureSignature>;

    /// Methods named `name` declared directly on `owner`.
    fn local_methods(&self, owner: &TypeString, name: &str) -> Vec<&MethodSignature>;

    fn condition(&self, name: &str) -> Option<&ConditionDefinition>;

    fn binary_operator(
        &self,
        operator: &str,
        lhs: &TypeString,
        rhs: &TypeString,
    ) -> Option<&TypeString>;

    // ── Provided resolution ────────────────────────────────────────────

    /// The package and every package it uses, transitively, breadth first.
    fn package_chain(&self, package: &str) -> Vec<String> {
        let mut chain = vec![package.to_string()];
        let mut seen: FxHashSet<String> = chain.iter().cloned().collect();
        let mut i = 0;
        while i < chain.len() {
            if let Some(pkg) = self.package(&chain[i]) {
                for used in &pkg.uses {
                    if seen.insert(used.clone()) {
                        chain.push(used.clone());
                    }
                }
            }
            i += 1;
        }
        chain
    }

    /// Find an exemplar, falling back through the `uses` chain of the
    /// identifier's package.
    fn lookup_type(&self, name: &TypeString) -> Option<TypeId> {
        if let Some(id) = self.type_id(name) {
            return Some(id);
        }
        let TypeString::Named { package, name } = name else {
            return None;
        };
        self.package_chain(package)
            .iter()
            .skip(1)
            .find_map(|pkg| self.type_id(&TypeString::named(pkg, name)))
    }

    /// Resolve a structural identifier. Unknown names become undefined.
    fn resolve(&self, ts: &TypeString) -> Type {
        match ts {
            TypeString::Named { .. } => self
                .lookup_type(ts)
                .map(Type::Concrete)
                .unwrap_or(Type::Undefined),
            TypeString::SelfType => Type::SelfType,
            TypeString::Undefined => Type::Undefined,
            TypeString::Parameter(name) => Type::Parameter(name.clone()),
            TypeString::Combined(members) => {
                Type::combine_all(members.iter().map(|m| self.resolve(m)))
            }
        }
    }

    fn resolve_result(&self, rs: &ResultString) -> ExpressionResult {
        match rs {
            ResultString::Undefined => ExpressionResult::Undefined,
            ResultString::Types(types) => {
                ExpressionResult::Types(types.iter().map(|ts| self.resolve(ts)).collect())
            }
        }
    }

    /// A well-known `sw` type, or undefined when the registry lacks it.
    fn sw_type(&self, name: &str) -> Type {
        self.resolve(&TypeString::sw(name))
    }

    fn parents(&self, id: TypeId) -> Vec<TypeId> {
        self.exemplar(id)
            .map(|ex| {
                ex.parents
                    .iter()
                    .filter_map(|p| self.lookup_type(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Declared type of a slot on `id` or one of its ancestors.
    fn slot_type(&self, id: TypeId, slot: &str) -> Option<Type> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(exemplar) = self.exemplar(current) else {
                continue;
            };
            if let Some(def) = exemplar.slots.iter().find(|s| s.name == slot) {
                return Some(self.resolve(&def.type_string));
            }
            stack.extend(self.parents(current).into_iter().rev());
        }
        None
    }

    /// Methods answering `name` on `id`. Methods declared on the type
    /// itself win; otherwise every parent is searched and the answers of
    /// all of them are kept, so several mixins can respond.
    fn methods_of(&self, id: TypeId, name: &str) -> Vec<&MethodSignature> {
        let mut found = Vec::new();
        let mut seen = FxHashSet::default();
        collect_methods(self, id, name, &mut seen, &mut found);
        found
    }

    /// Methods for every member of `ty`. Types without a registry entry
    /// answer nothing.
    fn methods(&self, ty: &Type, name: &str) -> Vec<&MethodSignature> {
        let mut found: Vec<&MethodSignature> = Vec::new();
        for member in ty.members() {
            let id = match member {
                Type::Concrete(id) => Some(id),
                Type::Procedure(_) => self.type_id(&TypeString::sw("procedure")),
                _ => None,
            };
            for method in id.map(|id| self.methods_of(id, name)).unwrap_or_default() {
                if !found.iter().any(|m| std::ptr::eq(*m, method)) {
                    found.push(method);
                }
            }
        }
        found
    }

    /// Result of `lhs operator rhs` from the operator table. Every member
    /// pair has to be registered, otherwise the result is undefined.
    fn binary_operator_type(&self, operator: &str, lhs: &Type, rhs: &Type) -> Type {
        let mut results = Vec::new();
        for l in lhs.members() {
            for r in rhs.members() {
                let found =
                    self.binary_operator(operator, &l.type_string(self), &r.type_string(self));
                match found {
                    Some(ts) => results.push(self.resolve(ts)),
                    None => return Type::Undefined,
                }
            }
        }
        Type::combine_all(results)
    }

    /// Resolve a global name as written in source. Qualified names are
    /// looked up directly; plain names search the package and its `uses`
    /// chain. Exemplars win over global variables, which win over
    /// procedures.
    fn resolve_global(&self, package: &str, name: &str) -> Type {
        let candidates = match name.split_once(':') {
            Some((pkg, name)) => vec![TypeString::named(pkg, name)],
            None => self
                .package_chain(package)
                .iter()
                .map(|pkg| TypeString::named(pkg, name))
                .collect(),
        };
        for ts in &candidates {
            if let Some(id) = self.type_id(ts) {
                return Type::Concrete(id);
            }
            if let Some(declared) = self.global(ts) {
                return self.resolve(declared);
            }
            if let Some(signature) = self.procedure(ts) {
                return self.procedure_type(signature);
            }
        }
        Type::Undefined
    }

    /// A procedure value carrying the declared signature.
    fn procedure_type(&self, signature: &ProcedureSignature) -> Type {
        let parameters = signature
            .parameters
            .iter()
            .map(|p| ProcedureParameter {
                name: p.name.clone(),
                modifier: p.modifier,
                ty: self.resolve(&p.type_string),
            })
            .collect();
        Type::Procedure(Rc::new(ProcedureInstance {
            name: signature.procedure_name.clone(),
            parameters,
            result: self.resolve_result(&signature.result),
            loop_result: self.resolve_result(&signature.loop_result),
            definition: None,
        }))
    }

    /// Whether condition `name` is `ancestor` or descends from it.
    fn condition_has_ancestor(&self, name: &str, ancestor: &str) -> bool {
        let mut seen = FxHashSet::default();
        let mut current = Some(name.to_string());
        while let Some(cond) = current {
            if cond == ancestor {
                return true;
            }
            if !seen.insert(cond.clone()) {
                return false;
            }
            current = self.condition(&cond).and_then(|c| c.parent.clone());
        }
        false
    }
}

fn collect_methods<'a, R: TypeRegistry + ?Sized>(
    registry: &'a R,
    id: TypeId,
    name: &str,
    seen: &mut FxHashSet<TypeId>,
    found: &mut Vec<&'a MethodSignature>,
) {
    if !seen.insert(id) {
        return;
    }
    let local = registry.local_methods(&registry.type_name(id), name);
    if !local.is_empty() {
        for method in local {
            if !found.iter().any(|m| std::ptr::eq(*m, method)) {
                found.push(method);
            }
        }
        return;
    }
    for parent in registry.parents(id) {
        collect_methods(registry, parent, name, seen, found);
    }
}

// ── In-memory registry ─────────────────────────────────────────────────

/// In-memory [`TypeRegistry`], seeded with the `sw` and `user` packages and
/// the well-known `sw` exemplars.
#[derive(Debug, Clone, Default)]
pub struct TypeKeeper {
    packages: FxHashMap<String, Package>,
    exemplars: Vec<Exemplar>,
    exemplar_index: FxHashMap<TypeString, TypeId>,
    globals: FxHashMap<TypeString, TypeString>,
    procedures: FxHashMap<TypeString, ProcedureSignature>,
    conditions: FxHashMap<String, ConditionDefinition>,
    methods: FxHashMap<(TypeString, String), Vec<MethodSignature>>,
    operators: FxHashMap<(String, TypeString, TypeString), TypeString>,
}

impl TypeKeeper {
    pub fn new() -> TypeKeeper {
        let mut keeper = TypeKeeper::default();
        builtins::register_builtins(&mut keeper);
        keeper
    }

    /// A keeper with no packages or types at all.
    pub fn empty() -> TypeKeeper {
        TypeKeeper::default()
    }

    pub fn add_package(&mut self, package: Package) {
        match self.packages.get_mut(&package.name) {
            Some(existing) => {
                for used in package.uses {
                    if !existing.uses.contains(&used) {
                        existing.uses.push(used);
                    }
                }
            }
            None => {
                self.packages.insert(package.name.clone(), package);
            }
        }
    }

    /// Add or replace an exemplar. A replaced exemplar keeps its id.
    pub fn add_exemplar(&mut self, exemplar: Exemplar) -> TypeId {
        if let Some(&id) = self.exemplar_index.get(&exemplar.name) {
            self.exemplars[id.index()] = exemplar;
            return id;
        }
        let id = TypeId::new(self.exemplars.len() as u32);
        self.exemplar_index.insert(exemplar.name.clone(), id);
        self.exemplars.push(exemplar);
        id
    }

    pub fn add_method(&mut self, method: MethodSignature) {
        self.methods
            .entry((method.owner.clone(), method.name.clone()))
            .or_default()
            .push(method);
    }

    pub fn add_procedure(&mut self, procedure: ProcedureSignature) {
        self.procedures.insert(procedure.name.clone(), procedure);
    }

    pub fn add_global(&mut self, name: TypeString, type_string: TypeString) {
        self.globals.insert(name, type_string);
    }

    pub fn add_condition(&mut self, condition: ConditionDefinition) {
        self.conditions.insert(condition.name.clone(), condition);
    }

    pub fn add_binary_operator(&mut self, operator: BinaryOperator) {
        self.operators.insert(
            (operator.operator, operator.lhs, operator.rhs),
            operator.result,
        );
    }

    pub fn exemplar_count(&self) -> usize {
        self.exemplars.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.values().map(Vec::len).sum()
    }
}

impl TypeRegistry for TypeKeeper {
    fn type_id(&self, name: &TypeString) -> Option<TypeId> {
        self.exemplar_index.get(name).copied()
    }

    fn type_name(&self, id: TypeId) -> TypeString {
        self.exemplars
            .get(id.index())
            .map(|ex| ex.name.clone())
            .unwrap_or(TypeString::Undefined)
    }

    fn exemplar(&self, id: TypeId) -> Option<&Exemplar> {
        self.exemplars.get(id.index())
    }

    fn package(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    fn global(&self, name: &TypeString) -> Option<&TypeString> {
        self.globals.get(name)
    }

    fn procedure(&self, name: &TypeString) -> Option<&ProcedureSignature> {
        self.procedures.get(name)
    }

    fn local_methods(&self, owner: &TypeString, name: &str) -> Vec<&MethodSignature> {
        self.methods
            .get(&(owner.clone(), name.to_string()))
            .map(|methods| methods.iter().collect())
            .unwrap_or_default()
    }

    fn condition(&self, name: &str) -> Option<&ConditionDefinition> {
        self.conditions.get(name)
    }

    fn binary_operator(
        &self,
        operator: &str,
        lhs: &TypeString,
        rhs: &TypeString,
    ) -> Option<&TypeString> {
        self.operators
            .get(&(operator.to_string(), lhs.clone(), rhs.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(owner: &str, name: &str, result: &str) -> MethodSignature {
        MethodSignature {
            owner: TypeString::parse(owner, "sw"),
            name: name.to_string(),
            modifiers: Vec::new(),
            parameters: Vec::new(),
            assignment_parameter: None,
            result: ResultString::parse(result, "sw"),
            loop_result: ResultString::empty(),
            doc: None,
        }
    }

    fn keeper_with_mixins() -> TypeKeeper {
        let mut keeper = TypeKeeper::new();
        keeper.add_exemplar(
            Exemplar::new(TypeString::sw("rope"), TypeFormat::Slotted).with_parents(vec![
                TypeString::sw("mixin_a"),
                TypeString::sw("mixin_b"),
            ]),
        );
        keeper.add_exemplar(Exemplar::new(TypeString::sw("mixin_a"), TypeFormat::Intrinsic));
        keeper.add_exemplar(Exemplar::new(TypeString::sw("mixin_b"), TypeFormat::Intrinsic));
        keeper.add_method(method("sw:mixin_a", "size", "sw:integer"));
        keeper.add_method(method("sw:mixin_b", "size", "sw:float"));
        keeper
    }

    #[test]
    fn unqualified_names_resolve_through_uses() {
        let keeper = TypeKeeper::new();
        let ty = keeper.resolve(&TypeString::parse("integer", "user"));
        assert_eq!(ty.display(&keeper), "sw:integer");
        assert_eq!(
            keeper.resolve(&TypeString::parse("no_such_type", "user")),
            Type::Undefined
        );
    }

    #[test]
    fn forward_parents_resolve_lazily() {
        let keeper = keeper_with_mixins();
        let rope = keeper.resolve(&TypeString::sw("rope"));
        let Type::Concrete(id) = rope else {
            panic!("rope should resolve");
        };
        assert_eq!(keeper.parents(id).len(), 2);
    }

    #[test]
    fn ancestor_methods_from_every_mixin() {
        let keeper = keeper_with_mixins();
        let rope = keeper.resolve(&TypeString::sw("rope"));
        let found = keeper.methods(&rope, "size");
        let owners: Vec<String> = found.iter().map(|m| m.owner.to_string()).collect();
        assert_eq!(owners, vec!["sw:mixin_a", "sw:mixin_b"]);
    }

    #[test]
    fn local_methods_shadow_parents() {
        let mut keeper = keeper_with_mixins();
        keeper.add_method(method("sw:rope", "size", "sw:bignum"));
        let rope = keeper.resolve(&TypeString::sw("rope"));
        let found = keeper.methods(&rope, "size");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].owner.to_string(), "sw:rope");
    }

    #[test]
    fn global_resolution_order() {
        let mut keeper = TypeKeeper::new();
        keeper.add_global(TypeString::sw("!print_float_precision!"), TypeString::sw("integer"));
        let ty = keeper.resolve_global("user", "!print_float_precision!");
        assert_eq!(ty.display(&keeper), "sw:integer");
        assert_eq!(keeper.resolve_global("user", "sw:float").display(&keeper), "sw:float");
        assert_eq!(keeper.resolve_global("user", "nothing_here"), Type::Undefined);
    }

    #[test]
    fn condition_ancestry() {
        let mut keeper = TypeKeeper::new();
        for (name, parent) in [("error", None), ("file_not_found", Some("error"))] {
            keeper.add_condition(ConditionDefinition {
                name: name.to_string(),
                parent: parent.map(str::to_string),
                data_names: Vec::new(),
                doc: None,
            });
        }
        assert!(keeper.condition_has_ancestor("file_not_found", "error"));
        assert!(!keeper.condition_has_ancestor("warning", "error"));
    }
}
