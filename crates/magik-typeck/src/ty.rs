//! Resolved types.
//!
//! [`Type`] is what a [`TypeString`] becomes once it has been looked up in a
//! [`TypeRegistry`]. Concrete types are handles into the registry; unions,
//! the self-type, parameter references and the undefined type are explicit
//! variants so that combination and substitution never depend on dynamic
//! dispatch.

use std::collections::BTreeSet;
use std::rc::Rc;

use magik_parser::ast::{NodeId, ParameterModifier};

use crate::registry::TypeRegistry;
use crate::result::ExpressionResult;
use crate::type_string::TypeString;

/// Handle to an exemplar held by a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    pub fn new(index: u32) -> TypeId {
        TypeId(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    Concrete(TypeId),
    /// Set of at least two members, none of them combined or undefined.
    Combined(BTreeSet<Type>),
    SelfType,
    Parameter(String),
    Undefined,
    /// A first-class procedure with its own invoke signature.
    Procedure(Rc<ProcedureInstance>),
}

/// Signature of a procedure value, either inferred from a `_proc`
/// definition or taken from the type database.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcedureInstance {
    pub name: Option<String>,
    pub parameters: Vec<ProcedureParameter>,
    pub result: ExpressionResult,
    pub loop_result: ExpressionResult,
    /// The defining node when the procedure was inferred from source.
    pub definition: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcedureParameter {
    pub name: String,
    pub modifier: ParameterModifier,
    pub ty: Type,
}

impl Type {
    /// Union of two types.
    ///
    /// Members are flattened. The undefined type only survives when neither
    /// side carries anything else.
    pub fn combine(&self, other: &Type) -> Type {
        Type::combine_all([self.clone(), other.clone()])
    }

    pub fn combine_all(types: impl IntoIterator<Item = Type>) -> Type {
        let mut members = BTreeSet::new();
        for ty in types {
            match ty {
                Type::Combined(inner) => members.extend(inner),
                Type::Undefined => {}
                single => {
                    members.insert(single);
                }
            }
        }
        Type::from_members(members)
    }

    fn from_members(mut members: BTreeSet<Type>) -> Type {
        match members.len() {
            0 => Type::Undefined,
            1 => members.pop_first().unwrap_or(Type::Undefined),
            _ => Type::Combined(members),
        }
    }

    /// The members of a union, or the type itself.
    pub fn members(&self) -> Vec<Type> {
        match self {
            Type::Combined(members) => members.iter().cloned().collect(),
            single => vec![single.clone()],
        }
    }

    pub fn contains(&self, ty: &Type) -> bool {
        match self {
            Type::Combined(members) => members.contains(ty),
            single => single == ty,
        }
    }

    /// Members shared by both types. An undefined side carries no
    /// information and yields the other side.
    pub fn intersection(&self, other: &Type) -> Type {
        if self.is_undefined() {
            return other.clone();
        }
        if other.is_undefined() {
            return self.clone();
        }
        let members = self
            .members()
            .into_iter()
            .filter(|m| other.contains(m))
            .collect();
        Type::from_members(members)
    }

    /// Members of `self` that are not in `other`.
    pub fn difference(&self, other: &Type) -> Type {
        let members = self
            .members()
            .into_iter()
            .filter(|m| !other.contains(m))
            .collect();
        Type::from_members(members)
    }

    /// Replace every occurrence of `from` with `to`, through unions.
    pub fn substitute(&self, from: &Type, to: &Type) -> Type {
        if self == from {
            return to.clone();
        }
        match self {
            Type::Combined(members) => {
                Type::combine_all(members.iter().map(|m| m.substitute(from, to)))
            }
            other => other.clone(),
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Type::Undefined)
    }

    /// Whether the type is fully known: concrete types and procedures, or
    /// unions made only of those.
    pub fn is_known(&self) -> bool {
        match self {
            Type::Concrete(_) | Type::Procedure(_) => true,
            Type::Combined(members) => members.iter().all(Type::is_known),
            Type::SelfType | Type::Parameter(_) | Type::Undefined => false,
        }
    }

    /// The structural identifier this type was resolved from.
    pub fn type_string(&self, registry: &(impl TypeRegistry + ?Sized)) -> TypeString {
        match self {
            Type::Concrete(id) => registry.type_name(*id),
            Type::Combined(members) => members
                .iter()
                .map(|m| m.type_string(registry))
                .reduce(TypeString::combine)
                .unwrap_or(TypeString::Undefined),
            Type::SelfType => TypeString::SelfType,
            Type::Parameter(name) => TypeString::Parameter(name.clone()),
            Type::Undefined => TypeString::Undefined,
            Type::Procedure(_) => TypeString::sw("procedure"),
        }
    }

    /// Render as type-string text, e.g. `sw:integer|sw:unset`.
    pub fn display(&self, registry: &(impl TypeRegistry + ?Sized)) -> String {
        self.type_string(registry).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(i: u32) -> Type {
        Type::Concrete(TypeId::new(i))
    }

    #[test]
    fn combine_flattens_and_absorbs_undefined() {
        let ab = t(1).combine(&t(2));
        assert_eq!(ab.combine(&t(3)).members().len(), 3);
        assert_eq!(t(1).combine(&Type::Undefined), t(1));
        assert_eq!(Type::Undefined.combine(&Type::Undefined), Type::Undefined);
        assert_eq!(ab.combine(&ab), ab);
        assert_eq!(t(2).combine(&t(1)), t(1).combine(&t(2)));
    }

    #[test]
    fn intersection_and_difference() {
        let abc = Type::combine_all([t(1), t(2), t(3)]);
        assert_eq!(abc.intersection(&t(2)), t(2));
        assert_eq!(abc.difference(&t(2)), t(1).combine(&t(3)));
        assert_eq!(t(1).intersection(&t(2)), Type::Undefined);
        assert_eq!(Type::Undefined.intersection(&t(4)), t(4));
        assert_eq!(t(1).difference(&t(1)), Type::Undefined);
    }

    #[test]
    fn substitute_reaches_into_unions() {
        let ty = Type::SelfType.combine(&t(1));
        assert_eq!(ty.substitute(&Type::SelfType, &t(2)), t(1).combine(&t(2)));
        assert_eq!(t(1).substitute(&Type::SelfType, &t(2)), t(1));
        let param = Type::Parameter("x".to_string());
        assert_eq!(param.substitute(&param, &t(5)), t(5));
    }

    #[test]
    fn known_types() {
        assert!(t(1).combine(&t(2)).is_known());
        assert!(!Type::SelfType.combine(&t(1)).is_known());
        assert!(!Type::Undefined.is_known());
    }
}
