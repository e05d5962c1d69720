//! Multi-value expression results.

use crate::registry::TypeRegistry;
use crate::ty::Type;
use crate::type_string::ResultString;

/// The outcome of evaluating an expression: zero or more simultaneous
/// values, or undefined when nothing could be determined.
///
/// `Types(vec![])` (see [`ExpressionResult::empty`]) is a definition that
/// produces no values; [`ExpressionResult::Undefined`] is "unknown".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExpressionResult {
    Undefined,
    Types(Vec<Type>),
}

impl ExpressionResult {
    pub fn empty() -> ExpressionResult {
        ExpressionResult::Types(Vec::new())
    }

    pub fn single(ty: Type) -> ExpressionResult {
        ExpressionResult::Types(vec![ty])
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, ExpressionResult::Undefined)
    }

    pub fn types(&self) -> &[Type] {
        match self {
            ExpressionResult::Undefined => &[],
            ExpressionResult::Types(types) => types,
        }
    }

    /// The type at position `index`. Positions past the end read as
    /// `default`; every position of an undefined result is undefined.
    pub fn nth(&self, index: usize, default: &Type) -> Type {
        match self {
            ExpressionResult::Undefined => Type::Undefined,
            ExpressionResult::Types(types) => types.get(index).unwrap_or(default).clone(),
        }
    }

    /// Position-wise union. The shorter side is padded with `default`.
    /// An undefined side contributes nothing.
    pub fn combine(&self, other: &ExpressionResult, default: &Type) -> ExpressionResult {
        let (left, right) = match (self, other) {
            (ExpressionResult::Undefined, known) | (known, ExpressionResult::Undefined) => {
                return known.clone()
            }
            (ExpressionResult::Types(left), ExpressionResult::Types(right)) => (left, right),
        };
        let len = left.len().max(right.len());
        let types = (0..len)
            .map(|i| {
                let l = left.get(i).unwrap_or(default);
                let r = right.get(i).unwrap_or(default);
                l.combine(r)
            })
            .collect();
        ExpressionResult::Types(types)
    }

    pub fn substitute(&self, from: &Type, to: &Type) -> ExpressionResult {
        match self {
            ExpressionResult::Undefined => ExpressionResult::Undefined,
            ExpressionResult::Types(types) => {
                ExpressionResult::Types(types.iter().map(|t| t.substitute(from, to)).collect())
            }
        }
    }

    pub fn result_string(&self, registry: &(impl TypeRegistry + ?Sized)) -> ResultString {
        match self {
            ExpressionResult::Undefined => ResultString::Undefined,
            ExpressionResult::Types(types) => {
                ResultString::Types(types.iter().map(|t| t.type_string(registry)).collect())
            }
        }
    }

    /// Render as `sw:integer, sw:character`, or `__UNDEFINED_RESULT__`.
    pub fn display(&self, registry: &(impl TypeRegistry + ?Sized)) -> String {
        self.result_string(registry).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::TypeId;

    fn t(i: u32) -> Type {
        Type::Concrete(TypeId::new(i))
    }

    #[test]
    fn nth_pads_with_default() {
        let result = ExpressionResult::Types(vec![t(1), t(2)]);
        assert_eq!(result.nth(1, &t(9)), t(2));
        assert_eq!(result.nth(2, &t(9)), t(9));
        assert_eq!(ExpressionResult::Undefined.nth(0, &t(9)), Type::Undefined);
    }

    #[test]
    fn combine_is_positional() {
        let unset = t(0);
        let a = ExpressionResult::Types(vec![t(1)]);
        let b = ExpressionResult::Types(vec![t(2), t(3)]);
        let combined = a.combine(&b, &unset);
        assert_eq!(
            combined,
            ExpressionResult::Types(vec![t(1).combine(&t(2)), t(3).combine(&unset)])
        );
        assert_eq!(combined, b.combine(&a, &unset));
        assert_eq!(a.combine(&a, &unset), a);
        assert_eq!(ExpressionResult::Undefined.combine(&a, &unset), a);
        assert_eq!(
            ExpressionResult::empty().combine(&a, &unset),
            ExpressionResult::Types(vec![t(1).combine(&unset)])
        );
    }

    #[test]
    fn substituting_an_absent_placeholder_is_a_no_op() {
        let result = ExpressionResult::Types(vec![t(1), t(2).combine(&t(3))]);
        assert_eq!(result.substitute(&Type::SelfType, &t(7)), result);
        let selfish = ExpressionResult::Types(vec![Type::SelfType, Type::SelfType]);
        assert_eq!(
            selfish.substitute(&Type::SelfType, &t(7)),
            ExpressionResult::Types(vec![t(7), t(7)])
        );
    }
}
