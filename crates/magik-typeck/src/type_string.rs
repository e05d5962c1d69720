//! Structural type identifiers.
//!
//! A [`TypeString`] names a type without consulting any registry. Two
//! identifiers are equal when they are written the same after package
//! qualification, so they can be used as map keys and compared freely.
//! [`ResultString`] is the positional counterpart used for declared method
//! and procedure results.

use std::collections::BTreeSet;
use std::fmt;

/// Marker for an undefined result in type databases.
pub const UNDEFINED_RESULT: &str = "__UNDEFINED_RESULT__";

pub const SW_PACKAGE: &str = "sw";
pub const USER_PACKAGE: &str = "user";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeString {
    Named { package: String, name: String },
    /// The receiver of the enclosing method.
    SelfType,
    Undefined,
    /// `_parameter(name)`, bound to an argument type at call sites.
    Parameter(String),
    /// Flattened set of at least two members.
    Combined(BTreeSet<TypeString>),
}

impl TypeString {
    pub fn named(package: &str, name: &str) -> TypeString {
        TypeString::Named {
            package: package.to_string(),
            name: name.to_string(),
        }
    }

    /// A type in the `sw` package.
    pub fn sw(name: &str) -> TypeString {
        TypeString::named(SW_PACKAGE, name)
    }

    /// Parse a type annotation such as `integer|sw:float` or `_self`.
    ///
    /// Unqualified names are placed in `package`. Whitespace is ignored and
    /// anything that cannot be read becomes [`TypeString::Undefined`].
    pub fn parse(text: &str, package: &str) -> TypeString {
        let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if text.is_empty() {
            return TypeString::Undefined;
        }
        text.split('|')
            .map(|part| parse_single(part, package))
            .reduce(TypeString::combine)
            .unwrap_or(TypeString::Undefined)
    }

    /// Union of two identifiers. Combined members are flattened, so the
    /// result never nests.
    pub fn combine(self, other: TypeString) -> TypeString {
        let mut members = BTreeSet::new();
        for ts in [self, other] {
            match ts {
                TypeString::Combined(inner) => members.extend(inner),
                single => {
                    members.insert(single);
                }
            }
        }
        if members.len() == 1 {
            if let Some(only) = members.pop_first() {
                return only;
            }
        }
        TypeString::Combined(members)
    }

    /// The members of a combined identifier, or the identifier itself.
    pub fn members(&self) -> Vec<&TypeString> {
        match self {
            TypeString::Combined(members) => members.iter().collect(),
            single => vec![single],
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, TypeString::Undefined)
    }

    pub fn package(&self) -> Option<&str> {
        match self {
            TypeString::Named { package, .. } => Some(package),
            _ => None,
        }
    }
}

fn parse_single(text: &str, package: &str) -> TypeString {
    let lower = text.to_ascii_lowercase();
    match lower.as_str() {
        "_self" | "_clone" => return TypeString::SelfType,
        "_undefined" => return TypeString::Undefined,
        _ => {}
    }

    if let Some(inner) = lower
        .strip_prefix("_parameter(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return if is_name(inner) {
            TypeString::Parameter(inner.to_string())
        } else {
            TypeString::Undefined
        };
    }

    match lower.split_once(':') {
        Some((pkg, name)) if is_name(pkg) && is_name(name) => TypeString::named(pkg, name),
        Some(_) => TypeString::Undefined,
        None if is_name(&lower) => TypeString::named(package, &lower),
        None => TypeString::Undefined,
    }
}

fn is_name(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '?' | '!'))
}

impl fmt::Display for TypeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeString::Named { package, name } => write!(f, "{package}:{name}"),
            TypeString::SelfType => write!(f, "_self"),
            TypeString::Undefined => write!(f, "_undefined"),
            TypeString::Parameter(name) => write!(f, "_parameter({name})"),
            TypeString::Combined(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}

// ── Result strings ─────────────────────────────────────────────────────

/// Declared positional results of a method or procedure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResultString {
    Undefined,
    Types(Vec<TypeString>),
}

impl ResultString {
    /// No values at all.
    pub fn empty() -> ResultString {
        ResultString::Types(Vec::new())
    }

    /// Parse `sw:integer, sw:character` style text. The whole string
    /// `__UNDEFINED_RESULT__` is the undefined result.
    pub fn parse(text: &str, package: &str) -> ResultString {
        let trimmed = text.trim();
        if trimmed == UNDEFINED_RESULT {
            return ResultString::Undefined;
        }
        if trimmed.is_empty() {
            return ResultString::empty();
        }
        ResultString::Types(
            trimmed
                .split(',')
                .map(|part| TypeString::parse(part, package))
                .collect(),
        )
    }
}

impl fmt::Display for ResultString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultString::Undefined => write!(f, "{UNDEFINED_RESULT}"),
            ResultString::Types(types) => {
                for (i, ts) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ts}")?;
                }
                Ok(())
            }
        }
    }
}
