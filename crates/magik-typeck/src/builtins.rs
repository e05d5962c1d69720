//! Built-in packages and exemplars.
//!
//! Every [`TypeKeeper`] starts with the `sw` and `user` packages and the
//! `sw` exemplars the reasoner itself refers to (literal types, the
//! boolean and unset singletons, procedures, conditions, threads). A type
//! database loaded afterwards may replace any of them with a richer
//! definition.

use crate::registry::{Exemplar, Package, TypeFormat, TypeKeeper};
use crate::type_string::{TypeString, SW_PACKAGE, USER_PACKAGE};

pub const OBJECT: &str = "object";
pub const UNSET: &str = "unset";
pub const FALSE: &str = "false";
pub const MAYBE: &str = "maybe";
pub const INTEGER: &str = "integer";
pub const BIGNUM: &str = "bignum";
pub const FLOAT: &str = "float";
pub const CHARACTER: &str = "character";
pub const CHAR16_VECTOR: &str = "char16_vector";
pub const SYMBOL: &str = "symbol";
pub const SIMPLE_VECTOR: &str = "simple_vector";
pub const PROCEDURE: &str = "procedure";
pub const CONDITION: &str = "condition";
pub const GLOBAL_VARIABLE: &str = "global_variable";
pub const LIGHT_THREAD: &str = "light_thread";
pub const HEAVY_THREAD: &str = "heavy_thread";

/// Integer literals above this value are bignums.
pub const BIGNUM_THRESHOLD: i128 = 1 << 29;

/// Register the built-in packages and exemplars.
pub fn register_builtins(keeper: &mut TypeKeeper) {
    // ── Packages ───────────────────────────────────────────────────────

    keeper.add_package(Package {
        name: SW_PACKAGE.to_string(),
        uses: Vec::new(),
    });
    keeper.add_package(Package {
        name: USER_PACKAGE.to_string(),
        uses: vec![SW_PACKAGE.to_string()],
    });

    // ── Exemplars ──────────────────────────────────────────────────────

    keeper.add_exemplar(Exemplar::new(TypeString::sw(OBJECT), TypeFormat::Intrinsic));

    let intrinsic = [
        UNSET,
        FALSE,
        MAYBE,
        INTEGER,
        BIGNUM,
        FLOAT,
        CHARACTER,
        SYMBOL,
        PROCEDURE,
        GLOBAL_VARIABLE,
    ];
    for name in intrinsic {
        keeper.add_exemplar(object_child(name, TypeFormat::Intrinsic));
    }

    let indexed = [CHAR16_VECTOR, SIMPLE_VECTOR];
    for name in indexed {
        keeper.add_exemplar(object_child(name, TypeFormat::Indexed));
    }

    let slotted = [CONDITION, LIGHT_THREAD, HEAVY_THREAD];
    for name in slotted {
        keeper.add_exemplar(object_child(name, TypeFormat::Slotted));
    }
}

fn object_child(name: &str, format: TypeFormat) -> Exemplar {
    Exemplar::new(TypeString::sw(name), format).with_parents(vec![TypeString::sw(OBJECT)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeRegistry;

    #[test]
    fn builtin_types_resolve_from_user() {
        let keeper = TypeKeeper::new();
        for name in [INTEGER, CHAR16_VECTOR, HEAVY_THREAD, GLOBAL_VARIABLE] {
            let ty = keeper.resolve(&TypeString::parse(name, USER_PACKAGE));
            assert_eq!(ty.display(&keeper), format!("sw:{name}"));
        }
        assert_eq!(keeper.exemplar_count(), 16);
    }
}
