use std::io::Write;

use magik_typeck::error::TypeDbError;
use magik_typeck::registry::TypeRegistry;
use magik_typeck::type_db::{read_types, read_types_str};
use magik_typeck::type_string::{ResultString, TypeString};
use magik_typeck::{Type, TypeKeeper};

// ── Helpers ──────────────────────────────────────────────────────────────

fn load(db: &str) -> TypeKeeper {
    let mut keeper = TypeKeeper::new();
    let summary = read_types_str(db, &mut keeper);
    assert!(summary.errors.is_empty(), "{:?}", summary.errors);
    keeper
}

fn resolve(keeper: &TypeKeeper, name: &str) -> Type {
    keeper.resolve(&TypeString::parse(name, "user"))
}

// ── Loading ──────────────────────────────────────────────────────────────

#[test]
fn types_methods_and_globals_load() {
    let keeper = load(
        r#"
{"instruction": "package", "name": "geo", "uses": ["sw"]}
{"instruction": "type", "type_name": "geo:point", "type_format": "slotted", "slots": [{"name": "x", "type_name": "float"}], "parents": ["sw:object"]}
{"instruction": "method", "type_name": "sw:object", "method_name": "describe()", "return_types": ["sw:char16_vector"]}
{"instruction": "global", "name": "geo:!origin!", "type_name": "point"}
"#,
    );
    let point = resolve(&keeper, "geo:point");
    assert_eq!(point.display(&keeper), "geo:point");

    let Type::Concrete(id) = point else {
        panic!("geo:point should be concrete");
    };
    assert_eq!(
        keeper.slot_type(id, "x").map(|t| t.display(&keeper)),
        Some("sw:float".to_string())
    );

    // Inherited from sw:object.
    let methods = keeper.methods(&point, "describe()");
    assert_eq!(methods.len(), 1);
    assert_eq!(methods[0].owner, TypeString::sw("object"));

    let origin = keeper.resolve_global("geo", "!origin!");
    assert_eq!(origin.display(&keeper), "geo:point");
}

#[test]
fn undefined_results_are_kept_apart_from_empty_ones() {
    let keeper = load(
        r#"
{"instruction": "method", "type_name": "sw:integer", "method_name": "a", "return_types": "__UNDEFINED_RESULT__"}
{"instruction": "method", "type_name": "sw:integer", "method_name": "b", "return_types": []}
{"instruction": "method", "type_name": "sw:integer", "method_name": "c"}
"#,
    );
    let integer = TypeString::sw("integer");
    let result = |name: &str| keeper.local_methods(&integer, name)[0].result.clone();
    assert_eq!(result("a"), ResultString::Undefined);
    assert_eq!(result("b"), ResultString::Types(Vec::new()));
    assert_eq!(result("c"), ResultString::Undefined);
}

#[test]
fn setter_methods_split_off_the_assigned_value() {
    let keeper = load(
        r#"{"instruction": "method", "type_name": "sw:object", "method_name": "name<<", "parameters": [{"name": "new_name", "type_name": "sw:symbol"}], "return_types": ["_parameter(new_name)"]}"#,
    );
    let method = keeper.local_methods(&TypeString::sw("object"), "name<<")[0];
    assert!(method.parameters.is_empty());
    let assigned = method
        .assignment_parameter
        .as_ref()
        .expect("assignment parameter");
    assert_eq!(assigned.name, "new_name");
    assert_eq!(assigned.type_string, TypeString::sw("symbol"));
}

#[test]
fn keyword_operators_are_normalised() {
    let keeper = load(
        r#"
{"instruction": "binary_operator", "operator": "_AND", "lhs_type": "sw:integer", "rhs_type": "sw:integer", "return_type": "sw:integer"}
{"instruction": "binary_operator", "operator": "+", "lhs_type": "sw:integer", "rhs_type": "sw:float", "return_type": "sw:float"}
"#,
    );
    let integer = resolve(&keeper, "integer");
    let float = resolve(&keeper, "float");
    assert_eq!(
        keeper.binary_operator_type("and", &integer, &integer).display(&keeper),
        "sw:integer"
    );
    assert_eq!(
        keeper.binary_operator_type("+", &integer, &float).display(&keeper),
        "sw:float"
    );
    // Every member pair must be registered.
    let either = integer.combine(&float);
    assert!(keeper.binary_operator_type("+", &either, &float).is_undefined());
}

#[test]
fn conditions_know_their_ancestors() {
    let keeper = load(
        r#"
{"instruction": "condition", "name": "error"}
{"instruction": "condition", "name": "bad_index", "parent": "error", "data_name_list": ["index"]}
{"instruction": "condition", "name": "warning"}
"#,
    );
    assert!(keeper.condition_has_ancestor("bad_index", "error"));
    assert!(keeper.condition_has_ancestor("error", "error"));
    assert!(!keeper.condition_has_ancestor("warning", "error"));
    assert!(!keeper.condition_has_ancestor("unknown", "error"));
}

// ── Errors ───────────────────────────────────────────────────────────────

#[test]
fn bad_lines_are_skipped_with_their_line_number() {
    let mut keeper = TypeKeeper::new();
    let text = r#"{"instruction": "type", "type_name": "sw:rope"}

{"instruction": "no_such_thing"}
{"instruction": "method", "type_name": "sw:rope", "method_name": "size", "return_types": ["sw:integer"]}"#;
    let summary = read_types_str(text, &mut keeper);
    assert_eq!(summary.instructions, 2);
    assert_eq!(summary.errors.len(), 1);
    assert!(matches!(summary.errors[0], TypeDbError::Json { line: 3, .. }));
    assert!(summary.errors[0].to_string().starts_with("line 3: "));
    assert_eq!(keeper.local_methods(&TypeString::sw("rope"), "size").len(), 1);
}

#[test]
fn files_load_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{"instruction": "type", "type_name": "sw:rope", "parents": ["sw:object"]}}"#
    )
    .unwrap();
    let mut keeper = TypeKeeper::new();
    let summary = read_types(file.path(), &mut keeper).unwrap();
    assert_eq!(summary.instructions, 1);
    assert!(!resolve(&keeper, "rope").is_undefined());
}

#[test]
fn missing_files_are_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.jsonl");
    let mut keeper = TypeKeeper::new();
    let err = read_types(&path, &mut keeper).unwrap_err();
    assert!(matches!(err, TypeDbError::Io { .. }));
    assert!(err.to_string().contains("absent.jsonl"), "{err}");
}
