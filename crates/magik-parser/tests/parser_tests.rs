use magik_parser::ast::{NodeKind, ParameterModifier};
use magik_parser::{parse, Parse};

// ── Helpers ──────────────────────────────────────────────────────────────

/// Parse `source`, assert it is error free and render the tree.
fn dump(source: &str) -> String {
    let parse = parse_ok(source);
    let ast = parse.ast();
    ast.dump(ast.root()).trim_end().to_string()
}

fn parse_ok(source: &str) -> Parse {
    let parse = parse(source);
    assert!(parse.ok(), "unexpected errors: {:?}", parse.errors());
    parse
}

fn error_messages(parse: &Parse) -> Vec<String> {
    parse.errors().iter().map(|e| e.to_string()).collect()
}

fn first_statement(parse: &Parse) -> &NodeKind {
    let ast = parse.ast();
    let NodeKind::Module { statements } = ast.kind(ast.root()) else {
        panic!("root is not a module");
    };
    ast.kind(statements[0])
}

// ── Definitions ──────────────────────────────────────────────────────────

#[test]
fn test_method_definition() {
    let source = "\
_method sw:object.test(p1, _optional p2)
    ## Doc line.
    _local a << p1 + 1
    _return a
_endmethod";
    insta::assert_snapshot!(dump(source), @r###"
    Module
      MethodDefinition sw:object.test()
        Parameter p1
        Parameter _optional p2
        Body
          VariableDefinitionStatement Local
            VariableDefinition
              Identifier a
              Binary +
                Identifier p1
                Literal Integer(1)
          Return
            Identifier a
    "###);
}

#[test]
fn test_method_doc_lines() {
    let source = "\
_method a.b
    ## First line.
    ## Second line.
    _return 1
_endmethod";
    let parse = parse(source);
    let NodeKind::MethodDefinition(def) = first_statement(&parse) else {
        panic!("expected a method definition");
    };
    assert_eq!(def.doc, vec!["First line.", "Second line."]);
}

#[test]
fn test_assignment_method_names() {
    let parse = parse("_method a.b << val _endmethod");
    let NodeKind::MethodDefinition(def) = first_statement(&parse) else {
        panic!("expected a method definition");
    };
    assert_eq!(def.name, "b<<");
    assert!(def.assignment_parameter.is_some());

    let parse = parse_ok("_private _iter _method rope[i, j] ^<< v _endmethod");
    let NodeKind::MethodDefinition(def) = first_statement(&parse) else {
        panic!("expected a method definition");
    };
    assert_eq!(def.name, "[]^<<");
    assert_eq!(def.parameters.len(), 2);
    assert!(def.modifiers.private);
    assert!(def.modifiers.iter);
    assert!(!def.modifiers.is_abstract);
}

#[test]
fn test_procedure_and_multiple_assignment() {
    let source = "\
(a, b) << _proc @p(x, _gather y) >> x _endproc
a +<< 1";
    insta::assert_snapshot!(dump(source), @r###"
    Module
      MultipleAssignment
        Identifier a
        Identifier b
        ProcedureDefinition p
          Parameter x
          Parameter _gather y
          Body
            Emit
              Identifier x
      Assignment +<<
        Identifier a
        Literal Integer(1)
    "###);
}

#[test]
fn test_optional_applies_to_following_parameters() {
    let parse = parse_ok("_proc(a, _optional b, c) _endproc");
    let ast = parse.ast();
    let modifiers: Vec<_> = ast
        .ids()
        .filter_map(|id| match ast.kind(id) {
            NodeKind::Parameter { modifier, .. } => Some(*modifier),
            _ => None,
        })
        .collect();
    assert_eq!(
        modifiers,
        vec![
            ParameterModifier::None,
            ParameterModifier::Optional,
            ParameterModifier::Optional,
        ]
    );
}

// ── Control flow ─────────────────────────────────────────────────────────

#[test]
fn test_if_elif_else() {
    let source = "_if a _is _unset _then b << 1 _elif c _then _return _else d.e(1, 2) _endif";
    insta::assert_snapshot!(dump(source), @r###"
    Module
      If
        IfClause
          Binary is
            Identifier a
            Atom Unset
          Body
            Assignment <<
              Identifier b
              Literal Integer(1)
        IfClause
          Identifier c
          Body
            Return
        Body
          MethodInvocation e()
            Identifier d
            Literal Integer(1)
            Literal Integer(2)
    "###);
}

#[test]
fn test_labelled_for_loop() {
    let source = "_for i, j _over x.fast_keys_and_elements() _loop @outer _leave @outer _with i _endloop";
    insta::assert_snapshot!(dump(source), @r###"
    Module
      Loop outer
        Identifier i
        Identifier j
        MethodInvocation fast_keys_and_elements()
          Identifier x
        Body
          Leave outer
            Identifier i
    "###);
}

#[test]
fn test_loop_as_returned_value() {
    let source = "_return _loop _leave _with 1 _endloop";
    insta::assert_snapshot!(dump(source), @r###"
    Module
      Return
        Loop
          Body
            Leave
              Literal Integer(1)
    "###);
}

#[test]
fn test_for_header_stops_at_loop() {
    let parse = parse("_for a _over _loop _endloop");
    assert_eq!(
        error_messages(&parse),
        vec!["expected expression, found `_loop`"]
    );
    let NodeKind::Loop { body, .. } = first_statement(&parse) else {
        panic!("expected a loop");
    };
    let ast = parse.ast();
    assert!(matches!(ast.kind(*body), NodeKind::Body { statements } if statements.is_empty()));
}

#[test]
fn test_if_clauses_and_try_keep_their_bodies() {
    let source = "\
_if a _then b _elif c _then d _else e _endif
_try f _when error g _endtry";
    insta::assert_snapshot!(dump(source), @r###"
    Module
      If
        IfClause
          Identifier a
          Body
            Identifier b
        IfClause
          Identifier c
          Body
            Identifier d
        Body
          Identifier e
      Try
        Body
          Identifier f
        When error
          Body
            Identifier g
    "###);
}

#[test]
fn test_try_when() {
    let source = "\
_try _with cond
    x[1] << 2
_when error, warning
    _return cond
_endtry";
    insta::assert_snapshot!(dump(source), @r###"
    Module
      Try
        Identifier cond
        Body
          Assignment <<
            MethodInvocation []
              Identifier x
              Literal Integer(1)
            Literal Integer(2)
        When error, warning
          Body
            Return
              Identifier cond
    "###);
}

#[test]
fn test_operator_precedence() {
    insta::assert_snapshot!(dump("a + b * c _is d _orif _not e"), @r###"
    Module
      Binary orif
        Binary is
          Binary +
            Identifier a
            Binary *
              Identifier b
              Identifier c
          Identifier d
        Unary Not
          Identifier e
    "###);
}

#[test]
fn test_names_are_case_insensitive() {
    insta::assert_snapshot!(dump("Foo.Bar(:Sym, |Quoted|)"), @r###"
    Module
      MethodInvocation bar()
        Identifier foo
        Literal Symbol("sym")
        Identifier Quoted
    "###);
}

// ── Error recovery ───────────────────────────────────────────────────────

#[test]
fn test_unclosed_method_points_at_opener() {
    let parse = parse("_method a.b _return 1");
    assert_eq!(
        error_messages(&parse),
        vec!["expected `_endmethod`, found end of file"]
    );
    let (message, _) = parse.errors()[0]
        .related
        .clone()
        .expect("related span");
    assert_eq!(message, "`_method` opened here");
}

#[test]
fn test_recovers_at_dollar() {
    let parse = parse("x << $\n_method a.b _endmethod");
    assert_eq!(
        error_messages(&parse),
        vec!["expected expression, found `$`"]
    );
    let ast = parse.ast();
    let has_method = ast
        .ids()
        .any(|id| matches!(ast.kind(id), NodeKind::MethodDefinition(_)));
    assert!(has_method, "the method after `$` should still parse");
    assert!(ast.contains_error(ast.root()));
}

#[test]
fn test_literal_is_not_assignable() {
    let parse = parse("1 << a\nb << 2");
    assert_eq!(error_messages(&parse), vec!["invalid assignment target"]);
    assert_eq!(parse.errors()[0].span.start, 0);
    assert!(matches!(first_statement(&parse), NodeKind::Error));
}

#[test]
fn test_lex_errors_are_reported_once() {
    let parse = parse("a \\ b");
    assert_eq!(error_messages(&parse), vec!["unexpected character: '\\\\'"]);
}

#[test]
fn test_parents_are_linked() {
    let parse = parse_ok("_block _return a.b _endblock");
    let ast = parse.ast();
    let ident = ast
        .ids()
        .find(|&id| matches!(ast.kind(id), NodeKind::Identifier { .. }))
        .expect("identifier");
    let kinds: Vec<_> = ast.ancestors(ident).map(|a| ast.kind(a).name()).collect();
    assert_eq!(
        kinds,
        vec!["MethodInvocation", "Return", "Body", "Block", "Module"]
    );
}
