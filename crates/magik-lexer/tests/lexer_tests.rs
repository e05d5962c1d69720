use magik_common::token::TokenKind;
use magik_lexer::Lexer;

// ── Helpers ──────────────────────────────────────────────────────────────

/// Render one token per line as `Kind "text"`, without the final `Eof`.
fn tokenize_snapshot(source: &str) -> String {
    Lexer::tokenize(source)
        .into_iter()
        .filter(|tok| tok.kind != TokenKind::Eof)
        .map(|tok| {
            let text = &source[tok.span.start as usize..tok.span.end as usize];
            format!("{:?} {:?}", tok.kind, text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Snapshot tests ───────────────────────────────────────────────────────

#[test]
fn test_method_header() {
    insta::assert_snapshot!(tokenize_snapshot("_method sw:object.test(p1, _optional p2)"), @r###"
    Method "_method"
    Ident "sw:object"
    Dot "."
    Ident "test"
    LParen "("
    Ident "p1"
    Comma ","
    Optional "_optional"
    Ident "p2"
    RParen ")"
    "###);
}

#[test]
fn test_operators() {
    insta::assert_snapshot!(tokenize_snapshot("<< ^<< >> ** ~= <> <= >= ~ +<<"), @r###"
    Assign "<<"
    BootAssign "^<<"
    Emit ">>"
    StarStar "**"
    TildeEq "~="
    Diamond "<>"
    LtEq "<="
    GtEq ">="
    Tilde "~"
    Plus "+"
    Assign "<<"
    "###);
}

#[test]
fn test_literals() {
    insta::assert_snapshot!(tokenize_snapshot("1 16rFF 1.5 2e10 'a' \"b\" %c %space :sym :|a b| @glob"), @r###"
    IntLiteral "1"
    IntLiteral "16rFF"
    FloatLiteral "1.5"
    FloatLiteral "2e10"
    StringLiteral "'a'"
    StringLiteral "\"b\""
    CharLiteral "%c"
    CharLiteral "%space"
    SymbolLiteral ":sym"
    SymbolLiteral ":|a b|"
    GlobalRef "@glob"
    "###);
}

#[test]
fn test_comments_are_kept() {
    insta::assert_snapshot!(tokenize_snapshot("## @param {sw:integer} p\n_return p  # type: sw:integer"), @r###"
    DocComment "## @param {sw:integer} p"
    Return "_return"
    Ident "p"
    Comment "# type: sw:integer"
    "###);
}

// ── Focused tests ────────────────────────────────────────────────────────

#[test]
fn test_keywords_case_insensitive() {
    let kinds: Vec<_> = Lexer::tokenize("_IF a _Is _unset _THEN _endif")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::If,
            TokenKind::Ident,
            TokenKind::Is,
            TokenKind::Unset,
            TokenKind::Then,
            TokenKind::EndIf,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_identifier_characters() {
    let source = "is_kind_of? !current_package! |odd name|";
    let texts: Vec<_> = Lexer::tokenize(source)
        .into_iter()
        .filter(|t| t.kind == TokenKind::Ident)
        .map(|t| source[t.span.start as usize..t.span.end as usize].to_string())
        .collect();
    assert_eq!(texts, vec!["is_kind_of?", "!current_package!", "|odd name|"]);
}

#[test]
fn test_unexpected_character_recovers() {
    let (tokens, errors) = Lexer::tokenize_with_errors("a \\ b");
    let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![TokenKind::Ident, TokenKind::Error, TokenKind::Ident, TokenKind::Eof]
    );
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].to_string(), "unexpected character: '\\\\'");
}
