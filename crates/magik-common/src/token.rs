use serde::Serialize;

use crate::span::Span;

/// A token produced by the Magik lexer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Create a new token from a kind and byte offsets.
    pub fn new(kind: TokenKind, start: u32, end: u32) -> Self {
        Self {
            kind,
            span: Span::new(start, end),
        }
    }
}

/// Every kind of token in Magik.
///
/// Keywords carry their leading underscore in source (`_method`, `_is`) and
/// are matched case-insensitively. Newlines are not tokens; statements are
/// delimited by the expression grammar itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    // ── Keywords ───────────────────────────────────────────────────────
    Package,
    Method,
    EndMethod,
    Proc,
    EndProc,
    Private,
    Iter,
    Abstract,
    Local,
    Constant,
    Global,
    Dynamic,
    Import,
    If,
    Then,
    Elif,
    Else,
    EndIf,
    For,
    Over,
    While,
    Loop,
    EndLoop,
    Block,
    EndBlock,
    Try,
    With,
    When,
    EndTry,
    Return,
    Leave,
    Continue,
    Loopbody,
    Is,
    Isnt,
    And,
    Or,
    Xor,
    Andif,
    Orif,
    Not,
    Div,
    Mod,
    Cf,
    /// `_self`. Named `SelfKw` to avoid clashing with Rust's `Self`.
    SelfKw,
    Clone,
    Super,
    True,
    False,
    Maybe,
    Unset,
    ThisThread,
    Gather,
    Optional,
    Scatter,
    AllResults,

    // ── Operators ──────────────────────────────────────────────────────
    /// `<<`
    Assign,
    /// `^<<`
    BootAssign,
    /// `>>`
    Emit,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `**`
    StarStar,
    /// `/`
    Slash,
    /// `=`
    Eq,
    /// `~=`
    TildeEq,
    /// `<>`
    Diamond,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `~`
    Tilde,

    // ── Delimiters ─────────────────────────────────────────────────────
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    // ── Punctuation ────────────────────────────────────────────────────
    Comma,
    Dot,
    Semicolon,
    /// `$`, the transmit marker separating top-level chunks.
    Dollar,

    // ── Literals ───────────────────────────────────────────────────────
    /// Integer literal, e.g. `42`, `16rFF`.
    IntLiteral,
    /// Float literal, e.g. `3.14`, `1e10`.
    FloatLiteral,
    /// `"text"` or `'text'`.
    StringLiteral,
    /// `%a`, `%space`.
    CharLiteral,
    /// `:name`, `:|quoted name|`.
    SymbolLiteral,
    /// `@name`. Doubles as a block or loop label.
    GlobalRef,

    // ── Identifiers and comments ───────────────────────────────────────
    /// Identifier, optionally package-qualified (`sw:rope`).
    Ident,
    /// `# ...`
    Comment,
    /// `## ...`
    DocComment,

    // ── Special ────────────────────────────────────────────────────────
    Eof,
    /// Invalid input. Used for error recovery.
    Error,
}

impl TokenKind {
    /// Comments are trivia: the parser collects them but never matches on them.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::DocComment)
    }
}

/// Look up a keyword from its source text, including the leading underscore.
///
/// Matching is case-insensitive, as in Magik itself.
pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
    let lower = s.to_ascii_lowercase();
    let kind = match lower.as_str() {
        "_package" => TokenKind::Package,
        "_method" => TokenKind::Method,
        "_endmethod" => TokenKind::EndMethod,
        "_proc" => TokenKind::Proc,
        "_endproc" => TokenKind::EndProc,
        "_private" => TokenKind::Private,
        "_iter" => TokenKind::Iter,
        "_abstract" => TokenKind::Abstract,
        "_local" => TokenKind::Local,
        "_constant" => TokenKind::Constant,
        "_global" => TokenKind::Global,
        "_dynamic" => TokenKind::Dynamic,
        "_import" => TokenKind::Import,
        "_if" => TokenKind::If,
        "_then" => TokenKind::Then,
        "_elif" => TokenKind::Elif,
        "_else" => TokenKind::Else,
        "_endif" => TokenKind::EndIf,
        "_for" => TokenKind::For,
        "_over" => TokenKind::Over,
        "_while" => TokenKind::While,
        "_loop" => TokenKind::Loop,
        "_endloop" => TokenKind::EndLoop,
        "_block" => TokenKind::Block,
        "_endblock" => TokenKind::EndBlock,
        "_try" => TokenKind::Try,
        "_with" => TokenKind::With,
        "_when" => TokenKind::When,
        "_endtry" => TokenKind::EndTry,
        "_return" => TokenKind::Return,
        "_leave" => TokenKind::Leave,
        "_continue" => TokenKind::Continue,
        "_loopbody" => TokenKind::Loopbody,
        "_is" => TokenKind::Is,
        "_isnt" => TokenKind::Isnt,
        "_and" => TokenKind::And,
        "_or" => TokenKind::Or,
        "_xor" => TokenKind::Xor,
        "_andif" => TokenKind::Andif,
        "_orif" => TokenKind::Orif,
        "_not" => TokenKind::Not,
        "_div" => TokenKind::Div,
        "_mod" => TokenKind::Mod,
        "_cf" => TokenKind::Cf,
        "_self" => TokenKind::SelfKw,
        "_clone" => TokenKind::Clone,
        "_super" => TokenKind::Super,
        "_true" => TokenKind::True,
        "_false" => TokenKind::False,
        "_maybe" => TokenKind::Maybe,
        "_unset" => TokenKind::Unset,
        "_thisthread" => TokenKind::ThisThread,
        "_gather" => TokenKind::Gather,
        "_optional" => TokenKind::Optional,
        "_scatter" => TokenKind::Scatter,
        "_allresults" => TokenKind::AllResults,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_is_case_insensitive() {
        assert_eq!(keyword_from_str("_method"), Some(TokenKind::Method));
        assert_eq!(keyword_from_str("_ENDMETHOD"), Some(TokenKind::EndMethod));
        assert_eq!(keyword_from_str("_Self"), Some(TokenKind::SelfKw));
        assert_eq!(keyword_from_str("_allresults"), Some(TokenKind::AllResults));
    }

    #[test]
    fn keyword_lookup_rejects_identifiers() {
        assert_eq!(keyword_from_str("method"), None);
        assert_eq!(keyword_from_str("_methodx"), None);
        assert_eq!(keyword_from_str(""), None);
    }

    #[test]
    fn comments_are_trivia() {
        assert!(TokenKind::Comment.is_trivia());
        assert!(TokenKind::DocComment.is_trivia());
        assert!(!TokenKind::Ident.is_trivia());
    }

    #[test]
    fn token_new_constructor() {
        let tok = Token::new(TokenKind::Assign, 10, 12);
        assert_eq!(tok.span, Span::new(10, 12));
    }
}
