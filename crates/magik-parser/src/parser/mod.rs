//! Recursive descent parser for Magik.
//!
//! The parser consumes the token stream from `magik-lexer` and allocates
//! nodes straight into an [`Ast`] arena. Children are always allocated
//! before their parent, which lets [`Ast::alloc`] wire up parent links as
//! soon as the parent exists.
//!
//! # Trivia
//!
//! Comment tokens are split off before parsing starts. They end up in
//! [`Ast::comments`] so that doc comments and `# type:` instructions can be
//! matched to nodes by position.
//!
//! # Error recovery
//!
//! Problems never abort the parse. The parser records a [`ParseError`],
//! allocates an `Error` node in place of the broken construct and carries
//! on. Statement loops guarantee progress by skipping a token whenever a
//! statement consumed nothing.

pub(crate) mod definitions;
pub(crate) mod expressions;
pub(crate) mod statements;

use magik_common::span::Span;
use magik_common::token::{Token, TokenKind};

use crate::ast::{Ast, Comment, NodeId, NodeKind};
use crate::error::ParseError;

pub(crate) struct Parser<'src> {
    /// Significant tokens only, ending with `Eof`.
    tokens: Vec<Token>,
    pos: usize,
    source: &'src str,
    pub(crate) ast: Ast,
    comments: Vec<Comment>,
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(tokens: Vec<Token>, source: &'src str) -> Self {
        let mut significant = Vec::with_capacity(tokens.len());
        let mut comments = Vec::new();
        for token in tokens {
            if token.kind.is_trivia() {
                let is_doc = token.kind == TokenKind::DocComment;
                let text = token.span.text(source);
                let text = text.trim_start_matches('#').trim().to_string();
                comments.push(Comment {
                    span: token.span,
                    text,
                    is_doc,
                });
            } else if token.kind != TokenKind::Error {
                // Lexical errors are reported by the lexer already.
                significant.push(token);
            }
        }
        if significant.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = source.len() as u32;
            significant.push(Token::new(TokenKind::Eof, end, end));
        }

        Self {
            tokens: significant,
            pos: 0,
            source,
            ast: Ast::default(),
            comments,
            errors: Vec::new(),
        }
    }

    /// Hand over the finished tree and the collected errors.
    pub(crate) fn finish(mut self, root: NodeId) -> (Ast, Vec<ParseError>) {
        self.ast.set_root(root);
        self.ast.set_comments(self.comments);
        (self.ast, self.errors)
    }

    // ── Lookahead ──────────────────────────────────────────────────────

    pub(crate) fn current(&self) -> TokenKind {
        self.nth(0)
    }

    /// Kind of the Nth token ahead. Past the end this is `Eof`.
    pub(crate) fn nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.current())
    }

    pub(crate) fn current_span(&self) -> Span {
        self.nth_span(0)
    }

    pub(crate) fn nth_span(&self, n: usize) -> Span {
        match self.tokens.get(self.pos + n) {
            Some(token) => token.span,
            None => {
                let end = self.source.len() as u32;
                Span::new(end, end)
            }
        }
    }

    pub(crate) fn current_text(&self) -> &'src str {
        self.current_span().text(self.source)
    }

    /// Span of the most recently consumed token.
    pub(crate) fn previous_span(&self) -> Span {
        if self.pos == 0 {
            return Span::new(0, 0);
        }
        self.tokens[self.pos - 1].span
    }

    /// Whether the current token starts right where the previous one ended.
    /// Call parentheses and augmented `<<` must be glued to what precedes them.
    pub(crate) fn current_is_adjacent(&self) -> bool {
        self.pos > 0 && self.previous_span().end == self.current_span().start
    }

    /// Whether the token after the current one is glued to it.
    pub(crate) fn next_is_adjacent(&self) -> bool {
        self.current_span().end == self.nth_span(1).start
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    // ── Consumption ────────────────────────────────────────────────────

    pub(crate) fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume `kind` or record an error naming `what`.
    pub(crate) fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error(format!("expected {what}, found {}", self.describe_current()));
        false
    }

    /// Like [`Parser::expect`] but also points at the opening keyword.
    pub(crate) fn expect_closing(&mut self, kind: TokenKind, what: &str, opened: Span) -> bool {
        if self.eat(kind) {
            return true;
        }
        let message = format!("expected {what}, found {}", self.describe_current());
        let opener = opened.text(self.source).to_string();
        self.errors.push(ParseError::with_related(
            message,
            self.current_span(),
            format!("`{opener}` opened here"),
            opened,
        ));
        false
    }

    /// Consume an identifier and return its text lower-cased.
    pub(crate) fn expect_name(&mut self, what: &str) -> Option<String> {
        if self.at(TokenKind::Ident) {
            let name = normalize_name(self.current_text());
            self.advance();
            Some(name)
        } else {
            self.error(format!("expected {what}, found {}", self.describe_current()));
            None
        }
    }

    // ── Nodes ──────────────────────────────────────────────────────────

    pub(crate) fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.ast.alloc(kind, span)
    }

    /// Span from `start` up to the end of the last consumed token.
    pub(crate) fn span_from(&self, start: Span) -> Span {
        let end = self.previous_span().end.max(start.end);
        Span::new(start.start, end)
    }

    // ── Errors ─────────────────────────────────────────────────────────

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        let span = self.current_span();
        self.errors.push(ParseError::new(message, span));
    }

    /// Record an error, consume the offending token and return an `Error`
    /// node covering it.
    pub(crate) fn error_node(&mut self, message: impl Into<String>) -> NodeId {
        let span = self.current_span();
        self.error(message);
        if !self.at(TokenKind::Eof) {
            self.advance();
        }
        self.alloc(NodeKind::Error, span)
    }

    pub(crate) fn push_error(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub(crate) fn describe_current(&self) -> String {
        match self.current() {
            TokenKind::Eof => "end of file".to_string(),
            _ => format!("`{}`", self.current_text()),
        }
    }

    /// Doc comment lines lying inside `span`, before `limit`.
    pub(crate) fn doc_lines(&self, span: Span, limit: u32) -> Vec<String> {
        self.comments
            .iter()
            .filter(|c| c.is_doc && c.span.start >= span.start && c.span.start < limit)
            .map(|c| c.text.clone())
            .collect()
    }
}

/// Identifiers are case-insensitive; `|quoted|` segments keep their case.
pub(crate) fn normalize_name(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quoted = false;
    for c in text.chars() {
        if c == '|' {
            quoted = !quoted;
        } else if quoted {
            out.push(c);
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_lowercased_outside_quotes() {
        assert_eq!(normalize_name("Sw:Rope"), "sw:rope");
        assert_eq!(normalize_name("|Odd Name|"), "Odd Name");
        assert_eq!(normalize_name("a|B|c"), "aBc");
    }
}
