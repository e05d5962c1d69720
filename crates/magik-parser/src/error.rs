//! Parse error types for the Magik parser.

use std::fmt;

use magik_common::error::LexError;
use magik_common::span::Span;

/// A parse error with location information and optional related span.
///
/// The related span points at context such as the keyword that opened an
/// unterminated construct.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub related: Option<(String, Span)>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            related: None,
        }
    }

    /// Create a parse error with a related span for additional context.
    pub fn with_related(
        message: impl Into<String>,
        span: Span,
        related_message: impl Into<String>,
        related_span: Span,
    ) -> Self {
        Self {
            message: message.into(),
            span,
            related: Some((related_message.into(), related_span)),
        }
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError::new(err.kind.to_string(), err.span)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use magik_common::error::LexErrorKind;

    #[test]
    fn parse_error_with_related() {
        let err = ParseError::with_related(
            "expected `_endif`",
            Span::new(50, 53),
            "`_if` opened here",
            Span::new(10, 13),
        );
        assert_eq!(err.to_string(), "expected `_endif`");
        let (msg, span) = err.related.unwrap();
        assert_eq!(msg, "`_if` opened here");
        assert_eq!(span, Span::new(10, 13));
    }

    #[test]
    fn lex_errors_convert() {
        let lex = LexError::new(LexErrorKind::UnterminatedString, Span::new(1, 4));
        let err = ParseError::from(lex);
        assert_eq!(err.message, "unterminated string literal");
        assert_eq!(err.span, Span::new(1, 4));
        assert!(err.related.is_none());
    }
}
