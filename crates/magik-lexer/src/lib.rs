// Magik lexer -- turns source text into a flat token stream.

mod cursor;

use cursor::Cursor;
use magik_common::error::{LexError, LexErrorKind};
use magik_common::span::Span;
use magik_common::token::{keyword_from_str, Token, TokenKind};

/// The Magik lexer.
///
/// Wraps a [`Cursor`] and implements `Iterator<Item = Token>`. Comments are
/// produced as trivia tokens because the type reasoner reads instruction and
/// doc comments. Problems are recorded in [`Lexer::errors`] and surface as
/// `TokenKind::Error` tokens so the parser can recover.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    emitted_eof: bool,
    errors: Vec<LexError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            emitted_eof: false,
            errors: Vec::new(),
        }
    }

    /// Tokenize the entire source. The result ends with an `Eof` token.
    pub fn tokenize(source: &str) -> Vec<Token> {
        Lexer::new(source).collect()
    }

    /// Tokenize the entire source and also return the lexer errors.
    pub fn tokenize_with_errors(source: &str) -> (Vec<Token>, Vec<LexError>) {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.by_ref().collect();
        (tokens, lexer.errors)
    }

    /// Errors recorded so far.
    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.cursor.pos();
        let Some(c) = self.cursor.peek() else {
            return Token::new(TokenKind::Eof, start, start);
        };

        match c {
            '(' => self.single_char_token(TokenKind::LParen, start),
            ')' => self.single_char_token(TokenKind::RParen, start),
            '[' => self.single_char_token(TokenKind::LBracket, start),
            ']' => self.single_char_token(TokenKind::RBracket, start),
            '{' => self.single_char_token(TokenKind::LBrace, start),
            '}' => self.single_char_token(TokenKind::RBrace, start),
            ',' => self.single_char_token(TokenKind::Comma, start),
            '.' => self.single_char_token(TokenKind::Dot, start),
            ';' => self.single_char_token(TokenKind::Semicolon, start),
            '$' => self.single_char_token(TokenKind::Dollar, start),
            '+' => self.single_char_token(TokenKind::Plus, start),
            '-' => self.single_char_token(TokenKind::Minus, start),
            '/' => self.single_char_token(TokenKind::Slash, start),
            '=' => self.single_char_token(TokenKind::Eq, start),

            '<' => self.lex_lt(start),
            '>' => self.lex_gt(start),
            '*' => self.lex_star(start),
            '~' => self.lex_tilde(start),
            '^' => self.lex_caret(start),

            '#' => self.lex_comment(start),
            ':' => self.lex_symbol(start),
            '%' => self.lex_character(start),
            '@' => self.lex_global_ref(start),
            '"' | '\'' => self.lex_string(c, start),
            '0'..='9' => self.lex_number(start),

            c if is_ident_start(c) => self.lex_ident(start),

            _ => {
                self.cursor.advance();
                self.error(LexErrorKind::UnexpectedCharacter(c), start)
            }
        }
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn skip_whitespace(&mut self) {
        self.cursor.eat_while(char::is_whitespace);
    }

    fn single_char_token(&mut self, kind: TokenKind, start: u32) -> Token {
        self.cursor.advance();
        Token::new(kind, start, self.cursor.pos())
    }

    fn token_from(&self, kind: TokenKind, start: u32) -> Token {
        Token::new(kind, start, self.cursor.pos())
    }

    /// Record an error covering `start..pos` and return an `Error` token.
    fn error(&mut self, kind: LexErrorKind, start: u32) -> Token {
        let end = self.cursor.pos();
        self.errors.push(LexError::new(kind, Span::new(start, end)));
        Token::new(TokenKind::Error, start, end)
    }

    // ── Operators ────────────────────────────────────────────────────────

    /// `<<`, `<=`, `<>` or `<`.
    fn lex_lt(&mut self, start: u32) -> Token {
        self.cursor.advance();
        let kind = if self.cursor.eat('<') {
            TokenKind::Assign
        } else if self.cursor.eat('=') {
            TokenKind::LtEq
        } else if self.cursor.eat('>') {
            TokenKind::Diamond
        } else {
            TokenKind::Lt
        };
        self.token_from(kind, start)
    }

    /// `>>`, `>=` or `>`.
    fn lex_gt(&mut self, start: u32) -> Token {
        self.cursor.advance();
        let kind = if self.cursor.eat('>') {
            TokenKind::Emit
        } else if self.cursor.eat('=') {
            TokenKind::GtEq
        } else {
            TokenKind::Gt
        };
        self.token_from(kind, start)
    }

    fn lex_star(&mut self, start: u32) -> Token {
        self.cursor.advance();
        let kind = if self.cursor.eat('*') {
            TokenKind::StarStar
        } else {
            TokenKind::Star
        };
        self.token_from(kind, start)
    }

    fn lex_tilde(&mut self, start: u32) -> Token {
        self.cursor.advance();
        let kind = if self.cursor.eat('=') {
            TokenKind::TildeEq
        } else {
            TokenKind::Tilde
        };
        self.token_from(kind, start)
    }

    /// `^<<` is the only operator starting with a caret.
    fn lex_caret(&mut self, start: u32) -> Token {
        if self.cursor.eat_str("^<<") {
            return self.token_from(TokenKind::BootAssign, start);
        }
        self.cursor.advance();
        self.error(LexErrorKind::UnexpectedCharacter('^'), start)
    }

    // ── Comments ─────────────────────────────────────────────────────────

    /// `##` starts a doc comment, a single `#` a plain comment. Both run to
    /// the end of the line and keep their hashes in the token text.
    fn lex_comment(&mut self, start: u32) -> Token {
        self.cursor.advance();
        let kind = if self.cursor.eat('#') {
            TokenKind::DocComment
        } else {
            TokenKind::Comment
        };
        self.cursor.eat_while(|c| c != '\n');
        self.token_from(kind, start)
    }

    // ── Literals ─────────────────────────────────────────────────────────

    /// `:name` or `:|quoted name|`.
    fn lex_symbol(&mut self, start: u32) -> Token {
        self.cursor.advance();
        match self.cursor.peek() {
            Some(c) if is_ident_continue(c) || c == '|' => {
                if let Err(kind) = self.eat_name() {
                    return self.error(kind, start);
                }
                self.token_from(TokenKind::SymbolLiteral, start)
            }
            _ => self.error(LexErrorKind::UnexpectedCharacter(':'), start),
        }
    }

    /// `%c` for a single character, `%space` style for named characters.
    fn lex_character(&mut self, start: u32) -> Token {
        self.cursor.advance();
        match self.cursor.advance() {
            None => self.error(LexErrorKind::EmptyCharacter, start),
            Some(c) => {
                if c.is_alphabetic() {
                    self.cursor.eat_while(char::is_alphabetic);
                }
                self.token_from(TokenKind::CharLiteral, start)
            }
        }
    }

    /// `@name`, used for global references and labels.
    fn lex_global_ref(&mut self, start: u32) -> Token {
        self.cursor.advance();
        match self.cursor.peek() {
            Some(c) if is_ident_start(c) || c == '_' => {
                if let Err(kind) = self.eat_name() {
                    return self.error(kind, start);
                }
                self.eat_qualification();
                self.token_from(TokenKind::GlobalRef, start)
            }
            _ => self.error(LexErrorKind::UnexpectedCharacter('@'), start),
        }
    }

    /// Strings use either quote character and have no escapes. They may not
    /// span lines.
    fn lex_string(&mut self, quote: char, start: u32) -> Token {
        self.cursor.advance();
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    return self.error(LexErrorKind::UnterminatedString, start);
                }
                Some(c) if c == quote => {
                    self.cursor.advance();
                    return self.token_from(TokenKind::StringLiteral, start);
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// Decimal integers, radix integers (`16rFF`) and floats with an optional
    /// exponent introduced by `e`, `E` or `&`.
    fn lex_number(&mut self, start: u32) -> Token {
        self.cursor.eat_while(|c| c.is_ascii_digit());

        if matches!(self.cursor.peek(), Some('r' | 'R')) {
            self.cursor.advance();
            if !self.cursor.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
                let text = self.cursor.slice(start, self.cursor.pos()).to_string();
                return self.error(LexErrorKind::InvalidNumberLiteral(text), start);
            }
            self.cursor.eat_while(|c| c.is_ascii_alphanumeric());
            return self.token_from(TokenKind::IntLiteral, start);
        }

        let mut kind = TokenKind::IntLiteral;
        // `1.upto(10)` is a method call, so a dot only continues the number
        // when a digit follows.
        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
            kind = TokenKind::FloatLiteral;
        }

        if matches!(self.cursor.peek(), Some('e' | 'E' | '&')) {
            let digit_at = if matches!(self.cursor.peek_nth(1), Some('+' | '-')) {
                2
            } else {
                1
            };
            if self.cursor.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.cursor.advance();
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
                kind = TokenKind::FloatLiteral;
            }
        }

        self.token_from(kind, start)
    }

    // ── Identifiers and keywords ─────────────────────────────────────────

    fn lex_ident(&mut self, start: u32) -> Token {
        if let Err(kind) = self.eat_name() {
            return self.error(kind, start);
        }

        let text = self.cursor.slice(start, self.cursor.pos());
        if let Some(keyword) = keyword_from_str(text) {
            return self.token_from(keyword, start);
        }

        self.eat_qualification();
        self.token_from(TokenKind::Ident, start)
    }

    /// Consume identifier characters, including `|quoted|` segments.
    fn eat_name(&mut self) -> Result<(), LexErrorKind> {
        loop {
            match self.cursor.peek() {
                Some('|') => {
                    self.cursor.advance();
                    self.cursor.eat_while(|c| c != '|' && c != '\n');
                    if !self.cursor.eat('|') {
                        return Err(LexErrorKind::UnterminatedQuotedName);
                    }
                }
                Some(c) if is_ident_continue(c) => {
                    self.cursor.advance();
                }
                _ => return Ok(()),
            }
        }
    }

    /// Consume a `:name` suffix making the identifier package-qualified.
    fn eat_qualification(&mut self) {
        if self.cursor.peek() == Some(':')
            && self.cursor.peek_nth(1).is_some_and(|c| is_ident_start(c) || c == '|')
        {
            self.cursor.advance();
            // An unterminated quote here is reported when the parser trips
            // over the resulting token.
            let _ = self.eat_name();
        }
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.emitted_eof {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.emitted_eof = true;
        }
        Some(token)
    }
}

/// Whether a character can start an identifier or keyword.
fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '!' || c == '|'
}

/// Whether a character can continue an identifier.
fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '?' | '!')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_local_definition() {
        assert_eq!(
            kinds("_local a << 42"),
            vec![
                TokenKind::Local,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::IntLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_number_followed_by_method_call() {
        assert_eq!(
            kinds("1.upto(10)"),
            vec![
                TokenKind::IntLiteral,
                TokenKind::Dot,
                TokenKind::Ident,
                TokenKind::LParen,
                TokenKind::IntLiteral,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_spans_accurate() {
        let tokens = Lexer::tokenize("a ^<< b");
        assert_eq!(tokens[0].span, Span::new(0, 1));
        assert_eq!(tokens[1].span, Span::new(2, 5));
        assert_eq!(tokens[1].kind, TokenKind::BootAssign);
        assert_eq!(tokens[2].span, Span::new(6, 7));
    }

    #[test]
    fn lex_unterminated_string_records_error() {
        let (tokens, errors) = Lexer::tokenize_with_errors("\"abc\nx");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, LexErrorKind::UnterminatedString);
    }
}
