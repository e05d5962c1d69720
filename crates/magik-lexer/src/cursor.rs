/// Character iterator over Magik source with byte-offset tracking.
///
/// All positions are byte offsets into the original UTF-8 text, which is
/// what [`magik_common::span::Span`] stores.
pub struct Cursor<'src> {
    source: &'src str,
    pos: u32,
    chars: std::str::Chars<'src>,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: 0,
            chars: source.chars(),
        }
    }

    /// Look at the current character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Look `n` characters ahead (`peek_nth(0)` is `peek()`).
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.clone().nth(n)
    }

    /// Consume the current character and advance the position.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.pos += c.len_utf8() as u32;
        Some(c)
    }

    /// Consume the current character if it equals `expected`.
    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the upcoming characters if they spell `text`.
    pub fn eat_str(&mut self, text: &str) -> bool {
        if self.chars.as_str().starts_with(text) {
            for _ in text.chars() {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    pub fn pos(&self) -> u32 {
        self.pos
    }

    /// Advance while the predicate holds for the current character.
    pub fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.advance();
        }
    }

    /// Slice of the source between two byte offsets.
    pub fn slice(&self, start: u32, end: u32) -> &'src str {
        &self.source[start as usize..end as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_byte_offsets() {
        let mut cursor = Cursor::new("aé<");
        assert_eq!(cursor.advance(), Some('a'));
        assert_eq!(cursor.advance(), Some('é'));
        assert_eq!(cursor.pos(), 3);
        assert_eq!(cursor.peek(), Some('<'));
    }

    #[test]
    fn eat_str_only_consumes_on_match() {
        let mut cursor = Cursor::new("^<<x");
        assert!(!cursor.eat_str("<<"));
        assert!(cursor.eat_str("^<<"));
        assert_eq!(cursor.pos(), 3);
        assert_eq!(cursor.peek_nth(0), Some('x'));
        assert_eq!(cursor.peek_nth(1), None);
    }

    #[test]
    fn eat_while_stops_at_predicate() {
        let mut cursor = Cursor::new("abc123");
        cursor.eat_while(|c| c.is_alphabetic());
        assert_eq!(cursor.slice(0, cursor.pos()), "abc");
        cursor.eat_while(|c| c.is_ascii_digit());
        assert_eq!(cursor.peek(), None);
    }
}
