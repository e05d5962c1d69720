//! Instruction comments.
//!
//! A comment of the form `# type: sw:integer` overrides the inferred result
//! of the statement it annotates; `# iter-type: ...` does the same for the
//! loop result. The comment either trails the statement on its last line or
//! sits alone on the line directly above it. Several instructions can share
//! one comment, separated by `;`.

use magik_common::span::{LineIndex, Span};
use magik_parser::ast::{Ast, Comment};

pub const TYPE: &str = "type";
pub const ITER_TYPE: &str = "iter-type";

pub struct InstructionReader<'a> {
    source: &'a str,
    comments: &'a [Comment],
    lines: LineIndex,
}

impl<'a> InstructionReader<'a> {
    pub fn new(ast: &'a Ast, source: &'a str) -> Self {
        InstructionReader {
            source,
            comments: ast.comments(),
            lines: LineIndex::new(source),
        }
    }

    /// The value of instruction `key` attached to the statement at `span`.
    /// A trailing comment wins over one on the line above.
    pub fn instruction(&self, span: Span, key: &str) -> Option<String> {
        let first_line = self.lines.line(span.start);
        let last_line = self.lines.line(span.end.saturating_sub(1).max(span.start));

        let mut found = None;
        for comment in self.comments.iter().filter(|c| !c.is_doc) {
            let line = self.lines.line(comment.span.start);
            let trailing = line == last_line && comment.span.start >= span.end;
            let above = line + 1 == first_line && self.stands_alone(comment);
            if !(trailing || above) {
                continue;
            }
            if let Some(value) = parse_instructions(&comment.text)
                .into_iter()
                .find_map(|(k, v)| (k == key).then_some(v))
            {
                if trailing {
                    return Some(value);
                }
                found = Some(value);
            }
        }
        found
    }

    /// Whether nothing but whitespace precedes the comment on its line.
    fn stands_alone(&self, comment: &Comment) -> bool {
        let start = comment.span.start as usize;
        let before = self.source.get(..start).unwrap_or("");
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        before[line_start..].trim().is_empty()
    }
}

/// Split `key: value; key: value` comment text.
pub fn parse_instructions(text: &str) -> Vec<(String, String)> {
    text.split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once(':')?;
            let key = key.trim();
            let value = value.trim();
            let is_key = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            (is_key && !value.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_instructions() {
        assert_eq!(
            parse_instructions("type: sw:integer; iter-type: sw:float, sw:symbol"),
            vec![
                ("type".to_string(), "sw:integer".to_string()),
                ("iter-type".to_string(), "sw:float, sw:symbol".to_string()),
            ]
        );
        assert!(parse_instructions("just a remark").is_empty());
    }

    #[test]
    fn trailing_and_preceding_comments() {
        let source = "\
x << a.b  # type: sw:integer
# type: sw:float
y << c.d
z << e";
        let parse = magik_parser::parse(source);
        let ast = parse.ast();
        let reader = InstructionReader::new(ast, source);
        let line_span = |line: usize| {
            let start: usize = source.lines().take(line).map(|l| l.len() + 1).sum();
            let len = source.lines().nth(line).map_or(0, |l| l.len());
            let text = &source[start..start + len];
            let end = text.find('#').map_or(len, |i| text[..i].trim_end().len());
            Span::new(start as u32, (start + end) as u32)
        };
        assert_eq!(reader.instruction(line_span(0), TYPE).as_deref(), Some("sw:integer"));
        assert_eq!(reader.instruction(line_span(2), TYPE).as_deref(), Some("sw:float"));
        assert_eq!(reader.instruction(line_span(3), TYPE), None);
        assert_eq!(reader.instruction(line_span(2), ITER_TYPE), None);
    }
}
