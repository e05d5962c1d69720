//! Ariadne-based rendering of reasoner notes and parse errors.
//!
//! Notes are advisory: the reasoner records them while it walks and never
//! fails because of them. Each kind carries a stable code so editors and
//! scripts can filter on it.

use std::ops::Range;

use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use magik_common::span::Span;
use magik_parser::error::ParseError;

// ── Notes ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteKind {
    /// A receiver of known type has no method of this name.
    UnknownMethod { type_name: String, method: String },
    /// The method owner declares no slot of this name.
    UnknownSlot { type_name: String, slot: String },
    /// A definition containing a syntax error was not reasoned about.
    SkippedDefinition { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub kind: NoteKind,
    pub span: Span,
    pub message: String,
}

impl Note {
    pub fn new(kind: NoteKind, span: Span) -> Note {
        let message = match &kind {
            NoteKind::UnknownMethod { type_name, method } => {
                format!("unknown method `{method}` on `{type_name}`")
            }
            NoteKind::UnknownSlot { type_name, slot } => {
                format!("`{type_name}` has no slot `{slot}`")
            }
            NoteKind::SkippedDefinition { name } => {
                format!("`{name}` was skipped because it contains syntax errors")
            }
        };
        Note {
            kind,
            span,
            message,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind {
            NoteKind::UnknownMethod { .. } => "T0001",
            NoteKind::UnknownSlot { .. } => "T0002",
            NoteKind::SkippedDefinition { .. } => "T0003",
        }
    }

    fn label(&self) -> &'static str {
        match self.kind {
            NoteKind::UnknownMethod { .. } => "no such method",
            NoteKind::UnknownSlot { .. } => "no such slot",
            NoteKind::SkippedDefinition { .. } => "not analysed",
        }
    }
}

// ── Options ────────────────────────────────────────────────────────────

/// How diagnostics are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticOptions {
    pub color: bool,
    /// One JSON object per diagnostic instead of a report.
    pub json: bool,
}

impl DiagnosticOptions {
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }

    pub fn json_mode() -> Self {
        DiagnosticOptions {
            color: false,
            json: true,
        }
    }
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions {
            color: true,
            json: false,
        }
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

/// Render a reasoner note.
pub fn render_note(note: &Note, source: &str, filename: &str, options: &DiagnosticOptions) -> String {
    render(
        Rendered {
            kind: ReportKind::Warning,
            severity: "warning",
            code: note.code(),
            message: &note.message,
            span: note.span,
            label: note.label(),
            color: Color::Yellow,
        },
        source,
        filename,
        options,
    )
}

/// Render a syntax error.
pub fn render_parse_error(
    error: &ParseError,
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
) -> String {
    let mut rendered = render(
        Rendered {
            kind: ReportKind::Error,
            severity: "error",
            code: "P0001",
            message: &error.message,
            span: error.span,
            label: "here",
            color: Color::Red,
        },
        source,
        filename,
        options,
    );
    if let Some((message, _)) = &error.related {
        if !options.json {
            rendered.push_str(&format!("note: {message}\n"));
        }
    }
    rendered
}

struct Rendered<'m> {
    kind: ReportKind<'static>,
    severity: &'static str,
    code: &'static str,
    message: &'m str,
    span: Span,
    label: &'static str,
    color: Color,
}

fn render(d: Rendered<'_>, source: &str, filename: &str, options: &DiagnosticOptions) -> String {
    if options.json {
        return serde_json::json!({
            "code": d.code,
            "severity": d.severity,
            "message": d.message,
            "file": filename,
            "spans": [{
                "start": d.span.start,
                "end": d.span.end,
                "label": d.label,
            }],
        })
        .to_string();
    }

    let range = clamp(d.span, source.len());
    let report = Report::build(d.kind, (filename, range.clone()))
        .with_code(d.code)
        .with_message(d.message)
        .with_config(Config::default().with_color(options.color))
        .with_label(
            Label::new((filename, range))
                .with_message(d.label)
                .with_color(d.color),
        )
        .finish();

    let mut buf = Vec::new();
    if let Err(err) = report.write((filename, Source::from(source)), &mut buf) {
        tracing::error!("cannot render diagnostic: {err}");
        return format!("{}[{}]: {}\n", d.severity, d.code, d.message);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Clamp a span into the source. Ariadne needs at least one character.
fn clamp(span: Span, len: usize) -> Range<usize> {
    let start = (span.start as usize).min(len);
    let end = (span.end as usize).min(len).max(start);
    if start == end {
        start..end.saturating_add(1).min(len)
    } else {
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notes_render_with_code_and_label() {
        let source = "x << 1.frobnicate()\n";
        let note = Note::new(
            NoteKind::UnknownMethod {
                type_name: "sw:integer".to_string(),
                method: "frobnicate()".to_string(),
            },
            Span::new(5, 19),
        );
        let out = render_note(&note, source, "test.magik", &DiagnosticOptions::colorless());
        assert!(out.contains("[T0001]"), "{out}");
        assert!(out.contains("unknown method `frobnicate()` on `sw:integer`"), "{out}");
        assert!(out.contains("no such method"), "{out}");
        assert!(out.contains("test.magik:1:6"), "{out}");
        assert!(!out.contains("<unknown>"), "{out}");
    }

    #[test]
    fn json_mode_is_one_line() {
        let note = Note::new(
            NoteKind::SkippedDefinition {
                name: "a.b".to_string(),
            },
            Span::new(0, 3),
        );
        let out = render_note(&note, "abc", "f.magik", &DiagnosticOptions::json_mode());
        assert!(!out.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["code"], "T0003");
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["spans"][0]["end"], 3);
    }

    #[test]
    fn empty_spans_are_widened() {
        assert_eq!(clamp(Span::new(2, 2), 5), 2..3);
        assert_eq!(clamp(Span::new(9, 12), 5), 5..5);
    }
}
