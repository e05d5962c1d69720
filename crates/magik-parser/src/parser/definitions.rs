//! Method and procedure definitions.

use magik_common::span::Span;
use magik_common::token::TokenKind;

use crate::ast::{
    MethodDefinition, MethodModifiers, NodeId, NodeKind, ParameterModifier, ProcedureDefinition,
};

use super::{normalize_name, statements, Parser};

/// `[_private] [_abstract] [_iter] _method exemplar.name(params) ... _endmethod`
///
/// Also handles `exemplar[params]` and trailing `<< value` / `^<< value`
/// assignment parameters, which extend the method name with `<<`/`^<<`.
pub(crate) fn method(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    let mut modifiers = MethodModifiers::default();
    loop {
        match p.current() {
            TokenKind::Private => modifiers.private = true,
            TokenKind::Abstract => modifiers.is_abstract = true,
            TokenKind::Iter => modifiers.iter = true,
            _ => break,
        }
        p.advance();
    }

    if !p.expect(TokenKind::Method, "`_method`") {
        return p.alloc(NodeKind::Error, start);
    }
    let Some(exemplar) = p.expect_name("an exemplar name") else {
        return recover(p, start);
    };

    let (mut name, parameters) = match p.current() {
        TokenKind::Dot => {
            p.advance();
            let Some(mut name) = p.expect_name("a method name") else {
                return recover(p, start);
            };
            let mut parameters = Vec::new();
            if p.at(TokenKind::LParen) && p.current_is_adjacent() {
                p.advance();
                parameters = parameter_list(p, TokenKind::RParen, "`)`");
                name.push_str("()");
            }
            (name, parameters)
        }
        TokenKind::LBracket => {
            p.advance();
            let parameters = parameter_list(p, TokenKind::RBracket, "`]`");
            ("[]".to_string(), parameters)
        }
        _ => {
            p.error(format!(
                "expected `.` or `[` after the exemplar name, found {}",
                p.describe_current()
            ));
            return recover(p, start);
        }
    };

    let mut assignment_parameter = None;
    let assignment = match p.current() {
        TokenKind::Assign => Some("<<"),
        TokenKind::BootAssign => Some("^<<"),
        _ => None,
    };
    if let Some(suffix) = assignment {
        p.advance();
        name.push_str(suffix);
        assignment_parameter = parameter(p, ParameterModifier::None);
    }

    let body = statements::body(p, &[TokenKind::EndMethod]);
    p.expect_closing(TokenKind::EndMethod, "`_endmethod`", start);

    let span = p.span_from(start);
    let doc = p.doc_lines(span, p.ast.span(body).start);
    p.alloc(
        NodeKind::MethodDefinition(MethodDefinition {
            exemplar,
            name,
            modifiers,
            parameters,
            assignment_parameter,
            body,
            doc,
        }),
        span,
    )
}

/// `[_iter] _proc [@name] (params) ... _endproc`
pub(crate) fn procedure(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    let iter = p.eat(TokenKind::Iter);
    p.expect(TokenKind::Proc, "`_proc`");

    let mut name = None;
    if p.at(TokenKind::GlobalRef) {
        name = Some(normalize_name(&p.current_text()[1..]));
        p.advance();
    }

    let parameters = if p.eat(TokenKind::LParen) {
        parameter_list(p, TokenKind::RParen, "`)`")
    } else {
        p.error(format!(
            "expected `(` to open the parameter list, found {}",
            p.describe_current()
        ));
        Vec::new()
    };

    let body = statements::body(p, &[TokenKind::EndProc]);
    p.expect_closing(TokenKind::EndProc, "`_endproc`", start);

    let span = p.span_from(start);
    let doc = p.doc_lines(span, p.ast.span(body).start);
    p.alloc(
        NodeKind::ProcedureDefinition(ProcedureDefinition {
            name,
            iter,
            parameters,
            body,
            doc,
        }),
        span,
    )
}

// ── Parameters ─────────────────────────────────────────────────────────

/// Parameters up to and including `close`. `_optional` applies to every
/// parameter after it; `_gather` marks the single parameter it precedes.
fn parameter_list(p: &mut Parser, close: TokenKind, what: &str) -> Vec<NodeId> {
    let mut parameters = Vec::new();
    if p.eat(close) {
        return parameters;
    }

    let mut optional = false;
    loop {
        if p.eat(TokenKind::Optional) {
            optional = true;
        }
        let modifier = if p.eat(TokenKind::Gather) {
            ParameterModifier::Gather
        } else if optional {
            ParameterModifier::Optional
        } else {
            ParameterModifier::None
        };
        if let Some(parameter) = parameter(p, modifier) {
            parameters.push(parameter);
        }
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(close, what);
    parameters
}

fn parameter(p: &mut Parser, modifier: ParameterModifier) -> Option<NodeId> {
    let span = p.current_span();
    let name = p.expect_name("a parameter name")?;
    Some(p.alloc(NodeKind::Parameter { name, modifier }, span))
}

/// Skip a broken definition header up to its `_endmethod` and return an
/// `Error` node for the whole thing.
fn recover(p: &mut Parser, start: Span) -> NodeId {
    while !p.at_any(&[TokenKind::EndMethod, TokenKind::Dollar, TokenKind::Eof]) {
        p.advance();
    }
    p.eat(TokenKind::EndMethod);
    let span = p.span_from(start);
    p.alloc(NodeKind::Error, span)
}
