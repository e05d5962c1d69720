//! Statement and body parsing.
//!
//! A body is a run of statements closed by one of a caller-provided set of
//! keywords. Control constructs (`_if`, `_loop`, `_block`, `_try`) live here
//! too even though they are reached as expressions.

use magik_common::span::Span;
use magik_common::token::TokenKind;

use crate::ast::{DefinitionModifier, Iteration, NodeId, NodeKind};

use super::expressions::{at_expression_start, delimited_list, expression, expression_or_tuple};
use super::{definitions, normalize_name, Parser};

// ── Bodies ─────────────────────────────────────────────────────────────

/// Parse statements until one of `terminators`. A `$` or the end of file
/// also ends the body so an unclosed definition cannot swallow the rest of
/// the file.
pub(crate) fn body(p: &mut Parser, terminators: &[TokenKind]) -> NodeId {
    let start = p.current_span();
    let mut statements = Vec::new();

    loop {
        while p.eat(TokenKind::Semicolon) {}
        if p.at_any(terminators) || p.at_any(&[TokenKind::Dollar, TokenKind::Eof]) {
            break;
        }
        let before = p.position();
        statements.push(statement(p));
        if p.position() == before {
            // A stray closer that belongs to nobody; step over it.
            p.advance();
        }
    }

    let span = match (statements.first(), statements.last()) {
        (Some(&first), Some(&last)) => p.ast.span(first).merge(p.ast.span(last)),
        _ => Span::new(start.start, start.start),
    };
    p.alloc(NodeKind::Body { statements }, span)
}

/// Parse the whole compilation unit.
pub(crate) fn module(p: &mut Parser) -> NodeId {
    let mut statements = Vec::new();
    loop {
        while p.eat(TokenKind::Dollar) || p.eat(TokenKind::Semicolon) {}
        if p.at(TokenKind::Eof) {
            break;
        }
        let before = p.position();
        statements.push(statement(p));
        if p.position() == before {
            p.advance();
        }
    }
    let end = p.current_span().end;
    p.alloc(NodeKind::Module { statements }, Span::new(0, end))
}

// ── Statements ─────────────────────────────────────────────────────────

pub(crate) fn statement(p: &mut Parser) -> NodeId {
    match p.current() {
        TokenKind::Local
        | TokenKind::Constant
        | TokenKind::Global
        | TokenKind::Dynamic
        | TokenKind::Import => variable_definition_statement(p),
        TokenKind::Package => package(p),
        TokenKind::Return => return_statement(p),
        TokenKind::Emit => {
            let start = p.current_span();
            p.advance();
            let value = expression_or_tuple(p);
            let span = p.span_from(start);
            p.alloc(NodeKind::Emit { value }, span)
        }
        TokenKind::Leave | TokenKind::Continue => leave_statement(p),
        TokenKind::Loopbody => loopbody_statement(p),
        TokenKind::Method | TokenKind::Private | TokenKind::Abstract => definitions::method(p),
        TokenKind::Iter if p.nth(1) != TokenKind::Proc => definitions::method(p),
        _ => expression(p),
    }
}

fn package(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    p.advance(); // _package
    let name = p.expect_name("a package name").unwrap_or_default();
    let span = p.span_from(start);
    p.alloc(NodeKind::Package { name }, span)
}

fn return_statement(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    p.advance(); // _return
    let value = at_expression_start(p).then(|| expression_or_tuple(p));
    let span = p.span_from(start);
    p.alloc(NodeKind::Return { value }, span)
}

/// `_leave [@label] [_with values]` and the same shape for `_continue`.
fn leave_statement(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    let is_leave = p.at(TokenKind::Leave);
    p.advance();
    let label = label(p);
    let value = p.eat(TokenKind::With).then(|| expression_or_tuple(p));
    let span = p.span_from(start);
    let kind = if is_leave {
        NodeKind::Leave { label, value }
    } else {
        NodeKind::Continue { label, value }
    };
    p.alloc(kind, span)
}

/// `_loopbody(values)`; the values become a tuple.
fn loopbody_statement(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    p.advance(); // _loopbody
    let tuple_start = p.current_span();
    p.expect(TokenKind::LParen, "`(` after `_loopbody`");
    let elements = delimited_list(p, TokenKind::RParen, "`)`");
    let tuple_span = p.span_from(tuple_start);
    let value = p.alloc(NodeKind::Tuple { elements }, tuple_span);
    let span = p.span_from(start);
    p.alloc(NodeKind::Loopbody { value }, span)
}

fn variable_definition_statement(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    let modifier = match p.current() {
        TokenKind::Constant => DefinitionModifier::Constant,
        TokenKind::Global => DefinitionModifier::Global,
        TokenKind::Dynamic => DefinitionModifier::Dynamic,
        TokenKind::Import => DefinitionModifier::Import,
        _ => DefinitionModifier::Local,
    };
    p.advance();

    let mut definitions = Vec::new();
    loop {
        definitions.push(variable_definition(p));
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }

    let span = p.span_from(start);
    p.alloc(
        NodeKind::VariableDefinitionStatement {
            modifier,
            definitions,
        },
        span,
    )
}

/// `name [<< value]` or `(a, b, ...) [<< value]`.
fn variable_definition(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    let multi = p.eat(TokenKind::LParen);
    let mut targets = Vec::new();

    if multi {
        loop {
            p.eat(TokenKind::Gather);
            if let Some(target) = identifier(p) {
                targets.push(target);
            }
            if !p.eat(TokenKind::Comma) {
                break;
            }
        }
        p.expect(TokenKind::RParen, "`)`");
    } else {
        match identifier(p) {
            Some(target) => targets.push(target),
            None => return p.alloc(NodeKind::Error, start),
        }
    }

    let value = (p.eat(TokenKind::Assign) || p.eat(TokenKind::BootAssign)).then(|| expression(p));
    let span = p.span_from(start);
    p.alloc(
        NodeKind::VariableDefinition {
            targets,
            value,
            multi,
        },
        span,
    )
}

fn identifier(p: &mut Parser) -> Option<NodeId> {
    let start = p.current_span();
    let name = p.expect_name("an identifier")?;
    Some(p.alloc(NodeKind::Identifier { name }, start))
}

/// Optional `@label` after `_block`, `_loop`, `_leave` and `_continue`.
fn label(p: &mut Parser) -> Option<String> {
    if !p.at(TokenKind::GlobalRef) {
        return None;
    }
    let name = normalize_name(&p.current_text()[1..]);
    p.advance();
    Some(name)
}

// ── Control constructs ─────────────────────────────────────────────────

/// `_if c _then ... [_elif c _then ...]* [_else ...] _endif`
pub(crate) fn if_expr(p: &mut Parser) -> NodeId {
    let opened = p.current_span();
    let mut clauses = Vec::new();
    let mut else_body = None;

    loop {
        let clause_start = p.current_span();
        p.advance(); // _if / _elif
        let condition = expression(p);
        p.expect(TokenKind::Then, "`_then`");
        let clause_body = body(p, &[TokenKind::Elif, TokenKind::Else, TokenKind::EndIf]);
        let span = p.span_from(clause_start);
        clauses.push(p.alloc(
            NodeKind::IfClause {
                condition,
                body: clause_body,
            },
            span,
        ));

        if p.at(TokenKind::Elif) {
            continue;
        }
        if p.eat(TokenKind::Else) {
            else_body = Some(body(p, &[TokenKind::EndIf]));
        }
        break;
    }

    p.expect_closing(TokenKind::EndIf, "`_endif`", opened);
    let span = p.span_from(opened);
    p.alloc(NodeKind::If { clauses, else_body }, span)
}

/// `[_for vars _over expr | _while expr] _loop [@label] ... _endloop`
pub(crate) fn loop_expr(p: &mut Parser) -> NodeId {
    let opened = p.current_span();
    let iteration = if p.eat(TokenKind::For) {
        let mut variables = Vec::new();
        loop {
            p.eat(TokenKind::Gather);
            if let Some(variable) = identifier(p) {
                variables.push(variable);
            }
            if !p.eat(TokenKind::Comma) {
                break;
            }
        }
        p.expect(TokenKind::Over, "`_over`");
        let iterable = iteration_operand(p);
        Iteration::Over {
            variables,
            iterable,
        }
    } else if p.eat(TokenKind::While) {
        let condition = iteration_operand(p);
        Iteration::While { condition }
    } else {
        Iteration::Plain
    };

    p.expect(TokenKind::Loop, "`_loop`");
    let label = label(p);
    let body = body(p, &[TokenKind::EndLoop]);
    p.expect_closing(TokenKind::EndLoop, "`_endloop`", opened);
    let span = p.span_from(opened);
    p.alloc(
        NodeKind::Loop {
            label,
            iteration,
            body,
        },
        span,
    )
}

/// The `_over` or `_while` expression. A `_loop` here closes the header
/// rather than opening a nested loop.
fn iteration_operand(p: &mut Parser) -> NodeId {
    if p.at(TokenKind::Loop) {
        let start = p.current_span();
        let message = format!("expected expression, found {}", p.describe_current());
        p.error(message);
        return p.alloc(NodeKind::Error, start);
    }
    expression(p)
}

/// `_block [@label] ... _endblock`
pub(crate) fn block_expr(p: &mut Parser) -> NodeId {
    let opened = p.current_span();
    p.advance(); // _block
    let label = label(p);
    let body = body(p, &[TokenKind::EndBlock]);
    p.expect_closing(TokenKind::EndBlock, "`_endblock`", opened);
    let span = p.span_from(opened);
    p.alloc(NodeKind::Block { label, body }, span)
}

/// `_try [_with var] ... [_when cond[, cond]* ...]* _endtry`
pub(crate) fn try_expr(p: &mut Parser) -> NodeId {
    let opened = p.current_span();
    p.advance(); // _try
    let variable = if p.eat(TokenKind::With) {
        identifier(p)
    } else {
        None
    };
    let try_body = body(p, &[TokenKind::When, TokenKind::EndTry]);

    let mut whens = Vec::new();
    while p.at(TokenKind::When) {
        let when_start = p.current_span();
        p.advance(); // _when
        let mut conditions = Vec::new();
        loop {
            if let Some(name) = p.expect_name("a condition name") {
                conditions.push(name);
            }
            if !p.eat(TokenKind::Comma) {
                break;
            }
        }
        let when_body = body(p, &[TokenKind::When, TokenKind::EndTry]);
        let span = p.span_from(when_start);
        whens.push(p.alloc(
            NodeKind::When {
                conditions,
                body: when_body,
            },
            span,
        ));
    }

    p.expect_closing(TokenKind::EndTry, "`_endtry`", opened);
    let span = p.span_from(opened);
    p.alloc(
        NodeKind::Try {
            variable,
            body: try_body,
            whens,
        },
        span,
    )
}
