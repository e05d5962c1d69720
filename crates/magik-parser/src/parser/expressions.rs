//! Pratt expression parser for Magik.
//!
//! Assignment sits above the Pratt loop: `expression()` parses an operand
//! expression and then checks for `<<`, `^<<` or an augmented `op<<`.
//! Keyword constructs (`_if`, `_loop`, `_block`, `_try`, `_proc`) are
//! expressions in Magik and are reached from [`primary`].

use magik_common::token::TokenKind;

use crate::ast::{AssignOp, Atom, BinaryOp, Literal, NodeId, NodeKind, UnaryOp};
use crate::error::ParseError;

use super::{definitions, normalize_name, statements, Parser};

// ── Binding Power Tables ───────────────────────────────────────────────

/// Returns (left_bp, right_bp) for infix operators.
fn infix_binding_power(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::Orif | BinaryOp::Or => (3, 4),
        BinaryOp::Xor => (5, 6),
        BinaryOp::Andif | BinaryOp::And => (7, 8),
        BinaryOp::Is | BinaryOp::Isnt | BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Ne => (9, 10),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Cf => (11, 12),
        BinaryOp::Plus | BinaryOp::Minus => (13, 14),
        BinaryOp::Star | BinaryOp::Slash | BinaryOp::Div | BinaryOp::Mod => (15, 16),
        // Exponentiation is right-associative.
        BinaryOp::StarStar => (18, 17),
    }
}

const PREFIX_BP: u8 = 19;

/// Binary operator spelled by a token, if any.
pub(crate) fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    let op = match kind {
        TokenKind::Plus => BinaryOp::Plus,
        TokenKind::Minus => BinaryOp::Minus,
        TokenKind::Star => BinaryOp::Star,
        TokenKind::Slash => BinaryOp::Slash,
        TokenKind::StarStar => BinaryOp::StarStar,
        TokenKind::Eq => BinaryOp::Eq,
        TokenKind::TildeEq => BinaryOp::Neq,
        TokenKind::Diamond => BinaryOp::Ne,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::Ge,
        TokenKind::And => BinaryOp::And,
        TokenKind::Or => BinaryOp::Or,
        TokenKind::Xor => BinaryOp::Xor,
        TokenKind::Div => BinaryOp::Div,
        TokenKind::Mod => BinaryOp::Mod,
        TokenKind::Cf => BinaryOp::Cf,
        TokenKind::Is => BinaryOp::Is,
        TokenKind::Isnt => BinaryOp::Isnt,
        TokenKind::Andif => BinaryOp::Andif,
        TokenKind::Orif => BinaryOp::Orif,
        _ => return None,
    };
    Some(op)
}

fn prefix_op(kind: TokenKind) -> Option<UnaryOp> {
    let op = match kind {
        TokenKind::Not => UnaryOp::Not,
        TokenKind::Tilde => UnaryOp::Tilde,
        TokenKind::Minus => UnaryOp::Negate,
        TokenKind::Plus => UnaryOp::Plus,
        TokenKind::Scatter => UnaryOp::Scatter,
        TokenKind::AllResults => UnaryOp::AllResults,
        _ => return None,
    };
    Some(op)
}

/// Tokens that close an enclosing construct. Error recovery never consumes
/// these, so the construct that owns them can still close cleanly.
///
/// `_loop` is not one of them: it opens a loop expression everywhere except
/// after `_for ... _over` and `_while`, which check for it themselves.
pub(crate) fn is_terminator(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::EndMethod
            | TokenKind::EndProc
            | TokenKind::Then
            | TokenKind::Elif
            | TokenKind::Else
            | TokenKind::EndIf
            | TokenKind::Over
            | TokenKind::EndLoop
            | TokenKind::EndBlock
            | TokenKind::When
            | TokenKind::EndTry
            | TokenKind::Method
            | TokenKind::Dollar
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
            | TokenKind::Eof
    )
}

// ── Entry Points ───────────────────────────────────────────────────────

/// Parse a full expression, including assignment.
pub(crate) fn expression(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    let target = expr_bp(p, 0);

    // `(a, b) << ...` is a multiple assignment with a value list.
    if p.at(TokenKind::Assign) {
        if let NodeKind::Tuple { elements } = p.ast.kind(target) {
            if elements.len() > 1 {
                let targets = elements.clone();
                p.advance(); // <<
                let value = expression_or_tuple(p);
                let span = p.span_from(start);
                return p.alloc(NodeKind::MultipleAssignment { targets, value }, span);
            }
        }
    }

    let Some(op) = assignment_operator(p) else {
        return target;
    };
    let value = expression(p);
    let span = p.span_from(start);
    if !is_assignable(p, target) {
        let target_span = p.ast.span(target);
        p.push_error(ParseError::new("invalid assignment target", target_span));
        return p.alloc(NodeKind::Error, span);
    }
    p.alloc(NodeKind::Assignment { target, op, value }, span)
}

/// Identifiers, slots, method invocations (setters) and parenthesised
/// single targets can be assigned to.
fn is_assignable(p: &Parser, target: NodeId) -> bool {
    match p.ast.kind(target) {
        NodeKind::Identifier { .. }
        | NodeKind::Slot { .. }
        | NodeKind::MethodInvocation { .. }
        | NodeKind::Error => true,
        NodeKind::Tuple { elements } if elements.len() == 1 => is_assignable(p, elements[0]),
        _ => false,
    }
}

/// Parse one or more comma separated expressions. A single expression is
/// returned as-is; several are wrapped in a `Tuple`.
pub(crate) fn expression_or_tuple(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    let first = expression(p);
    if !p.at(TokenKind::Comma) {
        return first;
    }
    let mut elements = vec![first];
    while p.eat(TokenKind::Comma) {
        elements.push(expression(p));
    }
    let span = p.span_from(start);
    p.alloc(NodeKind::Tuple { elements }, span)
}

/// Parse comma separated expressions up to (and including) `close`.
pub(crate) fn delimited_list(p: &mut Parser, close: TokenKind, what: &str) -> Vec<NodeId> {
    let mut items = Vec::new();
    if p.eat(close) {
        return items;
    }
    loop {
        items.push(expression(p));
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(close, what);
    items
}

/// Whether the current token can begin an expression.
pub(crate) fn at_expression_start(p: &Parser) -> bool {
    let kind = p.current();
    if is_terminator(kind) || kind == TokenKind::Semicolon {
        return false;
    }
    binary_op(kind).is_none() || prefix_op(kind).is_some()
}

fn assignment_operator(p: &mut Parser) -> Option<AssignOp> {
    match p.current() {
        TokenKind::Assign => {
            p.advance();
            Some(AssignOp::Assign)
        }
        TokenKind::BootAssign => {
            p.advance();
            Some(AssignOp::BootAssign)
        }
        kind => {
            let op = binary_op(kind)?;
            if p.nth(1) == TokenKind::Assign && p.next_is_adjacent() {
                p.advance(); // operator
                p.advance(); // <<
                Some(AssignOp::Augmented(op))
            } else {
                None
            }
        }
    }
}

// ── Pratt Loop ─────────────────────────────────────────────────────────

fn expr_bp(p: &mut Parser, min_bp: u8) -> NodeId {
    let start = p.current_span();
    let mut lhs = prefix(p);

    loop {
        let Some(op) = binary_op(p.current()) else {
            break;
        };
        // `x +<< 1` belongs to the assignment layer.
        if p.nth(1) == TokenKind::Assign && p.next_is_adjacent() {
            break;
        }
        let (l_bp, r_bp) = infix_binding_power(op);
        if l_bp < min_bp {
            break;
        }
        p.advance(); // operator
        let right = expr_bp(p, r_bp);
        let span = p.span_from(start);
        lhs = p.alloc(
            NodeKind::Binary {
                op,
                left: lhs,
                right,
            },
            span,
        );
    }

    lhs
}

fn prefix(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    if let Some(op) = prefix_op(p.current()) {
        p.advance();
        let operand = expr_bp(p, PREFIX_BP);
        let span = p.span_from(start);
        return p.alloc(NodeKind::Unary { op, operand }, span);
    }
    let atom = primary(p);
    postfix(p, atom)
}

// ── Postfix ────────────────────────────────────────────────────────────

fn postfix(p: &mut Parser, mut lhs: NodeId) -> NodeId {
    let start = p.ast.span(lhs);
    loop {
        match p.current() {
            // `recv.name` or `recv.name(args)`
            TokenKind::Dot => {
                p.advance();
                let Some(mut name) = p.expect_name("a method name") else {
                    return p.alloc(NodeKind::Error, start);
                };
                let mut arguments = Vec::new();
                if p.at(TokenKind::LParen) && p.current_is_adjacent() {
                    p.advance();
                    arguments = delimited_list(p, TokenKind::RParen, "`)`");
                    name.push_str("()");
                }
                let span = p.span_from(start);
                lhs = p.alloc(
                    NodeKind::MethodInvocation {
                        receiver: lhs,
                        name,
                        arguments,
                    },
                    span,
                );
            }
            // `recv[index, ...]`
            TokenKind::LBracket => {
                p.advance();
                let arguments = delimited_list(p, TokenKind::RBracket, "`]`");
                let span = p.span_from(start);
                lhs = p.alloc(
                    NodeKind::MethodInvocation {
                        receiver: lhs,
                        name: "[]".to_string(),
                        arguments,
                    },
                    span,
                );
            }
            // `callee(args)`, only when the paren is glued to the callee.
            TokenKind::LParen if p.current_is_adjacent() => {
                p.advance();
                let arguments = delimited_list(p, TokenKind::RParen, "`)`");
                let span = p.span_from(start);
                lhs = p.alloc(
                    NodeKind::ProcedureInvocation {
                        callee: lhs,
                        arguments,
                    },
                    span,
                );
            }
            _ => break,
        }
    }
    lhs
}

// ── Primary ────────────────────────────────────────────────────────────

fn primary(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    let text = p.current_text();

    let kind = match p.current() {
        TokenKind::IntLiteral => NodeKind::Literal(Literal::Integer(parse_integer(text))),
        TokenKind::FloatLiteral => NodeKind::Literal(Literal::Float(text.to_string())),
        TokenKind::StringLiteral => {
            let inner = &text[1..text.len().saturating_sub(1).max(1)];
            NodeKind::Literal(Literal::String(inner.to_string()))
        }
        TokenKind::CharLiteral => NodeKind::Literal(Literal::Character(text[1..].to_string())),
        TokenKind::SymbolLiteral => {
            NodeKind::Literal(Literal::Symbol(normalize_name(&text[1..])))
        }
        TokenKind::GlobalRef => NodeKind::GlobalRef {
            name: normalize_name(&text[1..]),
        },
        TokenKind::Ident => NodeKind::Identifier {
            name: normalize_name(text),
        },
        TokenKind::SelfKw => NodeKind::Atom(Atom::SelfKw),
        TokenKind::Clone => NodeKind::Atom(Atom::Clone),
        TokenKind::True => NodeKind::Atom(Atom::True),
        TokenKind::False => NodeKind::Atom(Atom::False),
        TokenKind::Maybe => NodeKind::Atom(Atom::Maybe),
        TokenKind::Unset => NodeKind::Atom(Atom::Unset),
        TokenKind::ThisThread => NodeKind::Atom(Atom::ThisThread),

        TokenKind::Super => return super_expr(p),
        TokenKind::Dot => return slot(p),
        TokenKind::LParen => {
            p.advance();
            let elements = delimited_list(p, TokenKind::RParen, "`)`");
            let span = p.span_from(start);
            return p.alloc(NodeKind::Tuple { elements }, span);
        }
        TokenKind::LBrace => {
            p.advance();
            let elements = delimited_list(p, TokenKind::RBrace, "`}`");
            let span = p.span_from(start);
            return p.alloc(NodeKind::SimpleVector { elements }, span);
        }
        TokenKind::If => return statements::if_expr(p),
        TokenKind::For | TokenKind::While | TokenKind::Loop => return statements::loop_expr(p),
        TokenKind::Block => return statements::block_expr(p),
        TokenKind::Try => return statements::try_expr(p),
        TokenKind::Proc => return definitions::procedure(p),
        TokenKind::Iter if p.nth(1) == TokenKind::Proc => return definitions::procedure(p),

        _ => {
            let message = format!("expected expression, found {}", p.describe_current());
            if is_terminator(p.current()) {
                p.error(message);
                return p.alloc(NodeKind::Error, start);
            }
            return p.error_node(message);
        }
    };

    p.advance();
    p.alloc(kind, start)
}

/// `_super` or `_super(parent_name)`.
fn super_expr(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    p.advance(); // _super
    let mut parent = None;
    if p.at(TokenKind::LParen) && p.current_is_adjacent() {
        p.advance();
        parent = p.expect_name("a parent exemplar name");
        p.expect(TokenKind::RParen, "`)`");
    }
    let span = p.span_from(start);
    p.alloc(NodeKind::Super { parent }, span)
}

/// `.slot_name` in expression position.
fn slot(p: &mut Parser) -> NodeId {
    let start = p.current_span();
    p.advance(); // .
    match p.expect_name("a slot name") {
        Some(name) => {
            let span = p.span_from(start);
            p.alloc(NodeKind::Slot { name }, span)
        }
        None => p.alloc(NodeKind::Error, start),
    }
}

/// Decimal or `radix r digits` integer text. Values beyond `i128` saturate.
fn parse_integer(text: &str) -> i128 {
    let lower = text.to_ascii_lowercase();
    if let Some((radix, digits)) = lower.split_once('r') {
        let radix = radix.parse::<u32>().unwrap_or(10).clamp(2, 36);
        return i128::from_str_radix(digits, radix).unwrap_or(i128::MAX);
    }
    lower.parse::<i128>().unwrap_or(i128::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_literals() {
        assert_eq!(parse_integer("42"), 42);
        assert_eq!(parse_integer("16rFF"), 255);
        assert_eq!(parse_integer("2r101"), 5);
        assert_eq!(
            parse_integer("99999999999999999999999999999999999999999999"),
            i128::MAX
        );
    }

    #[test]
    fn binding_powers_order_operators() {
        let (_, is_r) = infix_binding_power(BinaryOp::Is);
        let (plus_l, _) = infix_binding_power(BinaryOp::Plus);
        assert!(plus_l > is_r);
        let (l, r) = infix_binding_power(BinaryOp::StarStar);
        assert!(l > r, "exponentiation is right-associative");
    }
}
