//! Arena syntax tree for Magik.
//!
//! Nodes live in a flat `Vec` owned by [`Ast`] and refer to each other by
//! [`NodeId`]. Every node records its [`Span`] and its parent, so consumers
//! can walk down through [`NodeKind::children`] and back up through
//! [`Ast::ancestors`].
//!
//! [`NodeKind`] is a closed enum. Analyses match on it exhaustively rather
//! than implementing a visitor per node kind. Optional children are
//! `Option<NodeId>` fields.

use std::fmt;

use magik_common::span::Span;

/// Handle to a node in an [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
}

/// A source comment, kept out of the tree but available for doc and
/// instruction lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub span: Span,
    /// Text after the leading `#` or `##`, trimmed.
    pub text: String,
    pub is_doc: bool,
}

// ── Operators ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Plus,
    Minus,
    Star,
    Slash,
    StarStar,
    Eq,
    /// `~=`
    Neq,
    /// `<>`
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
    Div,
    Mod,
    Cf,
    Is,
    Isnt,
    Andif,
    Orif,
}

impl BinaryOp {
    /// Operator text as used in type databases (`+`, `and`, `cf`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Star => "*",
            BinaryOp::Slash => "/",
            BinaryOp::StarStar => "**",
            BinaryOp::Eq => "=",
            BinaryOp::Neq => "~=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Cf => "cf",
            BinaryOp::Is => "is",
            BinaryOp::Isnt => "isnt",
            BinaryOp::Andif => "andif",
            BinaryOp::Orif => "orif",
        }
    }

    /// Parse operator text, accepting keyword operators with or without the
    /// leading underscore.
    pub fn from_text(text: &str) -> Option<BinaryOp> {
        let lower = text.to_ascii_lowercase();
        let op = match lower.trim_start_matches('_') {
            "+" => BinaryOp::Plus,
            "-" => BinaryOp::Minus,
            "*" => BinaryOp::Star,
            "/" => BinaryOp::Slash,
            "**" => BinaryOp::StarStar,
            "=" => BinaryOp::Eq,
            "~=" => BinaryOp::Neq,
            "<>" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            "xor" => BinaryOp::Xor,
            "div" => BinaryOp::Div,
            "mod" => BinaryOp::Mod,
            "cf" => BinaryOp::Cf,
            "is" => BinaryOp::Is,
            "isnt" => BinaryOp::Isnt,
            "andif" => BinaryOp::Andif,
            "orif" => BinaryOp::Orif,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `_not`
    Not,
    /// `~`
    Tilde,
    /// `-`
    Negate,
    /// `+`
    Plus,
    Scatter,
    AllResults,
}

/// The operator of an [`NodeKind::Assignment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `<<`
    Assign,
    /// `^<<`
    BootAssign,
    /// `+<<`, `_andif<<`, ...
    Augmented(BinaryOp),
}

// ── Definition details ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionModifier {
    Local,
    Constant,
    Global,
    Dynamic,
    Import,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ParameterModifier {
    #[default]
    None,
    Optional,
    Gather,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MethodModifiers {
    pub private: bool,
    pub iter: bool,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDefinition {
    /// Exemplar name as written, possibly package-qualified.
    pub exemplar: String,
    /// Full method name, e.g. `name`, `name()`, `name<<`, `[]`, `[]<<`.
    pub name: String,
    pub modifiers: MethodModifiers,
    pub parameters: Vec<NodeId>,
    pub assignment_parameter: Option<NodeId>,
    pub body: NodeId,
    /// `##` lines of the definition, without the hashes.
    pub doc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDefinition {
    pub name: Option<String>,
    pub iter: bool,
    pub parameters: Vec<NodeId>,
    pub body: NodeId,
    pub doc: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Saturates at `i128::MAX` for absurdly large literals.
    Integer(i128),
    Float(String),
    String(String),
    Character(String),
    Symbol(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Atom {
    SelfKw,
    Clone,
    True,
    False,
    Maybe,
    Unset,
    ThisThread,
}

/// How a `_loop` is driven.
#[derive(Debug, Clone, PartialEq)]
pub enum Iteration {
    Plain,
    Over {
        variables: Vec<NodeId>,
        iterable: NodeId,
    },
    While {
        condition: NodeId,
    },
}

// ── Node kinds ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Module {
        statements: Vec<NodeId>,
    },
    Package {
        name: String,
    },
    MethodDefinition(MethodDefinition),
    ProcedureDefinition(ProcedureDefinition),
    Parameter {
        name: String,
        modifier: ParameterModifier,
    },
    Body {
        statements: Vec<NodeId>,
    },

    // Statements
    VariableDefinitionStatement {
        modifier: DefinitionModifier,
        definitions: Vec<NodeId>,
    },
    /// One `a << x` or `(a, b) << x` inside a definition statement. Targets
    /// are `Identifier` nodes.
    VariableDefinition {
        targets: Vec<NodeId>,
        value: Option<NodeId>,
        multi: bool,
    },
    MultipleAssignment {
        targets: Vec<NodeId>,
        value: NodeId,
    },
    Return {
        value: Option<NodeId>,
    },
    Emit {
        value: NodeId,
    },
    Leave {
        label: Option<String>,
        value: Option<NodeId>,
    },
    Continue {
        label: Option<String>,
        value: Option<NodeId>,
    },
    Loopbody {
        value: NodeId,
    },

    // Expressions
    Assignment {
        target: NodeId,
        op: AssignOp,
        value: NodeId,
    },
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
    },
    Unary {
        op: UnaryOp,
        operand: NodeId,
    },
    MethodInvocation {
        receiver: NodeId,
        name: String,
        arguments: Vec<NodeId>,
    },
    ProcedureInvocation {
        callee: NodeId,
        arguments: Vec<NodeId>,
    },
    Identifier {
        name: String,
    },
    Slot {
        name: String,
    },
    Literal(Literal),
    Atom(Atom),
    Super {
        parent: Option<String>,
    },
    SimpleVector {
        elements: Vec<NodeId>,
    },
    GlobalRef {
        name: String,
    },
    Tuple {
        elements: Vec<NodeId>,
    },
    Block {
        label: Option<String>,
        body: NodeId,
    },
    If {
        clauses: Vec<NodeId>,
        else_body: Option<NodeId>,
    },
    IfClause {
        condition: NodeId,
        body: NodeId,
    },
    Loop {
        label: Option<String>,
        iteration: Iteration,
        body: NodeId,
    },
    Try {
        variable: Option<NodeId>,
        body: NodeId,
        whens: Vec<NodeId>,
    },
    When {
        conditions: Vec<String>,
        body: NodeId,
    },

    /// A construct that failed to parse.
    Error,
}

impl NodeKind {
    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeId> {
        fn opt(id: &Option<NodeId>) -> impl Iterator<Item = NodeId> + '_ {
            id.iter().copied()
        }

        match self {
            NodeKind::Module { statements } | NodeKind::Body { statements } => statements.clone(),
            NodeKind::MethodDefinition(def) => def
                .parameters
                .iter()
                .copied()
                .chain(opt(&def.assignment_parameter))
                .chain(std::iter::once(def.body))
                .collect(),
            NodeKind::ProcedureDefinition(def) => def
                .parameters
                .iter()
                .copied()
                .chain(std::iter::once(def.body))
                .collect(),
            NodeKind::VariableDefinitionStatement { definitions, .. } => definitions.clone(),
            NodeKind::VariableDefinition { targets, value, .. } => {
                targets.iter().copied().chain(opt(value)).collect()
            }
            NodeKind::MultipleAssignment { targets, value } => {
                targets.iter().copied().chain(std::iter::once(*value)).collect()
            }
            NodeKind::Return { value }
            | NodeKind::Leave { value, .. }
            | NodeKind::Continue { value, .. } => opt(value).collect(),
            NodeKind::Emit { value } | NodeKind::Loopbody { value } => vec![*value],
            NodeKind::Assignment { target, value, .. } => vec![*target, *value],
            NodeKind::Binary { left, right, .. } => vec![*left, *right],
            NodeKind::Unary { operand, .. } => vec![*operand],
            NodeKind::MethodInvocation {
                receiver,
                arguments,
                ..
            } => std::iter::once(*receiver)
                .chain(arguments.iter().copied())
                .collect(),
            NodeKind::ProcedureInvocation { callee, arguments } => std::iter::once(*callee)
                .chain(arguments.iter().copied())
                .collect(),
            NodeKind::SimpleVector { elements } | NodeKind::Tuple { elements } => elements.clone(),
            NodeKind::Block { body, .. } | NodeKind::When { body, .. } => vec![*body],
            NodeKind::If { clauses, else_body } => {
                clauses.iter().copied().chain(opt(else_body)).collect()
            }
            NodeKind::IfClause { condition, body } => vec![*condition, *body],
            NodeKind::Loop {
                iteration, body, ..
            } => {
                let mut children = match iteration {
                    Iteration::Plain => Vec::new(),
                    Iteration::Over {
                        variables,
                        iterable,
                    } => variables
                        .iter()
                        .copied()
                        .chain(std::iter::once(*iterable))
                        .collect(),
                    Iteration::While { condition } => vec![*condition],
                };
                children.push(*body);
                children
            }
            NodeKind::Try {
                variable,
                body,
                whens,
            } => opt(variable)
                .chain(std::iter::once(*body))
                .chain(whens.iter().copied())
                .collect(),
            NodeKind::Package { .. }
            | NodeKind::Parameter { .. }
            | NodeKind::Identifier { .. }
            | NodeKind::Slot { .. }
            | NodeKind::Literal(_)
            | NodeKind::Atom(_)
            | NodeKind::Super { .. }
            | NodeKind::GlobalRef { .. }
            | NodeKind::Error => Vec::new(),
        }
    }

    /// Short kind name, used in tree dumps and invariant messages.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Module { .. } => "Module",
            NodeKind::Package { .. } => "Package",
            NodeKind::MethodDefinition(_) => "MethodDefinition",
            NodeKind::ProcedureDefinition(_) => "ProcedureDefinition",
            NodeKind::Parameter { .. } => "Parameter",
            NodeKind::Body { .. } => "Body",
            NodeKind::VariableDefinitionStatement { .. } => "VariableDefinitionStatement",
            NodeKind::VariableDefinition { .. } => "VariableDefinition",
            NodeKind::MultipleAssignment { .. } => "MultipleAssignment",
            NodeKind::Return { .. } => "Return",
            NodeKind::Emit { .. } => "Emit",
            NodeKind::Leave { .. } => "Leave",
            NodeKind::Continue { .. } => "Continue",
            NodeKind::Loopbody { .. } => "Loopbody",
            NodeKind::Assignment { .. } => "Assignment",
            NodeKind::Binary { .. } => "Binary",
            NodeKind::Unary { .. } => "Unary",
            NodeKind::MethodInvocation { .. } => "MethodInvocation",
            NodeKind::ProcedureInvocation { .. } => "ProcedureInvocation",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::Slot { .. } => "Slot",
            NodeKind::Literal(_) => "Literal",
            NodeKind::Atom(_) => "Atom",
            NodeKind::Super { .. } => "Super",
            NodeKind::SimpleVector { .. } => "SimpleVector",
            NodeKind::GlobalRef { .. } => "GlobalRef",
            NodeKind::Tuple { .. } => "Tuple",
            NodeKind::Block { .. } => "Block",
            NodeKind::If { .. } => "If",
            NodeKind::IfClause { .. } => "IfClause",
            NodeKind::Loop { .. } => "Loop",
            NodeKind::Try { .. } => "Try",
            NodeKind::When { .. } => "When",
            NodeKind::Error => "Error",
        }
    }

    /// Whether this node produces a value when evaluated.
    ///
    /// Structural nodes (module, bodies, parameters, clauses) do not.
    pub fn is_expression(&self) -> bool {
        !matches!(
            self,
            NodeKind::Module { .. }
                | NodeKind::Package { .. }
                | NodeKind::Parameter { .. }
                | NodeKind::Body { .. }
                | NodeKind::VariableDefinition { .. }
                | NodeKind::IfClause { .. }
                | NodeKind::When { .. }
                | NodeKind::Return { .. }
                | NodeKind::Emit { .. }
                | NodeKind::Leave { .. }
                | NodeKind::Continue { .. }
                | NodeKind::Loopbody { .. }
                | NodeKind::Error
        )
    }

    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            NodeKind::MethodDefinition(_) | NodeKind::ProcedureDefinition(_)
        )
    }
}

// ── Tree ───────────────────────────────────────────────────────────────

/// A parsed compilation unit.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    comments: Vec<Comment>,
}

impl Ast {
    pub(crate) fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for child in kind.children() {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            kind,
            span,
            parent: None,
        });
        id
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub(crate) fn set_comments(&mut self, comments: Vec<Comment>) {
        self.comments = comments;
    }

    /// The `Module` node. An empty tree reports node `#0`.
    pub fn root(&self) -> NodeId {
        self.root.unwrap_or(NodeId(0))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.index()].span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children()
    }

    /// All node ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// The nearest strict ancestor satisfying `pred`.
    pub fn first_ancestor(
        &self,
        id: NodeId,
        pred: impl Fn(&NodeKind) -> bool,
    ) -> Option<NodeId> {
        self.ancestors(id).find(|&a| pred(self.kind(a)))
    }

    /// The node and all nodes below it, in pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            let mut children = self.children(n);
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Whether the subtree rooted at `id` contains a syntax error.
    pub fn contains_error(&self, id: NodeId) -> bool {
        self.descendants(id)
            .into_iter()
            .any(|n| matches!(self.kind(n), NodeKind::Error))
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    /// Indented one-node-per-line rendering, used by tests and `--dump-ast`.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let kind = self.kind(id);
        out.push_str(&"  ".repeat(depth));
        out.push_str(kind.name());
        let detail = match kind {
            NodeKind::Package { name }
            | NodeKind::Identifier { name }
            | NodeKind::Slot { name }
            | NodeKind::GlobalRef { name } => Some(name.clone()),
            NodeKind::Parameter { name, modifier } => Some(match modifier {
                ParameterModifier::None => name.clone(),
                ParameterModifier::Optional => format!("_optional {name}"),
                ParameterModifier::Gather => format!("_gather {name}"),
            }),
            NodeKind::MethodDefinition(def) => Some(format!("{}.{}", def.exemplar, def.name)),
            NodeKind::ProcedureDefinition(def) => def.name.clone(),
            NodeKind::MethodInvocation { name, .. } => Some(name.clone()),
            NodeKind::Binary { op, .. } => Some(op.as_str().to_string()),
            NodeKind::Unary { op, .. } => Some(format!("{op:?}")),
            NodeKind::Assignment { op, .. } => Some(match op {
                AssignOp::Assign => "<<".to_string(),
                AssignOp::BootAssign => "^<<".to_string(),
                AssignOp::Augmented(bin) => format!("{}<<", bin.as_str()),
            }),
            NodeKind::Literal(lit) => Some(format!("{lit:?}")),
            NodeKind::Atom(atom) => Some(format!("{atom:?}")),
            NodeKind::VariableDefinitionStatement { modifier, .. } => {
                Some(format!("{modifier:?}"))
            }
            NodeKind::Super { parent } => parent.clone(),
            NodeKind::Block { label, .. }
            | NodeKind::Leave { label, .. }
            | NodeKind::Continue { label, .. }
            | NodeKind::Loop { label, .. } => label.clone(),
            NodeKind::When { conditions, .. } => Some(conditions.join(", ")),
            _ => None,
        };
        if let Some(detail) = detail {
            out.push(' ');
            out.push_str(&detail);
        }
        out.push('\n');
        for child in self.children(id) {
            self.dump_into(child, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_links_parents() {
        let mut ast = Ast::default();
        let left = ast.alloc(NodeKind::Literal(Literal::Integer(1)), Span::new(0, 1));
        let right = ast.alloc(NodeKind::Literal(Literal::Integer(2)), Span::new(4, 5));
        let sum = ast.alloc(
            NodeKind::Binary {
                op: BinaryOp::Plus,
                left,
                right,
            },
            Span::new(0, 5),
        );
        assert_eq!(ast.parent(left), Some(sum));
        assert_eq!(ast.parent(right), Some(sum));
        assert_eq!(ast.children(sum), vec![left, right]);
        assert_eq!(ast.ancestors(left).collect::<Vec<_>>(), vec![sum]);
    }

    #[test]
    fn binary_op_text_round_trips() {
        for op in [BinaryOp::Plus, BinaryOp::Neq, BinaryOp::Cf, BinaryOp::Andif] {
            assert_eq!(BinaryOp::from_text(op.as_str()), Some(op));
        }
        assert_eq!(BinaryOp::from_text("_XOR"), Some(BinaryOp::Xor));
        assert_eq!(BinaryOp::from_text("??"), None);
    }

    #[test]
    fn structural_nodes_are_not_expressions() {
        assert!(!NodeKind::Body { statements: vec![] }.is_expression());
        assert!(NodeKind::Atom(Atom::Unset).is_expression());
    }
}
