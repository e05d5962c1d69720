//! Lexical scope model.
//!
//! [`ScopeTree::build`] walks an [`Ast`] once, in source order, and records
//! every binding together with the node that introduces it and the
//! identifier nodes that refer to it. The reasoner only reads the finished
//! tree.
//!
//! Scopes nest the way bodies do. A method or procedure body opens a
//! procedure scope; lookups from inside it skip any enclosing bodies and
//! continue at the global scope, so outer locals are only visible through
//! `_import`.

use magik_parser::ast::{Ast, DefinitionModifier, Iteration, NodeId, NodeKind};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u32);

impl ScopeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl BindingId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Procedure,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Local,
    Parameter,
    Constant,
    /// Introduced by assigning to a name that was not visible yet.
    Definition,
    /// `_import`; see [`Binding::imported`].
    Import,
    Global,
    Dynamic,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    /// The module, definition or body node that opened the scope.
    pub node: NodeId,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    bindings: Vec<BindingId>,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// The identifier or parameter node that introduced the binding.
    pub node: NodeId,
    pub scope: ScopeId,
    /// For `_import`, the captured binding of the enclosing scope.
    pub imported: Option<BindingId>,
    /// Identifier nodes that read or assign the binding, in source order.
    pub usages: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    node_scopes: FxHashMap<NodeId, ScopeId>,
    node_bindings: FxHashMap<NodeId, BindingId>,
}

impl ScopeTree {
    pub fn build(ast: &Ast) -> ScopeTree {
        let mut builder = Builder {
            ast,
            tree: ScopeTree::default(),
        };
        let root = ast.root();
        let global = builder.tree.push_scope(ScopeKind::Global, root, None);
        builder.walk(root, global);
        builder.tree
    }

    pub fn global_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.index()]
    }

    /// The innermost scope enclosing `node`.
    pub fn scope_for_node(&self, ast: &Ast, node: NodeId) -> ScopeId {
        std::iter::once(node)
            .chain(ast.ancestors(node))
            .find_map(|n| self.node_scopes.get(&n).copied())
            .unwrap_or(self.global_scope())
    }

    /// The nearest binding of `name` visible from `scope`.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(found) = self.find_local(id, name) {
                return Some(found);
            }
            current = match scope.kind {
                ScopeKind::Body => scope.parent,
                ScopeKind::Procedure => Some(self.global_scope()),
                ScopeKind::Global => None,
            };
        }
        None
    }

    /// The binding an identifier or parameter node introduces or refers to.
    pub fn binding_for_node(&self, node: NodeId) -> Option<BindingId> {
        self.node_bindings.get(&node).copied()
    }

    /// Bindings declared directly in `scope`, in declaration order.
    pub fn bindings_in(&self, scope: ScopeId) -> &[BindingId] {
        &self.scope(scope).bindings
    }

    /// Bindings declared in `scope` and all of its descendants.
    pub fn bindings_in_subtree(&self, scope: ScopeId) -> Vec<BindingId> {
        let mut out = Vec::new();
        let mut stack = vec![scope];
        while let Some(id) = stack.pop() {
            let scope = self.scope(id);
            out.extend_from_slice(&scope.bindings);
            stack.extend(scope.children.iter().rev().copied());
        }
        out
    }

    fn find_local(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        self.scope(scope)
            .bindings
            .iter()
            .copied()
            .find(|&b| self.binding(b).name == name)
    }

    fn push_scope(&mut self, kind: ScopeKind, node: NodeId, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            kind,
            node,
            parent,
            children: Vec::new(),
            bindings: Vec::new(),
        });
        if let Some(parent) = parent {
            self.scopes[parent.index()].children.push(id);
        }
        self.node_scopes.insert(node, id);
        id
    }
}

// ── Builder ────────────────────────────────────────────────────────────

struct Builder<'a> {
    ast: &'a Ast,
    tree: ScopeTree,
}

impl Builder<'_> {
    fn walk(&mut self, node: NodeId, scope: ScopeId) {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::MethodDefinition(def) => {
                let parameters: Vec<NodeId> = def
                    .parameters
                    .iter()
                    .chain(def.assignment_parameter.iter())
                    .copied()
                    .collect();
                self.walk_definition(node, &parameters, def.body, scope);
            }
            NodeKind::ProcedureDefinition(def) => {
                self.walk_definition(node, &def.parameters, def.body, scope);
            }
            NodeKind::Body { .. } => {
                let inner = self.tree.push_scope(ScopeKind::Body, node, Some(scope));
                self.walk_statements(node, inner);
            }
            NodeKind::VariableDefinitionStatement {
                modifier,
                definitions,
            } => {
                for &definition in definitions {
                    self.walk_variable_definition(*modifier, definition, scope);
                }
            }
            NodeKind::Assignment { target, value, .. } => {
                self.walk(*value, scope);
                self.walk_target(*target, scope);
            }
            NodeKind::MultipleAssignment { targets, value } => {
                self.walk(*value, scope);
                for &target in targets {
                    self.walk_target(target, scope);
                }
            }
            NodeKind::Identifier { name } => {
                let binding = match self.tree.resolve(scope, name) {
                    Some(binding) => binding,
                    None => {
                        let global = self.tree.global_scope();
                        self.declare(name, BindingKind::Global, node, global)
                    }
                };
                self.record_usage(binding, node);
            }
            NodeKind::Loop {
                iteration, body, ..
            } => match iteration {
                Iteration::Over {
                    variables,
                    iterable,
                } => {
                    self.walk(*iterable, scope);
                    let inner = self.tree.push_scope(ScopeKind::Body, *body, Some(scope));
                    for &variable in variables {
                        if let NodeKind::Identifier { name } = ast.kind(variable) {
                            self.declare(name, BindingKind::Local, variable, inner);
                            self.tree.node_scopes.insert(variable, inner);
                        }
                    }
                    self.walk_statements(*body, inner);
                }
                Iteration::While { condition } => {
                    self.walk(*condition, scope);
                    self.walk(*body, scope);
                }
                Iteration::Plain => self.walk(*body, scope),
            },
            NodeKind::Try {
                variable,
                body,
                whens,
            } => {
                self.walk(*body, scope);
                for &when in whens {
                    let NodeKind::When { body, .. } = ast.kind(when) else {
                        continue;
                    };
                    let inner = self.tree.push_scope(ScopeKind::Body, *body, Some(scope));
                    if let Some(variable) = variable {
                        if let NodeKind::Identifier { name } = ast.kind(*variable) {
                            self.declare(name, BindingKind::Local, *variable, inner);
                        }
                    }
                    self.walk_statements(*body, inner);
                }
            }
            kind => {
                for child in kind.children() {
                    self.walk(child, scope);
                }
            }
        }
    }

    fn walk_definition(
        &mut self,
        node: NodeId,
        parameters: &[NodeId],
        body: NodeId,
        scope: ScopeId,
    ) {
        let ast = self.ast;
        let inner = self.tree.push_scope(ScopeKind::Procedure, node, Some(scope));
        for &parameter in parameters {
            if let NodeKind::Parameter { name, .. } = ast.kind(parameter) {
                self.declare(name, BindingKind::Parameter, parameter, inner);
            }
        }
        self.tree.node_scopes.insert(body, inner);
        self.walk_statements(body, inner);
    }

    fn walk_statements(&mut self, body: NodeId, scope: ScopeId) {
        let ast = self.ast;
        if let NodeKind::Body { statements } = ast.kind(body) {
            for &statement in statements {
                self.walk(statement, scope);
            }
        }
    }

    fn walk_variable_definition(
        &mut self,
        modifier: DefinitionModifier,
        definition: NodeId,
        scope: ScopeId,
    ) {
        let ast = self.ast;
        let NodeKind::VariableDefinition { targets, value, .. } = ast.kind(definition) else {
            self.walk(definition, scope);
            return;
        };
        if let Some(value) = value {
            self.walk(*value, scope);
        }
        for &target in targets {
            let NodeKind::Identifier { name } = ast.kind(target) else {
                continue;
            };
            let kind = match modifier {
                DefinitionModifier::Local => BindingKind::Local,
                DefinitionModifier::Constant => BindingKind::Constant,
                DefinitionModifier::Global => BindingKind::Global,
                DefinitionModifier::Dynamic => BindingKind::Dynamic,
                DefinitionModifier::Import => BindingKind::Import,
            };
            let binding = self.declare(name, kind, target, scope);
            if kind == BindingKind::Import && self.tree.binding(binding).node == target {
                let imported = self.import_source(scope, name);
                self.tree.bindings[binding.index()].imported = imported;
            }
        }
    }

    fn walk_target(&mut self, target: NodeId, scope: ScopeId) {
        let ast = self.ast;
        match ast.kind(target) {
            NodeKind::Identifier { name } => match self.tree.resolve(scope, name) {
                Some(binding) => self.record_usage(binding, target),
                None => {
                    self.declare(name, BindingKind::Definition, target, scope);
                }
            },
            NodeKind::Tuple { elements } if elements.len() == 1 => {
                self.walk_target(elements[0], scope);
            }
            _ => self.walk(target, scope),
        }
    }

    /// The binding `_import name` captures: the one visible where the
    /// enclosing procedure is defined, if it is a local, constant or
    /// parameter.
    fn import_source(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.tree.scope(id);
            if s.kind == ScopeKind::Procedure {
                let outer = s.parent?;
                let found = self.tree.resolve(outer, name)?;
                let captured = matches!(
                    self.tree.binding(found).kind,
                    BindingKind::Local | BindingKind::Constant | BindingKind::Parameter
                );
                return captured.then_some(found);
            }
            current = s.parent;
        }
        None
    }

    /// Declare `name` in `scope` unless the scope already has it.
    fn declare(&mut self, name: &str, kind: BindingKind, node: NodeId, scope: ScopeId) -> BindingId {
        if let Some(existing) = self.tree.find_local(scope, name) {
            self.tree.node_bindings.entry(node).or_insert(existing);
            return existing;
        }
        let id = BindingId(self.tree.bindings.len() as u32);
        self.tree.bindings.push(Binding {
            name: name.to_string(),
            kind,
            node,
            scope,
            imported: None,
            usages: Vec::new(),
        });
        self.tree.scopes[scope.index()].bindings.push(id);
        self.tree.node_bindings.entry(node).or_insert(id);
        id
    }

    fn record_usage(&mut self, binding: BindingId, node: NodeId) {
        self.tree.bindings[binding.index()].usages.push(node);
        self.tree.node_bindings.insert(node, binding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(source: &str) -> (Ast, ScopeTree) {
        let parse = magik_parser::parse(source);
        assert!(parse.ok(), "unexpected errors: {:?}", parse.errors());
        let (ast, _) = parse.into_parts();
        let scopes = ScopeTree::build(&ast);
        (ast, scopes)
    }

    fn identifiers(ast: &Ast, wanted: &str) -> Vec<NodeId> {
        ast.ids()
            .filter(|&id| matches!(ast.kind(id), NodeKind::Identifier { name } if name == wanted))
            .collect()
    }

    #[test]
    fn locals_and_parameters() {
        let (ast, scopes) = build("_method a.m(p) _local x << p _return x _endmethod");
        let xs = identifiers(&ast, "x");
        let local = scopes.binding_for_node(xs[0]).expect("x is bound");
        assert_eq!(scopes.binding(local).kind, BindingKind::Local);
        assert_eq!(scopes.binding_for_node(xs[1]), Some(local));
        assert_eq!(scopes.binding(local).usages, vec![xs[1]]);

        let p = identifiers(&ast, "p")[0];
        let param = scopes.binding_for_node(p).expect("p is bound");
        assert_eq!(scopes.binding(param).kind, BindingKind::Parameter);
    }

    #[test]
    fn unknown_reads_become_globals() {
        let (ast, scopes) = build("_method a.m() _return terminal.x _endmethod");
        let ident = identifiers(&ast, "terminal")[0];
        let binding = scopes.binding_for_node(ident).expect("bound");
        assert_eq!(scopes.binding(binding).kind, BindingKind::Global);
        assert_eq!(scopes.binding(binding).scope, scopes.global_scope());
    }

    #[test]
    fn assignment_declares_definition() {
        let (ast, scopes) = build("_block x << 1; x << 2 _endblock");
        let xs = identifiers(&ast, "x");
        let binding = scopes.binding_for_node(xs[0]).expect("bound");
        assert_eq!(scopes.binding(binding).kind, BindingKind::Definition);
        assert_eq!(scopes.binding_for_node(xs[1]), Some(binding));
    }

    #[test]
    fn procedures_do_not_see_outer_locals_without_import() {
        let source = "\
_method a.m()
    _local x << 1, y << 2
    _return _proc() _import x; _return x + y _endproc
_endmethod";
        let (ast, scopes) = build(source);
        let xs = identifiers(&ast, "x");
        let outer = scopes.binding_for_node(xs[0]).expect("outer x");
        let import = scopes.binding_for_node(xs[1]).expect("imported x");
        assert_eq!(scopes.binding(import).kind, BindingKind::Import);
        assert_eq!(scopes.binding(import).imported, Some(outer));
        assert_eq!(scopes.binding_for_node(xs[2]), Some(import));

        let ys = identifiers(&ast, "y");
        let inner_y = scopes.binding_for_node(ys[1]).expect("y read");
        assert_eq!(scopes.binding(inner_y).kind, BindingKind::Global);
    }

    #[test]
    fn loop_and_try_variables_are_local_to_their_bodies() {
        let source = "\
_for i _over x.elements() _loop i _endloop
_try _with c _return 1 _when error _return c _endtry";
        let (ast, scopes) = build(source);
        let is = identifiers(&ast, "i");
        let i = scopes.binding_for_node(is[0]).expect("i");
        assert_eq!(scopes.binding(i).kind, BindingKind::Local);
        assert_ne!(scopes.binding(i).scope, scopes.global_scope());
        assert_eq!(scopes.scope_for_node(&ast, is[1]), scopes.binding(i).scope);

        let cs = identifiers(&ast, "c");
        let read = scopes.binding_for_node(cs[1]).expect("c read");
        assert_eq!(scopes.binding(read).kind, BindingKind::Local);
        assert_eq!(scopes.binding(read).node, cs[0]);
    }

    #[test]
    fn subtree_bindings() {
        let (_, scopes) = build("_method a.m(p) _if p _then _local q << 1 _endif _endmethod");
        let global = scopes.global_scope();
        let names: Vec<&str> = scopes
            .bindings_in_subtree(global)
            .into_iter()
            .map(|b| scopes.binding(b).name.as_str())
            .collect();
        assert_eq!(names, vec!["p", "q"]);
        assert!(scopes.bindings_in(global).is_empty());
    }
}
