//! Scope Tree - every scope of a program and the nesting between them.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: [`ScopeTable`] (the symbols of one scope)
//! - Edges: `Contains(key)` from a scope to each scope nested in it
//!
//! Cloning a tree yields an independent copy with identical [`ScopeId`]s,
//! which is how the layout pass gets a table it may rewrite.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::{ScopeKind, ScopeTable, Signature, Symbol};

/// Handle to a scope in a [`ScopeTree`].
pub type ScopeId = NodeIndex;

/// Name of the root scope.
pub const GLOBAL_SCOPE: &str = "global";

/// Edge types in the scope graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeEdge {
    /// Parent scope contains a nested scope under this key.
    Contains(String),
}

/// The scope graph.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    graph: DiGraph<ScopeTable, ScopeEdge>,
    root: ScopeId,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Create a tree holding only an empty global scope.
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let root = graph.add_node(ScopeTable::new(GLOBAL_SCOPE, ScopeKind::Global));
        Self { graph, root }
    }

    pub fn root(&self) -> ScopeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn scope(&self, id: ScopeId) -> Option<&ScopeTable> {
        self.graph.node_weight(id)
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> Option<&mut ScopeTable> {
        self.graph.node_weight_mut(id)
    }

    // ==========================================================================
    // Topology
    // ==========================================================================

    /// Nest `table` under `parent` with `key`.
    ///
    /// If `parent` already has a scope under `key` that scope is returned and
    /// `table` is dropped.
    pub fn add_nested(&mut self, parent: ScopeId, key: &str, table: ScopeTable) -> ScopeId {
        if let Some(existing) = self.nested(parent, key) {
            return existing;
        }
        let child = self.graph.add_node(table);
        self.graph
            .add_edge(parent, child, ScopeEdge::Contains(key.to_string()));
        if let Some(parent_table) = self.graph.node_weight_mut(parent) {
            parent_table.nested.insert(key.to_string(), child);
        }
        child
    }

    /// Find a nested scope by key.
    pub fn nested(&self, parent: ScopeId, key: &str) -> Option<ScopeId> {
        for edge in self.graph.edges(parent) {
            let ScopeEdge::Contains(child_key) = edge.weight();
            if child_key == key {
                return Some(edge.target());
            }
        }
        None
    }

    /// Nested scopes of `parent` in the order they were added.
    pub fn nested_scopes(&self, parent: ScopeId) -> Vec<(&str, ScopeId)> {
        self.scope(parent)
            .map(|t| t.nested.iter().map(|(k, id)| (k.as_str(), *id)).collect())
            .unwrap_or_default()
    }

    /// The scope that contains `id`; `None` for the root.
    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.graph
            .edges_directed(id, Direction::Incoming)
            .next()
            .map(|edge| edge.source())
    }

    /// The key `id` is nested under in its parent.
    pub fn key_of(&self, id: ScopeId) -> Option<&str> {
        self.graph
            .edges_directed(id, Direction::Incoming)
            .next()
            .map(|edge| {
                let ScopeEdge::Contains(key) = edge.weight();
                key.as_str()
            })
    }

    /// Resolve a path of keys from the root, e.g. `["Point", "area()"]`.
    pub fn find_path<S: AsRef<str>>(&self, path: &[S]) -> Option<ScopeId> {
        let mut current = self.root;
        for segment in path {
            current = self.nested(current, segment.as_ref())?;
        }
        Some(current)
    }

    /// The scope of the class called `name`.
    pub fn class_scope(&self, name: &str) -> Option<ScopeId> {
        self.nested(self.root, name)
            .filter(|&id| self.scope(id).is_some_and(|t| t.kind() == ScopeKind::Class))
    }

    /// The scope table of the class called `name`.
    pub fn class_table(&self, name: &str) -> Option<&ScopeTable> {
        self.scope(self.class_scope(name)?)
    }

    /// The nearest scope at or above `id` of the given kind.
    pub fn enclosing(&self, id: ScopeId, kind: ScopeKind) -> Option<ScopeId> {
        let mut current = Some(id);
        while let Some(scope) = current {
            if self.scope(scope)?.kind() == kind {
                return Some(scope);
            }
            current = self.parent(scope);
        }
        None
    }

    /// Every scope, depth first, each parent before its nested scopes and
    /// siblings in insertion order.
    pub fn preorder(&self) -> Vec<ScopeId> {
        let mut order = Vec::with_capacity(self.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            let nested = self.nested_scopes(id);
            stack.extend(nested.iter().rev().map(|(_, child)| *child));
        }
        order
    }

    // ==========================================================================
    // Symbols
    // ==========================================================================

    /// Insert into `scope`. See [`ScopeTable::insert`].
    pub fn insert(&mut self, scope: ScopeId, symbol: Symbol) -> bool {
        self.scope_mut(scope).is_some_and(|t| t.insert(symbol))
    }

    /// Look `name` up in `scope`, then in each enclosing scope unless
    /// `local_only` is set.
    pub fn lookup(&self, scope: ScopeId, name: &str, local_only: bool) -> Option<&Symbol> {
        self.lookup_with_scope(scope, name, local_only)
            .map(|(_, symbol)| symbol)
    }

    /// Like [`lookup`](Self::lookup), also returning the scope the symbol
    /// was found in.
    pub fn lookup_with_scope(
        &self,
        scope: ScopeId,
        name: &str,
        local_only: bool,
    ) -> Option<(ScopeId, &Symbol)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(symbol) = self.scope(id)?.get(name) {
                return Some((id, symbol));
            }
            if local_only {
                return None;
            }
            current = self.parent(id);
        }
        None
    }

    /// Every overload called `name`: local ones first, then those of each
    /// enclosing scope unless `local_only` is set.
    pub fn lookup_functions(&self, scope: ScopeId, name: &str, local_only: bool) -> Vec<&Symbol> {
        let mut found = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(table) = self.scope(id) {
                found.extend(table.functions_named(name));
            }
            if local_only {
                break;
            }
            current = self.parent(id);
        }
        found
    }

    /// Exact-signature lookup.
    pub fn lookup_function(
        &self,
        scope: ScopeId,
        signature: &Signature,
        local_only: bool,
    ) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(symbol) = self.scope(id)?.get_function(signature) {
                return Some(symbol);
            }
            if local_only {
                return None;
            }
            current = self.parent(id);
        }
        None
    }

    /// Qualified display name of a scope, e.g. `Point::area()`.
    pub fn qualified_name(&self, id: ScopeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(scope) = current {
            if scope == self.root {
                break;
            }
            if let Some(key) = self.key_of(scope) {
                parts.push(key.to_string());
            }
            current = self.parent(scope);
        }
        if parts.is_empty() {
            return GLOBAL_SCOPE.to_string();
        }
        parts.reverse();
        parts.join("::")
    }
}
