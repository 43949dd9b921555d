//! The node arena and its navigation API.

use moonc_core::Span;
use rustc_hash::FxHashMap;

use crate::{Node, NodeId, NodeKind, TempAnnotation};

/// An abstract syntax tree stored as an arena of [`Node`]s.
///
/// The node counter is the arena length, so ids are dense and owned by this
/// instance. Cloning an `Ast` yields a fully independent tree with the same
/// ids.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    annotations: FxHashMap<NodeId, TempAnnotation>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Construction
    // ==========================================================================

    /// Allocate a detached node.
    pub fn create_node(&mut self, kind: NodeKind, value: impl Into<String>, line: u32) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u32);
        let node = Node::new(kind, value.into(), Span::line(line));
        self.nodes.push(node);
        id
    }

    /// Append `sibling` (and the siblings that follow it) after the last
    /// sibling of `node`. Returns the new rightmost sibling.
    pub fn make_siblings(&mut self, node: NodeId, sibling: NodeId) -> NodeId {
        let mut last = node;
        while let Some(next) = self.nodes[last.index()].next_sibling {
            last = next;
        }
        self.nodes[last.index()].next_sibling = Some(sibling);

        let parent = self.nodes[node.index()].parent;
        let mut cursor = Some(sibling);
        let mut rightmost = sibling;
        while let Some(id) = cursor {
            self.nodes[id.index()].parent = parent;
            rightmost = id;
            cursor = self.nodes[id.index()].next_sibling;
        }
        if let Some(parent) = parent {
            self.nodes[parent.index()].last_child = Some(rightmost);
        }
        rightmost
    }

    /// Adopt `child` and its sibling chain as the last children of `parent`.
    pub fn adopt_children(&mut self, parent: NodeId, child: NodeId) {
        let mut cursor = Some(child);
        let mut rightmost = child;
        while let Some(id) = cursor {
            self.nodes[id.index()].parent = Some(parent);
            rightmost = id;
            cursor = self.nodes[id.index()].next_sibling;
        }

        match self.nodes[parent.index()].last_child {
            Some(last) => self.nodes[last.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        self.nodes[parent.index()].last_child = Some(rightmost);
    }

    /// Create a node of `kind` whose children are `kids`, in order.
    pub fn make_family(
        &mut self,
        kind: NodeKind,
        value: impl Into<String>,
        line: u32,
        kids: &[NodeId],
    ) -> NodeId {
        let parent = self.create_node(kind, value, line);
        for &kid in kids {
            self.adopt_single(parent, kid);
        }
        parent
    }

    fn adopt_single(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[child.index()].next_sibling = None;
        match self.nodes[parent.index()].last_child {
            Some(last) => self.nodes[last.index()].next_sibling = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        self.nodes[parent.index()].last_child = Some(child);
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    // ==========================================================================
    // Navigation
    // ==========================================================================

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Kind of a node; unknown ids read as [`NodeKind::Empty`].
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).map_or(NodeKind::Empty, |n| n.kind)
    }

    pub fn value(&self, id: NodeId) -> &str {
        self.node(id).map_or("", |n| n.value.as_str())
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).map_or(Span::default(), |n| n.span)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.first_child)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.next_sibling)
    }

    /// Iterate the children of `id` from left to right.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            ast: self,
            next: self.first_child(id),
        }
    }

    /// The `n`th child of `id`, counting from zero.
    pub fn child(&self, id: NodeId, n: usize) -> Option<NodeId> {
        self.children(id).nth(n)
    }

    /// First child of `id` with the given kind.
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id).find(|&c| self.kind(c) == kind)
    }

    // ==========================================================================
    // Annotations
    // ==========================================================================

    /// Attach (or replace) the temporary recorded for `id`.
    pub fn annotate(&mut self, id: NodeId, annotation: TempAnnotation) {
        self.annotations.insert(id, annotation);
    }

    pub fn annotation(&self, id: NodeId) -> Option<&TempAnnotation> {
        self.annotations.get(&id)
    }

    /// Every annotated node, ordered by node id.
    pub fn annotations(&self) -> Vec<(NodeId, &TempAnnotation)> {
        let mut all: Vec<_> = self.annotations.iter().map(|(id, a)| (*id, a)).collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    pub fn clear_annotations(&mut self) {
        self.annotations.clear();
    }
}

/// Iterator over the children of a node.
pub struct Children<'a> {
    ast: &'a Ast,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.ast.next_sibling(current);
        Some(current)
    }
}
