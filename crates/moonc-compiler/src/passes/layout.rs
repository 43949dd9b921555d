//! Memory-Layout Pass (Pass 2) - Sizes, temporaries and stack offsets.
//!
//! Works on a private copy of the scope tree built by pass 1. Local variables
//! are stripped from every function scope up front and put back as their
//! declarations are revisited, interleaved with one temporary per evaluated
//! sub-expression, so a frame lists its slots in execution order.
//!
//! ## Frame shape
//!
//! ```text
//!  0  ┬─────────────────┐  frame base
//!     │ return slot     │  omitted for void
//!     │ link register   │
//!     │ parameters      │  declaration order
//!     │ locals / temps  │  execution order
//!     ▼                 ▼  offsets grow downwards
//! ```
//!
//! Class scopes use the same running-offset rule, with inherited classes
//! placed first as base regions. A class's size is recorded separately
//! from its offsets.

use std::fmt;

use indexmap::IndexMap;
use moonc_ast::{Ast, NodeId, NodeKind, TempAnnotation, TempKind};
use moonc_core::{Diagnostics, SemanticError, Span, TargetLayout, primitives};
use moonc_registry::{ScopeId, ScopeKind, ScopeTree, Signature, Symbol, SymbolKey, SymbolKind};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{FunctionHeader, VarDecl};

// ============================================================================
// Layout facts
// ============================================================================

/// What occupies a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Variable,
    Parameter,
    Temporary(TempKind),
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Variable => f.pad("var"),
            SlotKind::Parameter => f.pad("param"),
            SlotKind::Temporary(kind) => f.pad(kind.as_str()),
        }
    }
}

/// Size and position of one symbol within its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutInfo {
    pub size: u32,
    pub offset: i32,
    pub kind: SlotKind,
}

/// An inherited class's region at the top of a class frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRegion {
    pub class: String,
    pub size: u32,
    pub offset: i32,
}

/// Layout of a whole scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameLayout {
    /// Running offset after the last placed slot (always `<= 0`).
    pub scope_offset: i32,
    /// Frame size in bytes. For classes, the size of one instance.
    pub size: u32,
    pub return_offset: Option<i32>,
    pub return_size: u32,
    pub link_register_offset: Option<i32>,
    pub link_register_size: u32,
    pub bases: Vec<BaseRegion>,
}

/// Output of the memory-layout pass.
#[derive(Debug, Default)]
pub struct LayoutOutput {
    /// The rewritten copy of the scope tree, temporaries included.
    pub tree: ScopeTree,
    pub symbols: FxHashMap<(ScopeId, SymbolKey), LayoutInfo>,
    pub frames: FxHashMap<ScopeId, FrameLayout>,
    /// Instance size of every class, in the order they were sized.
    pub class_sizes: IndexMap<String, u32>,
    /// Number of temporaries created.
    pub temporaries: usize,
    pub diagnostics: Diagnostics,
}

impl LayoutOutput {
    /// Layout of the non-function symbol `name` in `scope`.
    pub fn info(&self, scope: ScopeId, name: &str) -> Option<&LayoutInfo> {
        self.info_for(scope, &SymbolKey::Name(name.to_string()))
    }

    pub fn info_for(&self, scope: ScopeId, key: &SymbolKey) -> Option<&LayoutInfo> {
        self.symbols.get(&(scope, key.clone()))
    }

    pub fn frame(&self, scope: ScopeId) -> Option<&FrameLayout> {
        self.frames.get(&scope)
    }

    /// Frame of the scope at `path`, e.g. `["Point", "norm()"]`.
    pub fn frame_at<S: AsRef<str>>(&self, path: &[S]) -> Option<&FrameLayout> {
        self.tree.find_path(path).and_then(|id| self.frame(id))
    }

    /// Layout of `name` in the scope at `path`.
    pub fn info_at<S: AsRef<str>>(&self, path: &[S], name: &str) -> Option<&LayoutInfo> {
        self.tree.find_path(path).and_then(|id| self.info(id, name))
    }

    pub fn class_size(&self, name: &str) -> Option<u32> {
        self.class_sizes.get(name).copied()
    }
}

// ============================================================================
// Pass
// ============================================================================

/// Pass 2: lay out every scope and annotate the AST with temporaries.
pub struct LayoutPass<'a> {
    ast: &'a mut Ast,
    target: TargetLayout,
    tree: ScopeTree,
    /// Locals removed from function scopes, waiting for their declaration.
    stripped: FxHashMap<(ScopeId, String), Symbol>,
    symbols: FxHashMap<(ScopeId, SymbolKey), LayoutInfo>,
    frames: FxHashMap<ScopeId, FrameLayout>,
    class_sizes: IndexMap<String, u32>,
    /// Classes whose size is being computed.
    sizing: FxHashSet<String>,
    /// Function scopes whose body has been laid out.
    visited: FxHashSet<ScopeId>,
    current: ScopeId,
    current_class: Option<String>,
    /// Last number used for a `t{n}` name.
    temp_counter: usize,
    temporaries: usize,
    diagnostics: Diagnostics,
}

impl<'a> LayoutPass<'a> {
    /// Prepare a pass over `ast` using a copy of `scopes`.
    pub fn new(ast: &'a mut Ast, scopes: &ScopeTree, target: TargetLayout) -> Self {
        let tree = scopes.clone();
        let current = tree.root();
        Self {
            ast,
            target,
            tree,
            stripped: FxHashMap::default(),
            symbols: FxHashMap::default(),
            frames: FxHashMap::default(),
            class_sizes: IndexMap::new(),
            sizing: FxHashSet::default(),
            visited: FxHashSet::default(),
            current,
            current_class: None,
            temp_counter: 0,
            temporaries: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> LayoutOutput {
        self.ast.clear_annotations();
        self.strip_locals();
        self.layout_classes();
        self.layout_remaining();

        if let Some(root) = self.ast.root() {
            self.visit_program(root);
        }

        debug!(
            scopes = self.frames.len(),
            temporaries = self.temporaries,
            diagnostics = self.diagnostics.len(),
            "memory layout finished"
        );

        LayoutOutput {
            tree: self.tree,
            symbols: self.symbols,
            frames: self.frames,
            class_sizes: self.class_sizes,
            temporaries: self.temporaries,
            diagnostics: self.diagnostics,
        }
    }

    fn strip_locals(&mut self) {
        for id in self.tree.preorder() {
            let Some(table) = self.tree.scope_mut(id) else {
                continue;
            };
            if table.kind() != ScopeKind::Function {
                continue;
            }
            for local in table.drain_kind(SymbolKind::Variable) {
                self.stripped.insert((id, local.name.clone()), local);
            }
        }
    }

    // ==========================================================================
    // Sizes
    // ==========================================================================

    fn layout_classes(&mut self) {
        let classes: Vec<(String, Span)> = self
            .tree
            .scope(self.tree.root())
            .into_iter()
            .flat_map(|t| t.symbols())
            .filter(|s| s.kind == SymbolKind::Class)
            .map(|s| (s.name.clone(), s.declaration_span))
            .collect();
        for (class, span) in classes {
            self.class_size(&class, span);
        }
    }

    fn layout_remaining(&mut self) {
        for id in self.tree.preorder() {
            if !self.frames.contains_key(&id) {
                self.layout_scope(id);
            }
        }
    }

    /// Instance size of `class`, laying the class out first if needed.
    ///
    /// A class already being sized (it contains itself, directly or not)
    /// and an unknown class both take a pointer-sized placeholder.
    fn class_size(&mut self, class: &str, span: Span) -> u32 {
        if let Some(&size) = self.class_sizes.get(class) {
            return size;
        }
        let Some(scope) = self.tree.class_scope(class) else {
            self.diagnostics.report(SemanticError::UnknownType {
                name: class.to_string(),
                span,
            });
            return self.target.pointer_size;
        };
        if !self.sizing.insert(class.to_string()) {
            debug!(class, "recursive containment, using pointer placeholder");
            return self.target.pointer_size;
        }

        self.layout_scope(scope);
        self.sizing.remove(class);

        let size = self
            .frames
            .get(&scope)
            .map_or(self.target.pointer_size, |f| f.size);
        self.class_sizes.insert(class.to_string(), size);
        size
    }

    fn type_size(&mut self, type_name: &str, span: Span) -> u32 {
        match self.target.primitive_size(type_name) {
            Some(size) => size,
            None => self.class_size(type_name, span),
        }
    }

    /// Storage size of a variable or parameter. A size past `u32` reads as
    /// `u32::MAX` so that placing it fails.
    fn symbol_size(&mut self, symbol: &Symbol) -> u32 {
        if symbol.has_dynamic_dimension() {
            return self.target.pointer_size;
        }
        let base = self.type_size(&symbol.declared_type, symbol.declaration_span);
        symbol
            .array_dimensions
            .iter()
            .try_fold(u64::from(base), |acc, &dim| {
                acc.checked_mul(u64::from(dim.unsigned_abs()))
            })
            .and_then(|size| u32::try_from(size).ok())
            .unwrap_or(u32::MAX)
    }

    /// Place the symbols currently in `scope` and record its frame.
    fn layout_scope(&mut self, scope: ScopeId) {
        let Some(table) = self.tree.scope(scope) else {
            return;
        };
        let kind = table.kind();
        let name = table.name().to_string();
        let span = table.span();
        let owner = table.owner().cloned();
        let storage: Vec<Symbol> = table.storage().cloned().collect();

        let mut frame = FrameLayout::default();
        let mut running = 0;

        match kind {
            ScopeKind::Class => {
                for parent in self.parents_of(&name) {
                    let size = self.class_size(&parent, span);
                    let (size, offset) = self.place(scope, running, size, &parent, span);
                    running = offset;
                    frame.bases.push(BaseRegion {
                        class: parent,
                        size,
                        offset: running,
                    });
                }
            }
            ScopeKind::Function => {
                let return_type = self.return_type(scope, owner.as_ref(), span);
                if return_type != primitives::VOID {
                    let size = self.type_size(&return_type, span);
                    let (size, offset) = self.place(scope, running, size, "return value", span);
                    running = offset;
                    frame.return_offset = Some(running);
                    frame.return_size = size;
                }
                let link = self.target.link_register_size;
                let (link, offset) = self.place(scope, running, link, "link register", span);
                running = offset;
                frame.link_register_offset = Some(running);
                frame.link_register_size = link;
            }
            ScopeKind::Global => {}
        }

        for symbol in storage {
            let size = self.symbol_size(&symbol);
            let (size, offset) =
                self.place(scope, running, size, &symbol.name, symbol.declaration_span);
            running = offset;
            let slot = match symbol.kind {
                SymbolKind::Parameter => SlotKind::Parameter,
                _ => SlotKind::Variable,
            };
            debug!(scope = %name, symbol = %symbol.name, size, offset = running, "placed symbol");
            self.symbols.insert(
                (scope, symbol.key()),
                LayoutInfo {
                    size,
                    offset: running,
                    kind: slot,
                },
            );
        }

        frame.scope_offset = running;
        frame.size = running.unsigned_abs();
        if kind == ScopeKind::Class {
            frame.size = frame.size.max(self.target.pointer_size);
        }
        debug!(scope = %name, size = frame.size, "laid out scope");
        self.frames.insert(scope, frame);
    }

    /// Declared return type of the function owning `scope`.
    fn return_type(&mut self, scope: ScopeId, owner: Option<&Signature>, span: Span) -> String {
        let found = owner.and_then(|sig| {
            let parent = self.tree.parent(scope)?;
            self.tree
                .scope(parent)?
                .get_function(sig)
                .map(|f| f.declared_type.clone())
        });
        match found {
            Some(ty) => ty,
            None => {
                self.diagnostics.report(SemanticError::UnknownFunction {
                    name: self.tree.qualified_name(scope),
                    span,
                });
                primitives::VOID.to_string()
            }
        }
    }

    fn parents_of(&self, class: &str) -> Vec<String> {
        self.tree
            .lookup(self.tree.root(), class, true)
            .filter(|s| s.kind == SymbolKind::Class)
            .map(|s| s.inherited_classes.clone())
            .unwrap_or_default()
    }

    /// `class` followed by its ancestors, breadth first, each once.
    fn class_chain(&self, class: &str) -> Vec<String> {
        let mut chain = vec![class.to_string()];
        let mut seen: FxHashSet<String> = chain.iter().cloned().collect();
        let mut i = 0;
        while i < chain.len() {
            for parent in self.parents_of(&chain[i]) {
                if seen.insert(parent.clone()) {
                    chain.push(parent);
                }
            }
            i += 1;
        }
        chain
    }

    // ==========================================================================
    // Slots
    // ==========================================================================

    /// Offset of `size` bytes below `running`, with the size actually used.
    ///
    /// A slot whose offset would not fit in an `i32` is reported and shrunk
    /// to a pointer-sized placeholder.
    fn place(
        &mut self,
        scope: ScopeId,
        running: i32,
        size: u32,
        name: &str,
        span: Span,
    ) -> (u32, i32) {
        if let Some(offset) = self.target.place(running, size) {
            return (size, offset);
        }
        self.diagnostics.report(SemanticError::FrameOverflow {
            name: name.to_string(),
            scope: self.tree.qualified_name(scope),
            span,
        });
        let size = self.target.pointer_size;
        (size, self.target.place(running, size).unwrap_or(running))
    }

    /// Reserve `size` bytes below the running offset of `scope`.
    fn push_slot(&mut self, scope: ScopeId, size: u32, name: &str, span: Span) -> (u32, i32) {
        let running = self.frames.get(&scope).map_or(0, |f| f.scope_offset);
        let (size, offset) = self.place(scope, running, size, name, span);
        let frame = self.frames.entry(scope).or_default();
        frame.scope_offset = offset;
        frame.size = frame.size.max(offset.unsigned_abs());
        (size, offset)
    }

    /// Put a stripped local back into the current function scope.
    fn place_local(&mut self, node: NodeId) {
        let decl = VarDecl::read(self.ast, node);
        let Some(symbol) = self.stripped.remove(&(self.current, decl.name)) else {
            return;
        };
        let size = self.symbol_size(&symbol);
        let key = symbol.key();
        let name = symbol.name.clone();
        let span = symbol.declaration_span;
        if !self.tree.insert(self.current, symbol) {
            self.diagnostics.report(SemanticError::DuplicateVariable {
                name,
                scope: self.tree.qualified_name(self.current),
                span,
            });
            return;
        }

        let (size, offset) = self.push_slot(self.current, size, &name, span);
        debug!(local = %name, size, offset, "placed local");
        self.symbols.insert(
            (self.current, key),
            LayoutInfo {
                size,
                offset,
                kind: SlotKind::Variable,
            },
        );
    }

    /// Next `t{n}` name not used by a symbol of the current scope, placed or
    /// still waiting for its declaration.
    fn next_temp_name(&mut self) -> String {
        loop {
            self.temp_counter += 1;
            let name = format!("t{}", self.temp_counter);
            let placed = self
                .tree
                .scope(self.current)
                .is_some_and(|t| t.get(&name).is_some());
            let pending = self.stripped.contains_key(&(self.current, name.clone()));
            if !placed && !pending {
                return name;
            }
            debug!(temp = %name, "name taken by a declared symbol");
        }
    }

    /// Create the temporary holding the value of `node`.
    fn temporary(&mut self, node: NodeId, type_name: &str, kind: TempKind) {
        let span = self.ast.span(node);
        let name = self.next_temp_name();
        self.temporaries += 1;
        let size = match kind {
            TempKind::Address => self.target.pointer_size,
            _ => self.type_size(type_name, span),
        };
        let (size, offset) = self.push_slot(self.current, size, &name, span);

        let symbol = Symbol::variable(&name, type_name, Vec::new(), span);
        if self.tree.insert(self.current, symbol) {
            self.symbols.insert(
                (self.current, SymbolKey::Name(name.clone())),
                LayoutInfo {
                    size,
                    offset,
                    kind: SlotKind::Temporary(kind),
                },
            );
        }

        debug!(temp = %name, ty = type_name, %kind, size, offset, "allocated temporary");
        self.ast.annotate(
            node,
            TempAnnotation {
                name,
                type_name: type_name.to_string(),
                size,
                offset,
                kind,
            },
        );
    }

    // ==========================================================================
    // Traversal
    // ==========================================================================

    fn kids(&self, node: NodeId) -> Vec<NodeId> {
        self.ast.children(node).collect()
    }

    fn visit_program(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            NodeKind::Program => {
                for list in self.kids(node) {
                    self.visit_program(list);
                }
            }
            NodeKind::ImplementationList => {
                for implementation in self.kids(node) {
                    self.visit_implementation(implementation);
                }
            }
            NodeKind::FunctionList => {
                let root = self.tree.root();
                for function in self.kids(node) {
                    self.visit_function(function, None, root);
                }
            }
            NodeKind::Implementation => self.visit_implementation(node),
            NodeKind::Function => {
                let root = self.tree.root();
                self.visit_function(node, None, root);
            }
            _ => {}
        }
    }

    fn visit_implementation(&mut self, node: NodeId) {
        let class = self
            .ast
            .child_of_kind(node, NodeKind::ImplementationId)
            .map(|id| self.ast.value(id).to_string())
            .unwrap_or_else(|| self.ast.value(node).to_string());
        // Unknown classes were already reported while building scopes
        let Some(scope) = self.tree.class_scope(&class) else {
            return;
        };
        let functions = self
            .ast
            .child_of_kind(node, NodeKind::ImplementationFunctionList)
            .map(|list| self.kids(list))
            .unwrap_or_default();
        for function in functions {
            self.visit_function(function, Some(&class), scope);
        }
    }

    fn visit_function(&mut self, node: NodeId, class: Option<&str>, parent: ScopeId) {
        let Some(header) = FunctionHeader::read(self.ast, node, class) else {
            return;
        };
        let key = header.signature().scope_key();
        let Some(scope) = self.tree.nested(parent, &key) else {
            self.diagnostics.report(SemanticError::UnknownScope {
                key,
                span: header.span,
            });
            return;
        };
        // A rejected duplicate definition shares the first one's scope
        if !self.visited.insert(scope) {
            return;
        }

        let saved_scope = std::mem::replace(&mut self.current, scope);
        let saved_class = std::mem::replace(&mut self.current_class, class.map(str::to_string));
        if let Some(body) = self.ast.child_of_kind(node, NodeKind::FunctionBody) {
            for child in self.kids(body) {
                self.visit_statement(child);
            }
        }
        self.current = saved_scope;
        self.current_class = saved_class;
    }

    fn visit_statement(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            NodeKind::LocalVariable => self.place_local(node),
            kind if kind.is_expression() => {
                self.visit_expr(node);
            }
            _ => {
                for child in self.kids(node) {
                    self.visit_statement(child);
                }
            }
        }
    }

    /// Lay out the temporaries of an expression and return its type.
    fn visit_expr(&mut self, node: NodeId) -> String {
        let kind = self.ast.kind(node);
        match kind {
            NodeKind::Int => {
                self.temporary(node, primitives::INT, TempKind::Literal);
                primitives::INT.to_string()
            }
            NodeKind::Float => {
                self.temporary(node, primitives::FLOAT, TempKind::Literal);
                primitives::FLOAT.to_string()
            }
            NodeKind::AddOp | NodeKind::MultOp | NodeKind::RelOp => {
                let op = self.ast.value(node).to_string();
                let kids = self.kids(node);
                let operands: Vec<String> = kids.into_iter().map(|k| self.visit_expr(k)).collect();
                let logical = matches!(op.as_str(), "and" | "or");
                let ty = if kind == NodeKind::RelOp || logical {
                    primitives::INT
                } else if operands.iter().any(|t| t == primitives::FLOAT) {
                    primitives::FLOAT
                } else {
                    primitives::INT
                };
                self.temporary(node, ty, TempKind::Result);
                ty.to_string()
            }
            NodeKind::FunctionCall => self.visit_call(node, None),
            NodeKind::ArrayAccess => {
                let mut kids = self.kids(node).into_iter();
                let element = match kids.next() {
                    Some(base) => self.visit_expr(base),
                    None => primitives::INT.to_string(),
                };
                for index in kids {
                    self.visit_expr(index);
                }
                self.temporary(node, primitives::INT, TempKind::Address);
                element
            }
            NodeKind::DotAccess => self.visit_dot(node),
            NodeKind::Identifier => {
                let name = self.ast.value(node).to_string();
                self.identifier_type(&name, self.ast.span(node))
            }
            NodeKind::SelfIdentifier => self
                .current_class
                .clone()
                .unwrap_or_else(|| primitives::INT.to_string()),
            _ => {
                for child in self.kids(node) {
                    self.visit_statement(child);
                }
                primitives::INT.to_string()
            }
        }
    }

    fn visit_dot(&mut self, node: NodeId) -> String {
        let kids = self.kids(node);
        let (Some(&object), Some(&member)) = (kids.first(), kids.get(1)) else {
            return primitives::INT.to_string();
        };
        let class = self.visit_expr(object);
        match self.ast.kind(member) {
            NodeKind::FunctionCall => self.visit_call(member, Some(&class)),
            _ => {
                let name = self.ast.value(member).to_string();
                let ty = match self.find_member(&class, &name) {
                    Some(ty) => ty,
                    None => {
                        self.diagnostics.report(SemanticError::UnknownMember {
                            class,
                            member: name,
                            span: self.ast.span(member),
                        });
                        primitives::INT.to_string()
                    }
                };
                self.temporary(node, primitives::INT, TempKind::Address);
                ty
            }
        }
    }

    /// Lay out a call's arguments and its return-value temporary. Calls to
    /// `void` functions get no temporary.
    fn visit_call(&mut self, node: NodeId, receiver: Option<&str>) -> String {
        let name = self.ast.value(node).to_string();
        let span = self.ast.span(node);
        let arg_types: Vec<String> = self
            .kids(node)
            .into_iter()
            .map(|arg| self.visit_expr(arg))
            .collect();

        let candidates = match receiver {
            Some(class) => self.class_functions(class, &name),
            None => self.visible_functions(&name),
        };
        let return_type = if let Some(chosen) = choose_overload(&candidates, &name, &arg_types) {
            chosen.declared_type.clone()
        } else if receiver.is_none() && self.tree.class_scope(&name).is_some() {
            // Implicit constructor
            name.clone()
        } else {
            self.diagnostics
                .report(SemanticError::UnknownFunction { name, span });
            return primitives::INT.to_string();
        };

        if return_type != primitives::VOID {
            self.temporary(node, &return_type, TempKind::ReturnValue);
        }
        return_type
    }

    // ==========================================================================
    // Name resolution
    // ==========================================================================

    /// Type of an identifier: current function scope, then the enclosing
    /// class and its ancestors, then the global scope.
    fn identifier_type(&mut self, name: &str, span: Span) -> String {
        let local = self
            .tree
            .scope(self.current)
            .and_then(|t| t.get(name))
            .filter(|s| is_storage(s))
            .map(|s| s.declared_type.clone());
        if let Some(ty) = local {
            return ty;
        }
        if let Some(class) = self.current_class.clone()
            && let Some(ty) = self.find_member(&class, name)
        {
            return ty;
        }
        let global = self
            .tree
            .scope(self.tree.root())
            .and_then(|t| t.get(name))
            .filter(|s| is_storage(s))
            .map(|s| s.declared_type.clone());
        if let Some(ty) = global {
            return ty;
        }

        self.diagnostics.report(SemanticError::UndeclaredIdentifier {
            name: name.to_string(),
            span,
        });
        primitives::INT.to_string()
    }

    /// Declared type of data member `member` of `class` or an ancestor.
    fn find_member(&self, class: &str, member: &str) -> Option<String> {
        self.class_chain(class).iter().find_map(|c| {
            let scope = self.tree.class_scope(c)?;
            self.tree
                .scope(scope)?
                .get(member)
                .filter(|s| is_storage(s))
                .map(|s| s.declared_type.clone())
        })
    }

    /// Overloads of `name` declared in `class` or an ancestor.
    fn class_functions(&self, class: &str, name: &str) -> Vec<Symbol> {
        self.class_chain(class)
            .iter()
            .filter_map(|c| self.tree.class_scope(c))
            .filter_map(|scope| self.tree.scope(scope))
            .flat_map(|t| t.functions_named(name).into_iter().cloned())
            .collect()
    }

    /// Overloads visible from the current function.
    fn visible_functions(&self, name: &str) -> Vec<Symbol> {
        let mut found: Vec<Symbol> = self
            .tree
            .lookup_functions(self.current, name, false)
            .into_iter()
            .cloned()
            .collect();
        if found.is_empty()
            && let Some(class) = &self.current_class
        {
            found = self.class_functions(class, name);
        }
        found
    }
}

fn is_storage(symbol: &Symbol) -> bool {
    matches!(symbol.kind, SymbolKind::Variable | SymbolKind::Parameter)
}

/// Pick the overload for a call: exact argument types, else the only one
/// with a matching arity, else the first.
fn choose_overload<'s>(
    candidates: &'s [Symbol],
    name: &str,
    args: &[String],
) -> Option<&'s Symbol> {
    let wanted = Signature::new(name, args.to_vec());
    if let Some(exact) = candidates
        .iter()
        .find(|c| c.signature().as_ref() == Some(&wanted))
    {
        return Some(exact);
    }
    let mut same_arity = candidates.iter().filter(|c| c.params.len() == args.len());
    if let (Some(only), None) = (same_arity.next(), same_arity.next()) {
        return Some(only);
    }
    candidates.first()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::ScopeBuildingPass;
    use moonc_ast::AstBuilder;

    fn layout(ast: &mut Ast) -> LayoutOutput {
        let built = ScopeBuildingPass::new(ast).run();
        LayoutPass::new(ast, &built.tree, TargetLayout::default()).run()
    }

    fn program(f: impl FnOnce(&mut AstBuilder) -> Vec<NodeId>) -> Ast {
        let mut b = AstBuilder::new();
        let lists = f(&mut b);
        let root = b.program(&lists);
        b.finish(root)
    }

    #[test]
    fn void_function_with_two_locals() {
        let mut ast = program(|b| {
            let x = b.local("int", "x", &[]);
            let y = b.local("int", "y", &[]);
            let f = b.function("main", &[], "void", &[x, y]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);

        let frame = out.frame_at(&["main()"]).unwrap();
        assert_eq!(frame.return_offset, None);
        assert_eq!(frame.link_register_offset, Some(-4));
        assert_eq!(out.info_at(&["main()"], "x").unwrap().offset, -8);
        assert_eq!(out.info_at(&["main()"], "y").unwrap().offset, -12);
        assert_eq!(frame.size, 12);
        assert_eq!(frame.scope_offset, -12);
    }

    #[test]
    fn float_return_slot_precedes_link_register() {
        let mut ast = program(|b| {
            let f = b.function("pi", &[], "float", &[]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);

        let frame = out.frame_at(&["pi()"]).unwrap();
        assert_eq!(frame.return_offset, Some(-8));
        assert_eq!(frame.return_size, 8);
        assert_eq!(frame.link_register_offset, Some(-12));
    }

    #[test]
    fn fixed_array_size_and_offset() {
        let mut ast = program(|b| {
            let arr = b.data_member("int", "arr", &["10"]);
            let arr = b.member(None, arr);
            let class = b.class("Buffer", &[], &[arr]);
            vec![b.class_list(&[class])]
        });
        let out = layout(&mut ast);

        let info = out.info_at(&["Buffer"], "arr").unwrap();
        assert_eq!(info.size, 40);
        assert_eq!(info.offset, -40);
        assert_eq!(out.class_size("Buffer"), Some(40));
    }

    #[test]
    fn dynamic_array_is_pointer_sized() {
        let mut ast = program(|b| {
            let p = b.param("float", "values", &[""]);
            let f = b.function("sum", &[p], "float", &[]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);
        let info = out.info_at(&["sum(float[])"], "values").unwrap();
        assert_eq!(info.size, 4);
        assert_eq!(info.kind, SlotKind::Parameter);
        // return -8, link -12, values -16
        assert_eq!(info.offset, -16);
    }

    #[test]
    fn empty_class_is_pointer_sized() {
        let mut ast = program(|b| {
            let class = b.class("Empty", &[], &[]);
            vec![b.class_list(&[class])]
        });
        let out = layout(&mut ast);
        assert_eq!(out.frame_at(&["Empty"]).unwrap().size, 4);
        assert_eq!(out.frame_at(&["Empty"]).unwrap().scope_offset, 0);
        assert_eq!(out.frame(out.tree.root()).unwrap().scope_offset, 0);
    }

    #[test]
    fn literal_sum_creates_three_temporaries() {
        let mut nodes = None;
        let mut ast = program(|b| {
            let x = b.local("int", "x", &[]);
            let one = b.int("1");
            let two = b.int("2");
            let sum = b.add("+", one, two);
            let target = b.ident("x");
            let assign = b.assign(target, sum);
            nodes = Some((one, two, sum));
            let f = b.function("main", &[], "void", &[x, assign]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);
        let (one, two, sum) = nodes.unwrap();

        let t1 = ast.annotation(one).unwrap();
        let t2 = ast.annotation(two).unwrap();
        let t3 = ast.annotation(sum).unwrap();
        assert_eq!((t1.name.as_str(), t1.kind), ("t1", TempKind::Literal));
        assert_eq!((t2.name.as_str(), t2.kind), ("t2", TempKind::Literal));
        assert_eq!((t3.name.as_str(), t3.kind), ("t3", TempKind::Result));
        assert!(t1.offset > t2.offset && t2.offset > t3.offset);
        for t in [t1, t2, t3] {
            assert_eq!(t.type_name, "int");
            assert_eq!(t.offset % 4, 0);
        }
        assert_eq!(out.temporaries, 3);

        let scope = out.tree.find_path(&["main()"]).unwrap();
        let order: Vec<_> = out
            .tree
            .scope(scope)
            .unwrap()
            .symbols()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(order, vec!["x", "t1", "t2", "t3"]);
    }

    #[test]
    fn float_operand_promotes_result() {
        let mut op = None;
        let mut ast = program(|b| {
            let a = b.int("1");
            let c = b.float("2.5");
            let m = b.mult("*", a, c);
            op = Some(m);
            let w = b.write(m);
            let f = b.function("main", &[], "void", &[w]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);
        let t = ast.annotation(op.unwrap()).unwrap();
        assert_eq!(t.type_name, "float");
        assert_eq!(t.size, 8);
        assert_eq!(t.offset % 8, 0);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn logical_and_relational_yield_int() {
        let mut ops = Vec::new();
        let mut ast = program(|b| {
            let a = b.float("1.0");
            let c = b.float("2.0");
            let lt = b.rel("<", a, c);
            let d = b.float("3.0");
            let e = b.float("4.0");
            let and = b.mult("and", d, e);
            ops.push(lt);
            ops.push(and);
            let w1 = b.write(lt);
            let w2 = b.write(and);
            let f = b.function("main", &[], "void", &[w1, w2]);
            vec![b.function_list(&[f])]
        });
        layout(&mut ast);
        for op in ops {
            assert_eq!(ast.annotation(op).unwrap().type_name, "int");
        }
    }

    #[test]
    fn call_creates_return_value_temporary() {
        let mut calls = Vec::new();
        let mut ast = program(|b| {
            let p = b.param("int", "n", &[]);
            let sq = b.function("square", &[p], "float", &[]);
            let log = b.function("log", &[], "void", &[]);
            let arg = b.int("3");
            let call = b.call("square", &[arg]);
            let stmt = b.write(call);
            let vcall = b.call("log", &[]);
            let vstmt = b.expr_stmt(vcall);
            calls.push(call);
            calls.push(vcall);
            let main = b.function("main", &[], "void", &[stmt, vstmt]);
            vec![b.function_list(&[sq, log, main])]
        });
        let out = layout(&mut ast);

        let ret = ast.annotation(calls[0]).unwrap();
        assert_eq!(ret.kind, TempKind::ReturnValue);
        assert_eq!(ret.type_name, "float");
        assert_eq!(ret.name, "t2");
        assert!(ast.annotation(calls[1]).is_none());
        assert_eq!(out.temporaries, 2);
    }

    #[test]
    fn overload_chosen_by_argument_types() {
        let mut call = None;
        let mut ast = program(|b| {
            let p = b.param("int", "n", &[]);
            let f_int = b.function("f", &[p], "int", &[]);
            let p = b.param("float", "n", &[]);
            let f_float = b.function("f", &[p], "float", &[]);
            let arg = b.float("1.5");
            let c = b.call("f", &[arg]);
            call = Some(c);
            let stmt = b.write(c);
            let main = b.function("main", &[], "void", &[stmt]);
            vec![b.function_list(&[f_int, f_float, main])]
        });
        layout(&mut ast);
        assert_eq!(ast.annotation(call.unwrap()).unwrap().type_name, "float");
    }

    #[test]
    fn class_member_embeds_other_class() {
        let mut ast = program(|b| {
            let x = b.data_member("float", "x", &[]);
            let x = b.member(None, x);
            let y = b.data_member("float", "y", &[]);
            let y = b.member(None, y);
            let point = b.class("Point", &[], &[x, y]);
            let a = b.data_member("Point", "a", &[]);
            let a = b.member(None, a);
            let n = b.data_member("int", "n", &[]);
            let n = b.member(None, n);
            // Line is declared before Point is laid out
            let line = b.class("Line", &[], &[a, n]);
            vec![b.class_list(&[line, point])]
        });
        let out = layout(&mut ast);
        assert_eq!(out.class_size("Point"), Some(16));
        assert_eq!(out.info_at(&["Line"], "a").unwrap().size, 16);
        assert_eq!(out.info_at(&["Line"], "n").unwrap().offset, -20);
        assert_eq!(out.class_size("Line"), Some(20));
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn recursive_containment_uses_placeholder() {
        let mut ast = program(|b| {
            let v = b.data_member("int", "value", &[]);
            let v = b.member(None, v);
            let next = b.data_member("Node", "next", &[]);
            let next = b.member(None, next);
            let node = b.class("Node", &[], &[v, next]);
            vec![b.class_list(&[node])]
        });
        let out = layout(&mut ast);
        assert_eq!(out.info_at(&["Node"], "next").unwrap().size, 4);
        assert_eq!(out.class_size("Node"), Some(8));
    }

    #[test]
    fn unknown_class_type_is_reported() {
        let mut ast = program(|b| {
            let g = b.local("Ghost", "g", &[]);
            let f = b.function("main", &[], "void", &[g]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);
        assert_eq!(out.info_at(&["main()"], "g").unwrap().size, 4);
        assert!(matches!(
            out.diagnostics.iter().next(),
            Some(SemanticError::UnknownType { name, .. }) if name == "Ghost"
        ));
    }

    #[test]
    fn base_class_region_comes_first() {
        let mut ast = program(|b| {
            let w = b.data_member("float", "w", &[]);
            let w = b.member(None, w);
            let shape = b.class("Shape", &[], &[w]);
            let r = b.data_member("int", "r", &[]);
            let r = b.member(None, r);
            let circle = b.class("Circle", &["Shape"], &[r]);
            vec![b.class_list(&[circle, shape])]
        });
        let out = layout(&mut ast);
        let frame = out.frame_at(&["Circle"]).unwrap();
        assert_eq!(
            frame.bases,
            vec![BaseRegion {
                class: "Shape".into(),
                size: 8,
                offset: -8
            }]
        );
        assert_eq!(out.info_at(&["Circle"], "r").unwrap().offset, -12);
        assert_eq!(out.class_size("Circle"), Some(12));
    }

    #[test]
    fn member_access_and_indexing_produce_addresses() {
        let mut nodes = None;
        let mut ast = program(|b| {
            let x = b.data_member("float", "x", &[]);
            let x = b.member(None, x);
            let point = b.class("Point", &[], &[x]);
            let p = b.local("Point", "p", &[]);
            let v = b.local("int", "v", &["5"]);
            let obj = b.ident("p");
            let member = b.ident("x");
            let dot = b.dot(obj, member);
            let base = b.ident("v");
            let i = b.int("0");
            let idx = b.index(base, &[i]);
            let sum = b.add("+", dot, idx);
            let w = b.write(sum);
            nodes = Some((dot, idx, sum));
            let f = b.function("main", &[], "void", &[p, v, w]);
            vec![b.class_list(&[point]), b.function_list(&[f])]
        });
        let out = layout(&mut ast);
        let (dot, idx, sum) = nodes.unwrap();

        assert_eq!(ast.annotation(dot).unwrap().kind, TempKind::Address);
        assert_eq!(ast.annotation(dot).unwrap().size, 4);
        assert_eq!(ast.annotation(idx).unwrap().kind, TempKind::Address);
        // float member + int element
        assert_eq!(ast.annotation(sum).unwrap().type_name, "float");
        assert!(out.diagnostics.is_empty(), "{}", out.diagnostics);
    }

    #[test]
    fn member_function_sees_class_members() {
        let mut sum = None;
        let mut ast = program(|b| {
            let r = b.data_member("float", "r", &[]);
            let r = b.member(None, r);
            let decl = b.function_decl("area", &[], "float");
            let decl = b.member(Some("public"), decl);
            let circle = b.class("Circle", &[], &[r, decl]);

            let lhs = b.ident("r");
            let rhs = b.ident("r");
            let m = b.mult("*", lhs, rhs);
            sum = Some(m);
            let ret = b.ret(Some(m));
            let area = b.function("area", &[], "float", &[ret]);
            let imp = b.implementation("Circle", &[area]);
            vec![b.class_list(&[circle]), b.implementation_list(&[imp])]
        });
        let out = layout(&mut ast);
        assert_eq!(ast.annotation(sum.unwrap()).unwrap().type_name, "float");
        let frame = out.frame_at(&["Circle", "area()"]).unwrap();
        assert_eq!(frame.return_offset, Some(-8));
        assert_eq!(frame.link_register_offset, Some(-12));
        assert_eq!(frame.scope_offset, -24);
    }

    #[test]
    fn undeclared_identifier_defaults_to_int() {
        let mut ast = program(|b| {
            let id = b.ident("ghost");
            let one = b.int("1");
            let sum = b.add("+", id, one);
            let w = b.write(sum);
            let f = b.function("main", &[], "void", &[w]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);
        assert_eq!(out.diagnostics.len(), 1);
        assert!(matches!(
            out.diagnostics.iter().next(),
            Some(SemanticError::UndeclaredIdentifier { name, .. }) if name == "ghost"
        ));
        assert_eq!(out.temporaries, 2);
    }

    #[test]
    fn layout_does_not_touch_built_tree() {
        let mut ast = program(|b| {
            let x = b.local("int", "x", &[]);
            let one = b.int("1");
            let w = b.write(one);
            let f = b.function("main", &[], "void", &[x, w]);
            vec![b.function_list(&[f])]
        });
        let built = ScopeBuildingPass::new(&ast).run();
        let scope = built.tree.find_path(&["main()"]).unwrap();
        let before = built.tree.scope(scope).unwrap().len();
        let out = LayoutPass::new(&mut ast, &built.tree, TargetLayout::default()).run();

        assert_eq!(built.tree.scope(scope).unwrap().len(), before);
        assert_eq!(out.tree.scope(scope).unwrap().len(), before + 1);
    }

    #[test]
    fn offsets_never_increase_and_respect_alignment() {
        let mut ast = program(|b| {
            let a = b.local("int", "a", &[]);
            let c = b.local("float", "c", &[]);
            let d = b.local("int", "d", &["3"]);
            let one = b.int("1");
            let half = b.float("0.5");
            let sum = b.add("+", one, half);
            let w = b.write(sum);
            let f = b.function("main", &[], "float", &[a, c, d, w]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);
        let scope = out.tree.find_path(&["main()"]).unwrap();

        let mut last = 0;
        for symbol in out.tree.scope(scope).unwrap().symbols() {
            let info = out.info(scope, &symbol.name).unwrap();
            assert!(info.offset < last, "{} at {}", symbol.name, info.offset);
            let align = if info.size >= 8 { 8 } else { 4 };
            assert_eq!(info.offset % align, 0, "{} misaligned", symbol.name);
            last = info.offset;
        }
        assert!(out.frame(scope).unwrap().scope_offset <= last);
    }

    #[test]
    fn repeated_runs_are_identical() {
        let source = program(|b| {
            let x = b.local("float", "x", &[]);
            let one = b.int("1");
            let two = b.float("2.0");
            let s = b.add("+", one, two);
            let t = b.ident("x");
            let a = b.assign(t, s);
            let f = b.function("main", &[], "void", &[x, a]);
            vec![b.function_list(&[f])]
        });
        let built = ScopeBuildingPass::new(&source).run();

        let mut first_ast = source.clone();
        let first = LayoutPass::new(&mut first_ast, &built.tree, TargetLayout::default()).run();
        let mut second_ast = source.clone();
        let second = LayoutPass::new(&mut second_ast, &built.tree, TargetLayout::default()).run();

        assert_eq!(first_ast.annotations(), second_ast.annotations());
        assert_eq!(first.frames, second.frames);
        assert_eq!(first.symbols, second.symbols);
    }

    #[test]
    fn choose_overload_prefers_exact_then_arity() {
        let make = |params: &[&str]| {
            let params = params
                .iter()
                .map(|t| moonc_registry::Param {
                    name: "p".into(),
                    type_name: t.to_string(),
                })
                .collect();
            Symbol::function("f", "int", params, Span::default())
        };
        let candidates = vec![make(&["int"]), make(&["float"]), make(&["int", "int"])];

        let exact = choose_overload(&candidates, "f", &["float".into()]).unwrap();
        assert_eq!(exact.params[0].type_name, "float");
        let arity = choose_overload(&candidates, "f", &["Point".into(), "int".into()]).unwrap();
        assert_eq!(arity.params.len(), 2);
        let first = choose_overload(&candidates, "f", &["Point".into()]).unwrap();
        assert_eq!(first.params[0].type_name, "int");
        assert!(choose_overload(&[], "f", &[]).is_none());
    }

    #[test]
    fn oversized_local_falls_back_to_pointer_slot() {
        let mut ast = program(|b| {
            let big = b.local("int", "big", &["600000000"]);
            let after = b.local("int", "after", &[]);
            let f = b.function("main", &[], "void", &[big, after]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);

        let big = out.info_at(&["main()"], "big").unwrap();
        assert_eq!((big.size, big.offset), (4, -8));
        assert_eq!(out.info_at(&["main()"], "after").unwrap().offset, -12);
        assert_eq!(out.frame_at(&["main()"]).unwrap().size, 12);
        assert_eq!(out.diagnostics.len(), 1);
        assert!(matches!(
            out.diagnostics.iter().next(),
            Some(SemanticError::FrameOverflow { name, scope, .. })
                if name == "big" && scope == "main()"
        ));
    }

    #[test]
    fn frame_past_i32_reports_instead_of_wrapping() {
        let mut ast = program(|b| {
            let a = b.local("int", "a", &["500000000"]);
            let c = b.local("int", "c", &["500000000"]);
            let f = b.function("main", &[], "void", &[a, c]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);

        let a = out.info_at(&["main()"], "a").unwrap();
        assert_eq!((a.size, a.offset), (2_000_000_000, -2_000_000_008));
        let c = out.info_at(&["main()"], "c").unwrap();
        assert_eq!((c.size, c.offset), (4, -2_000_000_012));
        assert_eq!(out.frame_at(&["main()"]).unwrap().size, 2_000_000_012);

        let overflows: Vec<_> = out
            .diagnostics
            .iter()
            .filter_map(|e| match e {
                SemanticError::FrameOverflow { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(overflows, vec!["c"]);
    }

    #[test]
    fn temporary_skips_names_of_later_locals() {
        let mut ast = program(|b| {
            let one = b.int("1");
            let w = b.write(one);
            let t1 = b.local("int", "t1", &[]);
            let f = b.function("main", &[], "void", &[w, t1]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);
        assert!(out.diagnostics.is_empty(), "{}", out.diagnostics);

        let literal = out.info_at(&["main()"], "t2").unwrap();
        assert_eq!(literal.offset, -8);
        assert_eq!(literal.kind, SlotKind::Temporary(TempKind::Literal));
        let local = out.info_at(&["main()"], "t1").unwrap();
        assert_eq!(local.offset, -12);
        assert_eq!(local.kind, SlotKind::Variable);
        assert_eq!(out.temporaries, 1);
        assert_eq!(ast.annotations().len(), 1);
    }

    #[test]
    fn frame_diagnostics_point_at_the_function() {
        let mut ast = program(|b| {
            b.line(5);
            let f = b.function("make", &[], "Ghost", &[]);
            vec![b.function_list(&[f])]
        });
        let out = layout(&mut ast);
        let error = out.diagnostics.iter().next().unwrap();
        assert!(matches!(error, SemanticError::UnknownType { name, .. } if name == "Ghost"));
        assert_eq!(error.span(), Span::line(5));
    }
}
