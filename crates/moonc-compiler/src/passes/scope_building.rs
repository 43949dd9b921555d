//! Scope-Building Pass (Pass 1) - Build the scope tree.
//!
//! This pass walks the AST once and registers every class, function,
//! parameter and variable into a fresh [`ScopeTree`]. It never stops on an
//! error: problems are recorded in [`Diagnostics`] and the offending
//! declaration is skipped.
//!
//! ## Responsibilities
//!
//! - Register classes and their data members and member function declarations
//! - Register free functions and implementations of member functions
//! - Detect duplicates (classes, functions by signature, variables, parameters)
//! - Resolve inheritance after all classes are known (forward references work)
//! - Check declarations against definitions once traversal is done
//!
//! ## Scope shape
//!
//! ```text
//! global
//! ├── Point                 (class)
//! │   ├── Point(float)      (constructor)
//! │   └── norm()            (member function)
//! └── main()                (free function)
//! ```

use moonc_ast::{Ast, NodeId, NodeKind};
use moonc_core::{Diagnostics, SemanticError, Span};
use moonc_registry::{ScopeId, ScopeKind, ScopeTable, ScopeTree, Symbol, SymbolKind, Visibility};
use rustc_hash::FxHashSet;
use tracing::debug;

use super::{FunctionHeader, VarDecl, for_each_local, parse_dimension};

/// Output of the scope-building pass.
#[derive(Debug, Default)]
pub struct ScopeBuildingOutput {
    /// The finished scope tree, read-only from here on.
    pub tree: ScopeTree,
    /// Number of classes registered.
    pub classes_registered: usize,
    /// Number of functions registered (declarations and definitions).
    pub functions_registered: usize,
    /// Number of data members and locals registered.
    pub variables_registered: usize,
    /// Collected errors and warnings, in discovery order.
    pub diagnostics: Diagnostics,
}

/// Parent class names awaiting resolution.
#[derive(Debug)]
struct PendingInheritance {
    class: String,
    parents: Vec<(String, Span)>,
}

/// Pass 1: build the scope tree.
pub struct ScopeBuildingPass<'a> {
    ast: &'a Ast,
    tree: ScopeTree,
    /// Scope that new symbols go into.
    current: ScopeId,
    /// Class whose members or implementation is being visited.
    current_class: Option<String>,
    /// Sticky member visibility within a class body.
    visibility: Visibility,
    pending_inheritance: Vec<PendingInheritance>,
    classes_registered: usize,
    functions_registered: usize,
    variables_registered: usize,
    diagnostics: Diagnostics,
}

impl<'a> ScopeBuildingPass<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        let tree = ScopeTree::new();
        let current = tree.root();
        Self {
            ast,
            tree,
            current,
            current_class: None,
            visibility: Visibility::Private,
            pending_inheritance: Vec::new(),
            classes_registered: 0,
            functions_registered: 0,
            variables_registered: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Run the pass over the whole program.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> ScopeBuildingOutput {
        if let Some(root) = self.ast.root() {
            self.visit_program(root);
        }

        self.resolve_inheritance();
        self.check_circular_inheritance();
        self.check_function_consistency();
        self.check_shadowed_members();

        debug!(
            classes = self.classes_registered,
            functions = self.functions_registered,
            variables = self.variables_registered,
            diagnostics = self.diagnostics.len(),
            "scope building finished"
        );

        ScopeBuildingOutput {
            tree: self.tree,
            classes_registered: self.classes_registered,
            functions_registered: self.functions_registered,
            variables_registered: self.variables_registered,
            diagnostics: self.diagnostics,
        }
    }

    /// Run `f` with `scope` as the current scope, restoring the previous one
    /// afterwards.
    fn with_scope<R>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.current, scope);
        let result = f(self);
        self.current = saved;
        result
    }

    /// Same as [`with_scope`](Self::with_scope), also setting the current class.
    fn with_class<R>(&mut self, class: &str, scope: ScopeId, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved_class = self.current_class.replace(class.to_string());
        let saved_visibility = std::mem::take(&mut self.visibility);
        let result = self.with_scope(scope, f);
        self.current_class = saved_class;
        self.visibility = saved_visibility;
        result
    }

    fn visit_program(&mut self, node: NodeId) {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::Program => {
                for list in ast.children(node) {
                    self.visit_program(list);
                }
            }
            NodeKind::ClassList => {
                for class in ast.children(node) {
                    self.visit_class(class);
                }
            }
            NodeKind::ImplementationList => {
                for implementation in ast.children(node) {
                    self.visit_implementation(implementation);
                }
            }
            NodeKind::FunctionList => {
                for function in ast.children(node) {
                    self.visit_function(function);
                }
            }
            NodeKind::Class => self.visit_class(node),
            NodeKind::Implementation => self.visit_implementation(node),
            NodeKind::Function => self.visit_function(node),
            _ => {}
        }
    }

    // ==========================================================================
    // Classes
    // ==========================================================================

    fn visit_class(&mut self, node: NodeId) {
        let ast = self.ast;
        let name = ast
            .child_of_kind(node, NodeKind::ClassId)
            .map(|id| ast.value(id).to_string())
            .unwrap_or_else(|| ast.value(node).to_string());
        let span = ast.span(node);
        let root = self.tree.root();

        if self.tree.lookup(root, &name, true).is_some() {
            self.diagnostics
                .report(SemanticError::DuplicateClass { name, span });
            return;
        }

        self.tree.insert(root, Symbol::class(&name, span));
        let table = ScopeTable::new(name.clone(), ScopeKind::Class).with_span(span);
        let scope = self.tree.add_nested(root, &name, table);
        self.classes_registered += 1;
        debug!(class = %name, "registered class scope");

        // Collect parents now, resolve once every class is known
        if let Some(list) = ast.child_of_kind(node, NodeKind::InheritanceList) {
            let parents: Vec<_> = ast
                .children(list)
                .map(|p| (ast.value(p).to_string(), ast.span(p)))
                .collect();
            if !parents.is_empty() {
                self.pending_inheritance.push(PendingInheritance {
                    class: name.clone(),
                    parents,
                });
            }
        }

        self.with_class(&name, scope, |this| {
            if let Some(members) = ast.child_of_kind(node, NodeKind::MemberList) {
                for member in ast.children(members) {
                    this.visit_member(member);
                }
            }
        });
    }

    fn visit_member(&mut self, node: NodeId) {
        let ast = self.ast;
        for child in ast.children(node) {
            match ast.kind(child) {
                NodeKind::Visibility => {
                    self.visibility = Visibility::from_marker(ast.value(child));
                }
                NodeKind::Variable => self.visit_variable(child),
                NodeKind::FunctionDeclaration => self.visit_function_declaration(child),
                _ => {}
            }
        }
    }

    /// A member function declared inside a class body.
    fn visit_function_declaration(&mut self, node: NodeId) {
        let class = self.current_class.clone();
        let Some(header) = FunctionHeader::read(self.ast, node, class.as_deref()) else {
            return;
        };
        let mut symbol = header.to_symbol();
        symbol.declared = true;
        symbol.defined = false;
        symbol.visibility = self.visibility;
        self.register_function(&header, symbol, class.as_deref());
    }

    // ==========================================================================
    // Functions
    // ==========================================================================

    fn visit_implementation(&mut self, node: NodeId) {
        let ast = self.ast;
        let name = ast
            .child_of_kind(node, NodeKind::ImplementationId)
            .map(|id| ast.value(id).to_string())
            .unwrap_or_else(|| ast.value(node).to_string());

        let Some(scope) = self.tree.class_scope(&name) else {
            self.diagnostics.report(SemanticError::UndeclaredClass {
                name,
                span: ast.span(node),
            });
            return;
        };

        self.with_class(&name, scope, |this| {
            if let Some(list) = ast.child_of_kind(node, NodeKind::ImplementationFunctionList) {
                for function in ast.children(list) {
                    this.visit_function(function);
                }
            }
        });
    }

    /// A function with a body: free, or a member implementation when a class
    /// is current.
    fn visit_function(&mut self, node: NodeId) {
        let class = self.current_class.clone();
        let Some(header) = FunctionHeader::read(self.ast, node, class.as_deref()) else {
            return;
        };
        let signature = header.signature();

        let existing = self
            .tree
            .scope(self.current)
            .and_then(|t| t.get_function(&signature))
            .map(|s| (s.declared, s.defined));

        let scope = match (existing, class.is_some()) {
            // Implementation of a declared member function
            (Some((true, false)), true) => self.define_declared(&header),
            (Some(_), _) => {
                self.diagnostics.report(SemanticError::DuplicateFunction {
                    signature: signature.to_string(),
                    span: header.span,
                });
                None
            }
            (None, is_member) => {
                let mut symbol = header.to_symbol();
                symbol.declared = !is_member;
                symbol.defined = true;
                symbol.definition_span = Some(header.span);
                self.register_function(&header, symbol, class.as_deref())
            }
        };

        let Some(scope) = scope else {
            return;
        };
        let ast = self.ast;
        if let Some(body) = ast.child_of_kind(node, NodeKind::FunctionBody) {
            self.with_scope(scope, |this| {
                for_each_local(ast, body, &mut |local| this.visit_variable(local));
            });
        }
    }

    /// Mark a declared member function defined and let the implementation's
    /// parameters replace the declaration's.
    fn define_declared(&mut self, header: &FunctionHeader) -> Option<ScopeId> {
        let signature = header.signature();
        let table = self.tree.scope_mut(self.current)?;
        let symbol = table.get_function_mut(&signature)?;
        symbol.defined = true;
        symbol.definition_span = Some(header.span);
        symbol.params = header.to_symbol().params;

        let scope = self.tree.nested(self.current, &signature.scope_key())?;
        if let Some(table) = self.tree.scope_mut(scope) {
            table.drain_kind(SymbolKind::Parameter);
        }
        self.insert_params(scope, header);
        debug!(function = %signature, "member function defined");
        Some(scope)
    }

    /// Insert a new function symbol into the current scope and create its
    /// scope. Returns `None` when the symbol was rejected.
    fn register_function(
        &mut self,
        header: &FunctionHeader,
        symbol: Symbol,
        class: Option<&str>,
    ) -> Option<ScopeId> {
        let signature = header.signature();
        let overloaded = self
            .tree
            .scope(self.current)
            .is_some_and(|t| !t.functions_named(&header.name).is_empty());

        if !self.tree.insert(self.current, symbol) {
            self.diagnostics.report(SemanticError::DuplicateFunction {
                signature: signature.to_string(),
                span: header.span,
            });
            return None;
        }
        if overloaded {
            self.diagnostics.report(SemanticError::OverloadedFunction {
                signature: signature.to_string(),
                span: header.span,
            });
        }

        let table = ScopeTable::function(header.scope_name(class), signature.clone())
            .with_span(header.span);
        let key = signature.scope_key();
        let scope = self.tree.add_nested(self.current, &key, table);
        self.functions_registered += 1;
        debug!(function = %signature, "registered function scope");
        self.insert_params(scope, header);
        Some(scope)
    }

    fn insert_params(&mut self, scope: ScopeId, header: &FunctionHeader) {
        for param in &header.params {
            self.check_dimensions(param);
            if !self.tree.insert(scope, param.to_parameter()) {
                self.diagnostics.report(SemanticError::DuplicateParameter {
                    name: param.name.clone(),
                    function: header.signature().to_string(),
                    span: param.span,
                });
            }
        }
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    /// Data member or local variable.
    fn visit_variable(&mut self, node: NodeId) {
        let decl = VarDecl::read(self.ast, node);
        self.check_dimensions(&decl);

        let mut symbol =
            Symbol::variable(&decl.name, &decl.type_name, decl.dimensions(), decl.span);
        if self.current_class.is_some() && self.ast.kind(node) == NodeKind::Variable {
            symbol.visibility = self.visibility;
        }

        if self.tree.insert(self.current, symbol) {
            self.variables_registered += 1;
        } else {
            self.diagnostics.report(SemanticError::DuplicateVariable {
                name: decl.name,
                scope: self.tree.qualified_name(self.current),
                span: decl.span,
            });
        }
    }

    fn check_dimensions(&mut self, decl: &VarDecl) {
        for text in &decl.dims {
            if parse_dimension(text).is_none() {
                self.diagnostics.report(SemanticError::InvalidArrayDimension {
                    text: text.clone(),
                    span: decl.span,
                });
            }
        }
    }

    // ==========================================================================
    // Post-traversal checks
    // ==========================================================================

    fn resolve_inheritance(&mut self) {
        let root = self.tree.root();
        for pending in std::mem::take(&mut self.pending_inheritance) {
            let mut resolved = Vec::new();
            for (parent, span) in pending.parents {
                let is_class = self
                    .tree
                    .lookup(root, &parent, true)
                    .is_some_and(|s| s.kind == SymbolKind::Class);
                if is_class {
                    resolved.push(parent);
                } else {
                    self.diagnostics.report(SemanticError::UndeclaredParentClass {
                        class: pending.class.clone(),
                        parent,
                        span,
                    });
                }
            }
            if let Some(symbol) = self
                .tree
                .scope_mut(root)
                .and_then(|t| t.get_mut(&pending.class))
            {
                symbol.inherited_classes = resolved;
            }
        }
    }

    /// Report every class that can reach itself through its parents.
    fn check_circular_inheritance(&mut self) {
        let classes: Vec<(String, Span)> = self
            .class_symbols()
            .map(|s| (s.name.clone(), s.declaration_span))
            .collect();
        for (class, span) in classes {
            if self.reaches(&class, &class) {
                self.diagnostics
                    .report(SemanticError::CircularInheritance { name: class, span });
            }
        }
    }

    /// Whether `target` is a (transitive) parent of `from`.
    fn reaches(&self, from: &str, target: &str) -> bool {
        let mut seen = FxHashSet::default();
        let mut stack = self.parents_of(from);
        while let Some(class) = stack.pop() {
            if class == target {
                return true;
            }
            if seen.insert(class.clone()) {
                stack.extend(self.parents_of(&class));
            }
        }
        false
    }

    fn parents_of(&self, class: &str) -> Vec<String> {
        self.tree
            .lookup(self.tree.root(), class, true)
            .map(|s| s.inherited_classes.clone())
            .unwrap_or_default()
    }

    fn class_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.tree
            .scope(self.tree.root())
            .into_iter()
            .flat_map(|t| t.symbols())
            .filter(|s| s.kind == SymbolKind::Class)
    }

    /// Every declared member function is defined, and every defined one declared.
    fn check_function_consistency(&mut self) {
        let mut found = Vec::new();
        for class in self.class_symbols() {
            let Some(table) = self.tree.class_table(&class.name) else {
                continue;
            };
            for function in table.functions() {
                let Some(signature) = function.signature() else {
                    continue;
                };
                if function.declared && !function.defined {
                    found.push(SemanticError::MissingDefinition {
                        class: class.name.clone(),
                        signature: signature.to_string(),
                        span: function.declaration_span,
                    });
                } else if function.defined && !function.declared {
                    let defined_at = function.definition_span;
                    found.push(SemanticError::MissingDeclaration {
                        class: class.name.clone(),
                        signature: signature.to_string(),
                        span: defined_at.unwrap_or(function.declaration_span),
                    });
                }
            }
        }
        for error in found {
            self.diagnostics.report(error);
        }
    }

    /// Warn about data members that hide a data member of an ancestor class.
    fn check_shadowed_members(&mut self) {
        let mut found = Vec::new();
        for class in self.class_symbols() {
            let Some(table) = self.tree.class_table(&class.name) else {
                continue;
            };
            for member in table.storage() {
                if let Some(parent) = self.ancestor_declaring(&class.name, &member.name) {
                    found.push(SemanticError::ShadowedMember {
                        member: member.name.clone(),
                        class: class.name.clone(),
                        parent,
                        span: member.declaration_span,
                    });
                }
            }
        }
        for warning in found {
            self.diagnostics.report(warning);
        }
    }

    /// The nearest ancestor of `class` with a data member called `member`.
    fn ancestor_declaring(&self, class: &str, member: &str) -> Option<String> {
        let mut seen = FxHashSet::default();
        let mut queue = self.parents_of(class);
        queue.reverse();
        while let Some(parent) = queue.pop() {
            if parent == class || !seen.insert(parent.clone()) {
                continue;
            }
            let declares = self
                .tree
                .class_scope(&parent)
                .and_then(|id| self.tree.scope(id))
                .and_then(|t| t.get(member))
                .is_some_and(|s| s.kind == SymbolKind::Variable);
            if declares {
                return Some(parent);
            }
            let mut grand = self.parents_of(&parent);
            grand.reverse();
            queue.extend(grand);
        }
        None
    }
}
