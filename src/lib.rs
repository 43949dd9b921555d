//! moonc - scope resolution and stack-frame layout for the MOON language.
//!
//! Takes an already parsed program and runs both semantic passes over it:
//!
//! 1. scope building, producing the read-only [`ScopeTree`] handed to the
//!    type checker
//! 2. memory layout, producing frame sizes, symbol offsets and one annotated
//!    temporary per evaluated sub-expression for the code generator
//!
//! ```
//! use moonc::{AstBuilder, analyze};
//!
//! let mut b = AstBuilder::new();
//! let x = b.local("int", "x", &[]);
//! let main = b.function("main", &[], "void", &[x]);
//! let list = b.function_list(&[main]);
//! let root = b.program(&[list]);
//!
//! let analysis = analyze(b.finish(root));
//! assert!(!analysis.has_errors());
//! assert_eq!(analysis.layout.info_at(&["main()"], "x").unwrap().offset, -8);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

pub use moonc_ast::{Ast, AstBuilder, Node, NodeId, NodeKind, TempAnnotation, TempKind};
pub use moonc_compiler::{
    BaseRegion, FrameLayout, LayoutInfo, LayoutOutput, LayoutPass, LayoutReport,
    ScopeBuildingOutput, ScopeBuildingPass, SlotKind, SymbolTableReport,
};
pub use moonc_core::{Diagnostics, Error, SemanticError, Severity, Span, TargetLayout, primitives};
pub use moonc_registry::{
    Param, ScopeId, ScopeKind, ScopeTable, ScopeTree, Signature, Symbol, SymbolKey, SymbolKind,
    Visibility,
};

/// Extension of the symbol-table report file.
pub const SYMBOL_TABLE_EXTENSION: &str = "outsymboltables";
/// Extension of the memory-layout report file.
pub const LAYOUT_EXTENSION: &str = "outmemory";

/// Everything both passes produced for one program.
#[derive(Debug)]
pub struct Analysis {
    /// The program, with a temporary annotation on every evaluated sub-expression.
    pub ast: Ast,
    /// Scope tree as built by pass 1.
    pub scopes: ScopeTree,
    /// Layout computed by pass 2 over its own copy of the scopes.
    pub layout: LayoutOutput,
    /// Diagnostics of both passes, pass 1 first.
    pub diagnostics: Diagnostics,
}

/// Where [`Analysis::write_reports`] put its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub symbol_tables: PathBuf,
    pub memory: PathBuf,
}

/// Analyze `ast` for the default MOON target.
pub fn analyze(ast: Ast) -> Analysis {
    analyze_with(ast, TargetLayout::default())
}

/// Analyze `ast` for a specific target layout.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn analyze_with(mut ast: Ast, target: TargetLayout) -> Analysis {
    let built = ScopeBuildingPass::new(&ast).run();
    let layout = LayoutPass::new(&mut ast, &built.tree, target).run();

    let mut diagnostics = built.diagnostics;
    diagnostics.extend(layout.diagnostics.clone());
    debug!(
        errors = diagnostics.error_count(),
        warnings = diagnostics.warning_count(),
        "analysis finished"
    );

    Analysis {
        ast,
        scopes: built.tree,
        layout,
        diagnostics,
    }
}

impl Analysis {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// The analysis, or the first error it found.
    pub fn into_result(self) -> Result<Self, Error> {
        let first = self.diagnostics.errors().next().cloned();
        match first {
            Some(error) => Err(error.into()),
            None => Ok(self),
        }
    }

    pub fn symbol_table_report(&self) -> SymbolTableReport<'_> {
        SymbolTableReport::new(&self.scopes)
    }

    pub fn layout_report(&self) -> LayoutReport<'_> {
        LayoutReport::new(&self.layout)
    }

    /// Write both reports next to `source`, replacing its extension.
    pub fn write_reports(&self, source: impl AsRef<Path>) -> Result<ReportPaths, Error> {
        let source = source.as_ref();
        let paths = ReportPaths {
            symbol_tables: source.with_extension(SYMBOL_TABLE_EXTENSION),
            memory: source.with_extension(LAYOUT_EXTENSION),
        };
        fs::write(&paths.symbol_tables, self.symbol_table_report().to_string())?;
        fs::write(&paths.memory, self.layout_report().to_string())?;
        debug!(
            symbol_tables = %paths.symbol_tables.display(),
            memory = %paths.memory.display(),
            "wrote reports"
        );
        Ok(paths)
    }
}
