//! Text reports of the scope tree and of the computed layout.
//!
//! Both reports walk scopes depth first with nested scopes in insertion
//! order. They are meant for people and for golden-file tests, so the
//! column widths may change.

use std::fmt;

use moonc_registry::{ScopeId, ScopeTree, Symbol, SymbolKind};

use crate::LayoutOutput;

/// Symbol tables as built by the scope-building pass.
pub struct SymbolTableReport<'a> {
    tree: &'a ScopeTree,
}

impl<'a> SymbolTableReport<'a> {
    pub fn new(tree: &'a ScopeTree) -> Self {
        Self { tree }
    }

    fn write_scope(&self, f: &mut fmt::Formatter<'_>, id: ScopeId, depth: usize) -> fmt::Result {
        let Some(table) = self.tree.scope(id) else {
            return Ok(());
        };
        let indent = "    ".repeat(depth);
        writeln!(f, "{}table: {}", indent, table.name())?;
        for symbol in table.symbols() {
            writeln!(
                f,
                "{}| {:<9}| {:<14}| {:<24}| {}",
                indent,
                symbol.kind,
                symbol.name,
                type_column(symbol),
                detail_column(symbol)
            )?;
        }
        for (_, nested) in self.tree.nested_scopes(id) {
            self.write_scope(f, nested, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SymbolTableReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_scope(f, self.tree.root(), 0)
    }
}

/// `(int, float[]):void` for functions, the dimensioned type otherwise.
fn type_column(symbol: &Symbol) -> String {
    match symbol.kind {
        SymbolKind::Function => {
            let params: Vec<_> = symbol.params.iter().map(|p| p.type_name.as_str()).collect();
            format!("({}):{}", params.join(", "), symbol.declared_type)
        }
        SymbolKind::Class => String::new(),
        _ => symbol.type_text(),
    }
}

fn detail_column(symbol: &Symbol) -> String {
    match symbol.kind {
        SymbolKind::Class if symbol.inherited_classes.is_empty() => "none".to_string(),
        SymbolKind::Class => symbol.inherited_classes.join(", "),
        SymbolKind::Parameter => String::new(),
        _ => symbol.visibility.to_string(),
    }
}

/// Frames, sizes and offsets computed by the layout pass.
pub struct LayoutReport<'a> {
    output: &'a LayoutOutput,
}

impl<'a> LayoutReport<'a> {
    pub fn new(output: &'a LayoutOutput) -> Self {
        Self { output }
    }

    fn write_scope(&self, f: &mut fmt::Formatter<'_>, id: ScopeId, depth: usize) -> fmt::Result {
        let tree = &self.output.tree;
        let Some(table) = tree.scope(id) else {
            return Ok(());
        };
        let indent = "    ".repeat(depth);
        let frame = self.output.frame(id);
        writeln!(
            f,
            "{}table: {} (size {})",
            indent,
            table.name(),
            frame.map_or(0, |fr| fr.size)
        )?;

        if let Some(frame) = frame {
            for base in &frame.bases {
                writeln!(
                    f,
                    "{}| {:<8}| {:<10}| {:<10}| {:>5}| {:>6}",
                    indent, "base", base.class, base.class, base.size, base.offset
                )?;
            }
            if let Some(offset) = frame.return_offset {
                writeln!(
                    f,
                    "{}| {:<8}| {:<10}| {:<10}| {:>5}| {:>6}",
                    indent, "return", "", "", frame.return_size, offset
                )?;
            }
            if let Some(offset) = frame.link_register_offset {
                writeln!(
                    f,
                    "{}| {:<8}| {:<10}| {:<10}| {:>5}| {:>6}",
                    indent, "link", "", "", frame.link_register_size, offset
                )?;
            }
        }

        for (key, symbol) in table.iter() {
            let Some(info) = self.output.info_for(id, key) else {
                continue;
            };
            writeln!(
                f,
                "{}| {:<8}| {:<10}| {:<10}| {:>5}| {:>6}",
                indent,
                info.kind,
                symbol.name,
                symbol.type_text(),
                info.size,
                info.offset
            )?;
        }

        for (_, nested) in tree.nested_scopes(id) {
            self.write_scope(f, nested, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for LayoutReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_scope(f, self.output.tree.root(), 0)
    }
}
