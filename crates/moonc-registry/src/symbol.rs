//! Symbols recorded in scope tables.

use std::fmt;

use moonc_core::Span;

use crate::{Signature, SymbolKey};

/// What a symbol names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Class,
    Variable,
    Function,
    Parameter,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SymbolKind::Class => "class",
            SymbolKind::Variable => "variable",
            SymbolKind::Function => "function",
            SymbolKind::Parameter => "param",
        };
        f.pad(s)
    }
}

/// Member visibility. Class members are private unless marked otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    /// Parse a visibility marker; anything but `public` is private.
    pub fn from_marker(marker: &str) -> Self {
        if marker == "public" {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => f.write_str("public"),
            Visibility::Private => f.write_str("private"),
        }
    }
}

/// A function parameter as recorded on its function symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    /// Full type text including dimensions, e.g. `int[10]`.
    pub type_name: String,
}

/// A named, typed entity recorded in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    /// Base type (a primitive or a class name); for functions, the return type.
    pub declared_type: String,
    pub kind: SymbolKind,
    pub visibility: Visibility,
    /// One entry per dimension, `-1` for an unsized one.
    pub array_dimensions: Vec<i32>,
    /// Parent classes in source order (classes only).
    pub inherited_classes: Vec<String>,
    /// Parameters in order (functions only).
    pub params: Vec<Param>,
    pub declared: bool,
    pub defined: bool,
    pub declaration_span: Span,
    pub definition_span: Option<Span>,
}

impl Symbol {
    fn base(name: &str, declared_type: &str, kind: SymbolKind, span: Span) -> Self {
        Self {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            kind,
            visibility: Visibility::Private,
            array_dimensions: Vec::new(),
            inherited_classes: Vec::new(),
            params: Vec::new(),
            declared: false,
            defined: false,
            declaration_span: span,
            definition_span: None,
        }
    }

    pub fn class(name: &str, span: Span) -> Self {
        let mut symbol = Self::base(name, name, SymbolKind::Class, span);
        symbol.declared = true;
        symbol.defined = true;
        symbol
    }

    pub fn variable(name: &str, declared_type: &str, dims: Vec<i32>, span: Span) -> Self {
        let mut symbol = Self::base(name, declared_type, SymbolKind::Variable, span);
        symbol.array_dimensions = dims;
        symbol
    }

    pub fn parameter(name: &str, declared_type: &str, dims: Vec<i32>, span: Span) -> Self {
        let mut symbol = Self::base(name, declared_type, SymbolKind::Parameter, span);
        symbol.array_dimensions = dims;
        symbol
    }

    /// A function symbol. Declared/defined flags are set by the caller.
    pub fn function(name: &str, return_type: &str, params: Vec<Param>, span: Span) -> Self {
        let mut symbol = Self::base(name, return_type, SymbolKind::Function, span);
        symbol.params = params;
        symbol
    }

    pub fn is_array(&self) -> bool {
        !self.array_dimensions.is_empty()
    }

    /// Whether any dimension is unsized.
    pub fn has_dynamic_dimension(&self) -> bool {
        self.array_dimensions.iter().any(|&d| d < 0)
    }

    /// Type text including dimensions: `int`, `float[10]`, `Node[]`.
    pub fn type_text(&self) -> String {
        format_type(&self.declared_type, &self.array_dimensions)
    }

    /// Overload identity of a function symbol.
    pub fn signature(&self) -> Option<Signature> {
        if self.kind != SymbolKind::Function {
            return None;
        }
        Some(Signature::new(
            self.name.clone(),
            self.params.iter().map(|p| p.type_name.clone()).collect(),
        ))
    }

    /// Key of this symbol within its scope.
    pub fn key(&self) -> SymbolKey {
        match self.signature() {
            Some(sig) => SymbolKey::Function(sig),
            None => SymbolKey::Name(self.name.clone()),
        }
    }
}

/// Render a base type with its dimensions.
pub fn format_type(base: &str, dims: &[i32]) -> String {
    let mut text = base.to_string();
    for &dim in dims {
        if dim < 0 {
            text.push_str("[]");
        } else {
            text.push_str(&format!("[{}]", dim));
        }
    }
    text
}
