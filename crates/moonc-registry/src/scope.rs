//! A single scope's symbol table.

use std::fmt;

use indexmap::IndexMap;
use moonc_core::Span;
use rustc_hash::FxHashMap;

use crate::{ScopeId, Signature, Symbol, SymbolKey, SymbolKind};

/// The region a scope covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Class,
    Function,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Global => f.write_str("global"),
            ScopeKind::Class => f.write_str("class"),
            ScopeKind::Function => f.write_str("function"),
        }
    }
}

/// Symbols of one scope, kept in insertion order.
///
/// Functions are keyed by [`Signature`] and additionally indexed by bare
/// name, in registration order, so overload sets can be listed without a
/// scan.
#[derive(Debug, Clone)]
pub struct ScopeTable {
    name: String,
    kind: ScopeKind,
    /// For function scopes, the signature of the owning function.
    owner: Option<Signature>,
    /// Where the class or function owning this scope is declared.
    span: Span,
    symbols: IndexMap<SymbolKey, Symbol>,
    function_index: FxHashMap<String, Vec<Signature>>,
    pub(crate) nested: IndexMap<String, ScopeId>,
}

impl ScopeTable {
    pub fn new(name: impl Into<String>, kind: ScopeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            owner: None,
            span: Span::default(),
            symbols: IndexMap::new(),
            function_index: FxHashMap::default(),
            nested: IndexMap::new(),
        }
    }

    /// A function scope owned by the function with `signature`.
    pub fn function(name: impl Into<String>, signature: Signature) -> Self {
        let mut table = Self::new(name, ScopeKind::Function);
        table.owner = Some(signature);
        table
    }

    /// Set the source position of the scope's owner.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn owner(&self) -> Option<&Signature> {
        self.owner.as_ref()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    // ==========================================================================
    // Mutation
    // ==========================================================================

    /// Insert a symbol.
    ///
    /// Returns `false` without touching the table when a non-function symbol
    /// of the same name exists, or a function with the same signature exists.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        let name_key = SymbolKey::Name(symbol.name.clone());
        if self.symbols.contains_key(&name_key) {
            return false;
        }

        let key = symbol.key();
        match &key {
            SymbolKey::Function(sig) => {
                if self.symbols.contains_key(&key) {
                    return false;
                }
                self.function_index
                    .entry(sig.name.clone())
                    .or_default()
                    .push(sig.clone());
            }
            SymbolKey::Name(name) => {
                if self.function_index.contains_key(name) {
                    return false;
                }
            }
        }
        self.symbols.insert(key, symbol);
        true
    }

    /// Remove the non-function symbol called `name`, keeping the order of
    /// the rest.
    pub fn remove(&mut self, name: &str) -> Option<Symbol> {
        let key = SymbolKey::Name(name.to_string());
        self.symbols.shift_remove(&key)
    }

    /// Remove every symbol of `kind`, returning them in their original order.
    pub fn drain_kind(&mut self, kind: SymbolKind) -> Vec<Symbol> {
        let keys: Vec<_> = self
            .symbols
            .iter()
            .filter(|(_, s)| s.kind == kind)
            .map(|(k, _)| k.clone())
            .collect();
        keys.iter()
            .filter_map(|k| self.symbols.shift_remove(k))
            .collect()
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(&SymbolKey::Name(name.to_string()))
    }

    pub fn get_function_mut(&mut self, signature: &Signature) -> Option<&mut Symbol> {
        let key = SymbolKey::Function(signature.clone());
        self.symbols.get_mut(&key)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Local lookup by bare name. A function name yields its first overload.
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        if let Some(symbol) = self.symbols.get(&SymbolKey::Name(name.to_string())) {
            return Some(symbol);
        }
        self.function_index
            .get(name)
            .and_then(|sigs| sigs.first())
            .and_then(|sig| self.get_function(sig))
    }

    pub fn get_function(&self, signature: &Signature) -> Option<&Symbol> {
        self.symbols.get(&SymbolKey::Function(signature.clone()))
    }

    /// Every overload called `name`, in registration order.
    pub fn functions_named(&self, name: &str) -> Vec<&Symbol> {
        self.function_index
            .get(name)
            .map(|sigs| sigs.iter().filter_map(|s| self.get_function(s)).collect())
            .unwrap_or_default()
    }

    /// All symbols in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&SymbolKey, &Symbol)> {
        self.symbols.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Variables and parameters, in insertion order.
    pub fn storage(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols
            .values()
            .filter(|s| matches!(s.kind, SymbolKind::Variable | SymbolKind::Parameter))
    }

    pub fn functions(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols
            .values()
            .filter(|s| s.kind == SymbolKind::Function)
    }

    /// Keys of nested scopes in insertion order.
    pub fn nested_keys(&self) -> impl Iterator<Item = &str> {
        self.nested.keys().map(String::as_str)
    }
}
