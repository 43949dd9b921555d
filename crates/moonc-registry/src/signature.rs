//! Function signatures and symbol keys.

use std::fmt;

/// A function's identity: its name plus ordered parameter types.
///
/// The `Display` form (`name(int, float[])`) is also the key of the
/// function's nested scope, see [`scope_key`](Self::scope_key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signature {
    pub name: String,
    pub param_types: Vec<String>,
}

impl Signature {
    pub fn new(name: impl Into<String>, param_types: Vec<String>) -> Self {
        Self {
            name: name.into(),
            param_types,
        }
    }

    pub fn arity(&self) -> usize {
        self.param_types.len()
    }

    /// The key under which the function's scope is nested in its parent.
    ///
    /// Registration and lookup both go through this function, so a scope is
    /// always found under exactly one key.
    pub fn scope_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.param_types.join(", "))
    }
}

/// Identity of a symbol within one scope.
///
/// Functions are keyed by full signature so overloads coexist; everything
/// else is keyed by bare name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolKey {
    Name(String),
    Function(Signature),
}

impl SymbolKey {
    pub fn name(&self) -> &str {
        match self {
            SymbolKey::Name(name) => name,
            SymbolKey::Function(sig) => &sig.name,
        }
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKey::Name(name) => f.write_str(name),
            SymbolKey::Function(sig) => write!(f, "{}", sig),
        }
    }
}
