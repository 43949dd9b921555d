//! Scope and symbol model.
//!
//! - [`Symbol`]: a named entity (class, variable, function, parameter)
//! - [`Signature`]: function identity for overloading, and the canonical
//!   nested-scope key of a function
//! - [`ScopeTable`]: one scope's symbols, in insertion order
//! - [`ScopeTree`]: every scope of a program, stored in a `petgraph` graph
//!   with `Contains(key)` edges from parent to nested scope

mod scope;
mod signature;
mod symbol;
mod tree;

pub use scope::{ScopeKind, ScopeTable};
pub use signature::{Signature, SymbolKey};
pub use symbol::{Param, Symbol, SymbolKind, Visibility, format_type};
pub use tree::{GLOBAL_SCOPE, ScopeEdge, ScopeId, ScopeTree};
