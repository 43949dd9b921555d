//! Shared foundation types for the moonc front end.
//!
//! - [`Span`]: source positions attached to diagnostics
//! - [`SemanticError`] / [`Error`]: the error taxonomy
//! - [`Diagnostics`]: the ordered, severity-tagged diagnostic list
//! - [`TargetLayout`]: sizes and alignments of the MOON target

mod diagnostics;
mod error;
mod span;
mod target;

pub use diagnostics::{Diagnostics, Severity};
pub use error::{Error, SemanticError};
pub use span::Span;
pub use target::{TargetLayout, primitives};
