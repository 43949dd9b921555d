//! Ordered diagnostic collection shared by both passes.

use std::fmt;

use crate::SemanticError;

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The program is invalid; later phases should not emit code.
    Error,
    /// Suspicious but legal code.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A collection of diagnostics in the order they were reported.
///
/// Passes push into this list and carry on; whether a compile attempt should
/// stop is decided by the caller from [`has_errors`](Self::has_errors).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<SemanticError>,
}

impl Diagnostics {
    /// Creates a new, empty diagnostics collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn report(&mut self, error: SemanticError) {
        match error.severity() {
            Severity::Error => tracing::warn!(%error, "semantic error"),
            Severity::Warning => tracing::debug!(%error, "semantic warning"),
        }
        self.items.push(error);
    }

    /// Append every diagnostic of `other`, keeping its order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// All diagnostics, errors and warnings interleaved in report order.
    pub fn iter(&self) -> impl Iterator<Item = &SemanticError> {
        self.items.iter()
    }

    /// Only the diagnostics with [`Severity::Error`].
    pub fn errors(&self) -> impl Iterator<Item = &SemanticError> {
        self.items.iter().filter(|d| d.severity() == Severity::Error)
    }

    /// Only the diagnostics with [`Severity::Warning`].
    pub fn warnings(&self) -> impl Iterator<Item = &SemanticError> {
        self.items.iter().filter(|d| d.severity() == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the collection, returning the raw list.
    pub fn into_vec(self) -> Vec<SemanticError> {
        self.items
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            writeln!(f, "{}: {}", item.severity(), item)?;
        }
        Ok(())
    }
}
