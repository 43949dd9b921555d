//! Error types for the moonc front end.
//!
//! ## Error Hierarchy
//!
//! ```text
//! Error (top-level wrapper)
//! ├── SemanticError - scope building and layout diagnostics
//! └── Io            - failures writing reports
//! ```
//!
//! Semantic errors are never returned through `Result` by the passes. They
//! are accumulated in [`Diagnostics`](crate::Diagnostics) and the passes keep
//! going, so a single run reports everything it can find.

use thiserror::Error;

use crate::{Severity, Span};

// ============================================================================
// Semantic Errors
// ============================================================================

/// Diagnostics produced by the scope-building and memory-layout passes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    // Duplicate declarations
    /// A class with this name already exists.
    #[error("at {span}: multiply declared class '{name}'")]
    DuplicateClass { name: String, span: Span },

    /// A function with the same name and parameter types already exists in the scope.
    #[error("at {span}: multiply declared function '{signature}'")]
    DuplicateFunction { signature: String, span: Span },

    /// A data member or local variable was declared twice in one scope.
    #[error("at {span}: multiply declared variable '{name}' in '{scope}'")]
    DuplicateVariable {
        name: String,
        scope: String,
        span: Span,
    },

    /// A parameter name appears twice in one parameter list.
    #[error("at {span}: multiply declared parameter '{name}' in '{function}'")]
    DuplicateParameter {
        name: String,
        function: String,
        span: Span,
    },

    // Undeclared references
    /// An inheritance list names something that is not a class.
    #[error("at {span}: class '{class}' inherits from undeclared class '{parent}'")]
    UndeclaredParentClass {
        class: String,
        parent: String,
        span: Span,
    },

    /// An implementation block names a class that was never declared.
    #[error("at {span}: implementation for undeclared class '{name}'")]
    UndeclaredClass { name: String, span: Span },

    /// The layout pass could not find the scope registered for a class or function.
    #[error("at {span}: no scope registered for '{key}'")]
    UnknownScope { key: String, span: Span },

    /// A type name could not be sized.
    #[error("at {span}: unknown type '{name}'")]
    UnknownType { name: String, span: Span },

    /// A called function could not be resolved.
    #[error("at {span}: unknown function '{name}'")]
    UnknownFunction { name: String, span: Span },

    /// An identifier in an expression is not visible from the current scope.
    #[error("at {span}: undeclared identifier '{name}'")]
    UndeclaredIdentifier { name: String, span: Span },

    /// A member access names a member the class does not have.
    #[error("at {span}: class '{class}' has no member '{member}'")]
    UnknownMember {
        class: String,
        member: String,
        span: Span,
    },

    // Declaration / definition mismatch
    /// A member function was declared in a class but never implemented.
    #[error("at {span}: no definition for declared member function '{class}::{signature}'")]
    MissingDefinition {
        class: String,
        signature: String,
        span: Span,
    },

    /// A member function was implemented without being declared in its class.
    #[error("at {span}: definition provided for undeclared member function '{class}::{signature}'")]
    MissingDeclaration {
        class: String,
        signature: String,
        span: Span,
    },

    /// A class inherits from itself, directly or transitively.
    #[error("at {span}: circular inheritance involving class '{name}'")]
    CircularInheritance { name: String, span: Span },

    // Invalid literal data
    /// An array dimension is not a positive integer literal.
    #[error("at {span}: invalid array dimension '{text}'")]
    InvalidArrayDimension { text: String, span: Span },

    /// A slot is too large to be addressed from its frame base.
    #[error("at {span}: '{name}' does not fit in the stack frame of '{scope}'")]
    FrameOverflow {
        name: String,
        scope: String,
        span: Span,
    },

    // Warnings
    /// A function shares its name with another overload in the same scope.
    #[error("at {span}: overloaded function '{signature}'")]
    OverloadedFunction { signature: String, span: Span },

    /// A class member hides a member inherited from a parent class.
    #[error("at {span}: member '{member}' in class '{class}' shadows inherited member from '{parent}'")]
    ShadowedMember {
        member: String,
        class: String,
        parent: String,
        span: Span,
    },
}

impl SemanticError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            SemanticError::DuplicateClass { span, .. } => *span,
            SemanticError::DuplicateFunction { span, .. } => *span,
            SemanticError::DuplicateVariable { span, .. } => *span,
            SemanticError::DuplicateParameter { span, .. } => *span,
            SemanticError::UndeclaredParentClass { span, .. } => *span,
            SemanticError::UndeclaredClass { span, .. } => *span,
            SemanticError::UnknownScope { span, .. } => *span,
            SemanticError::UnknownType { span, .. } => *span,
            SemanticError::UnknownFunction { span, .. } => *span,
            SemanticError::UndeclaredIdentifier { span, .. } => *span,
            SemanticError::UnknownMember { span, .. } => *span,
            SemanticError::MissingDefinition { span, .. } => *span,
            SemanticError::MissingDeclaration { span, .. } => *span,
            SemanticError::CircularInheritance { span, .. } => *span,
            SemanticError::InvalidArrayDimension { span, .. } => *span,
            SemanticError::FrameOverflow { span, .. } => *span,
            SemanticError::OverloadedFunction { span, .. } => *span,
            SemanticError::ShadowedMember { span, .. } => *span,
        }
    }

    /// Severity of this diagnostic.
    pub fn severity(&self) -> Severity {
        match self {
            SemanticError::OverloadedFunction { .. } | SemanticError::ShadowedMember { .. } => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// Check if this is a duplicate-declaration diagnostic.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            SemanticError::DuplicateClass { .. }
                | SemanticError::DuplicateFunction { .. }
                | SemanticError::DuplicateVariable { .. }
                | SemanticError::DuplicateParameter { .. }
        )
    }
}

// ============================================================================
// Top-level Error
// ============================================================================

/// Unified error type for fallible front-end entry points.
#[derive(Debug, Error)]
pub enum Error {
    /// A semantic diagnostic promoted to a hard failure.
    #[error(transparent)]
    Semantic(#[from] SemanticError),

    /// A report could not be written.
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this is a semantic error.
    pub fn is_semantic(&self) -> bool {
        matches!(self, Error::Semantic(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semantic_error_display() {
        let err = SemanticError::DuplicateFunction {
            signature: "f(int)".to_string(),
            span: Span::line(4),
        };
        assert_eq!(
            err.to_string(),
            "at line 4: multiply declared function 'f(int)'"
        );
        assert_eq!(err.span(), Span::line(4));
        assert!(err.is_duplicate());
    }

    #[test]
    fn warnings_have_warning_severity() {
        let warn = SemanticError::OverloadedFunction {
            signature: "f(float)".to_string(),
            span: Span::line(1),
        };
        assert_eq!(warn.severity(), Severity::Warning);

        let err = SemanticError::UndeclaredClass {
            name: "Foo".to_string(),
            span: Span::line(1),
        };
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn error_conversion() {
        let sem = SemanticError::UnknownType {
            name: "Bar".to_string(),
            span: Span::line(2),
        };
        let err: Error = sem.into();
        assert!(err.is_semantic());

        let io: Error = std::io::Error::other("disk full").into();
        assert!(!io.is_semantic());
        assert_eq!(io.to_string(), "failed to write report: disk full");
    }
}
