//! Source location tracking for error reporting.
//!
//! Provides [`Span`] to track where declarations and diagnostics occur.

use std::fmt;

/// A source position.
///
/// The table-driven parser only records lines, so `col` is `0` for most
/// nodes; it is kept for front ends that track columns as well.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Span {
    /// Line number (1-indexed, `0` when unknown).
    pub line: u32,
    /// Column number (1-indexed, `0` when unknown).
    pub col: u32,
}

impl Span {
    /// Create a span from a line and column.
    #[inline]
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Create a span that only knows its line.
    #[inline]
    pub fn line(line: u32) -> Self {
        Self { line, col: 0 }
    }

    /// Whether this span carries no position at all.
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.line == 0 && self.col == 0
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.col == 0 {
            write!(f, "line {}", self.line)
        } else {
            write!(f, "{}:{}", self.line, self.col)
        }
    }
}
