//! Per-node layout annotations written by the memory-layout pass.

use std::fmt;

/// Why a temporary exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TempKind {
    /// Holds a literal value.
    Literal,
    /// Holds the result of an operator.
    Result,
    /// Holds the value returned by a call.
    ReturnValue,
    /// Holds a computed element or member address.
    Address,
}

impl TempKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TempKind::Literal => "litval",
            TempKind::Result => "tempvar",
            TempKind::ReturnValue => "retval",
            TempKind::Address => "addr",
        }
    }
}

impl fmt::Display for TempKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The temporary attached to one expression node.
///
/// This is the code generator's channel for recovering where a
/// sub-expression's value lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempAnnotation {
    pub name: String,
    pub type_name: String,
    pub size: u32,
    pub offset: i32,
    pub kind: TempKind,
}
