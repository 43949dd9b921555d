//! moonc semantic passes
//!
//! A two-pass front end over an already parsed program.
//!
//! ## Architecture
//!
//! - **Pass 1 (Scope building)**: register classes, functions, parameters and
//!   variables into a [`ScopeTree`](moonc_registry::ScopeTree), checking for
//!   duplicates and declaration/definition mismatches
//! - **Pass 2 (Memory layout)**: on a private copy of that tree, size every
//!   symbol, synthesize temporaries for evaluated sub-expressions and assign
//!   stack offsets
//!
//! ## Modules
//!
//! - [`passes`]: the two passes and their outputs
//! - [`report`]: text renderings of the scope tree and the layout

pub mod passes;
pub mod report;

pub use passes::{
    BaseRegion, FrameLayout, LayoutInfo, LayoutOutput, LayoutPass, ScopeBuildingOutput,
    ScopeBuildingPass, SlotKind,
};
pub use report::{LayoutReport, SymbolTableReport};
