//! Sizes and alignment rules of the MOON stack machine.

/// Built-in type names.
pub mod primitives {
    pub const INT: &str = "int";
    pub const FLOAT: &str = "float";
    pub const VOID: &str = "void";

    /// Whether `name` is one of the built-in types.
    pub fn is_primitive(name: &str) -> bool {
        matches!(name, INT | FLOAT | VOID)
    }
}

/// Byte sizes and alignments used by the layout pass.
///
/// `Default` describes the MOON target: 4-byte words and pointers, 8-byte
/// floats, a 4-byte link register slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLayout {
    pub int_size: u32,
    pub float_size: u32,
    pub pointer_size: u32,
    pub link_register_size: u32,
    /// Alignment of everything smaller than `double_align`.
    pub word_align: u32,
    /// Alignment of anything at least this large.
    pub double_align: u32,
}

impl Default for TargetLayout {
    fn default() -> Self {
        Self {
            int_size: 4,
            float_size: 8,
            pointer_size: 4,
            link_register_size: 4,
            word_align: 4,
            double_align: 8,
        }
    }
}

impl TargetLayout {
    /// Size of a built-in type, or `None` if `name` is not built in.
    pub fn primitive_size(&self, name: &str) -> Option<u32> {
        match name {
            primitives::INT => Some(self.int_size),
            primitives::FLOAT => Some(self.float_size),
            primitives::VOID => Some(0),
            _ => None,
        }
    }

    /// Alignment required by an entity of `size` bytes.
    pub fn alignment_for(&self, size: u32) -> u32 {
        if size >= self.double_align {
            self.double_align
        } else {
            self.word_align
        }
    }

    /// Place an entity of `size` bytes below `running` and return its offset.
    ///
    /// Offsets grow downwards from the frame base, so the result is
    /// `running - size` rounded towards negative infinity to the alignment.
    /// Returns `None` when the offset does not fit in an `i32`.
    pub fn place(&self, running: i32, size: u32) -> Option<i32> {
        let align = i64::from(self.alignment_for(size));
        let unaligned = i64::from(running).checked_sub(i64::from(size))?;
        i32::try_from(unaligned.div_euclid(align) * align).ok()
    }
}
