//! Register field codec.
//!
//! A [`Field`] is an in-register mask plus the shift of its least significant bit.
//! [`read_field`] and [`write_field`] apply it to a 32-bit register through a
//! [`RegisterWindow`]; a write is a single read-modify-write that leaves every bit
//! outside the mask untouched.

use crate::soc::traits::RegisterWindow;

/// A masked, shifted bitfield inside a 32-bit register.
///
/// The mask is expressed in register position (e.g. `0x38` with shift `3` covers bits 5:3).
/// A mask of zero means the field does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Field {
    /// In-register mask.
    pub mask: u32,
    /// Bit position of the field's least significant bit.
    pub shift: u32,
}

impl Field {
    /// The absent field.
    pub const NONE: Self = Self { mask: 0, shift: 0 };

    /// Creates a field from an in-register mask and shift.
    pub const fn new(mask: u32, shift: u32) -> Self {
        Self { mask, shift }
    }

    /// Returns `true` unless the mask is zero.
    #[inline]
    pub const fn is_present(self) -> bool {
        self.mask != 0
    }

    /// Largest value that fits in the field.
    pub const fn max_value(self) -> u32 {
        if self.shift >= 32 {
            return 0;
        }
        self.mask >> self.shift
    }

    /// Checks the layout: the mask is one contiguous run starting exactly at `shift`.
    ///
    /// The absent field is well formed only with a zero shift.
    pub const fn is_well_formed(self) -> bool {
        if self.mask == 0 {
            return self.shift == 0;
        }
        if self.shift >= 32 || self.mask.trailing_zeros() != self.shift {
            return false;
        }
        let run = self.mask >> self.shift;
        run & run.wrapping_add(1) == 0
    }

    /// Extracts the field value from a raw register value.
    #[inline]
    pub fn extract(self, reg: u32) -> u32 {
        (reg & self.mask).checked_shr(self.shift).unwrap_or(0)
    }

    /// Returns `reg` with the field replaced by `value`, truncated to the mask.
    #[inline]
    pub fn insert(self, reg: u32, value: u32) -> u32 {
        let bits = value.checked_shl(self.shift).unwrap_or(0) & self.mask;
        (reg & !self.mask) | bits
    }
}

/// Reads a field from the register at `offset`.
///
/// Performs exactly one register read. The caller guarantees `offset` is valid for
/// `window`; bind-time checks in the registry establish that.
pub fn read_field(window: &mut dyn RegisterWindow, offset: u64, field: Field) -> u32 {
    field.extract(window.read_u32(offset))
}

/// Writes `value` into a field of the register at `offset`.
///
/// One read and one write; bits outside `field.mask` keep their previous value and
/// `value` is truncated to the field width.
pub fn write_field(window: &mut dyn RegisterWindow, offset: u64, field: Field, value: u32) {
    let reg = window.read_u32(offset);
    window.write_u32(offset, field.insert(reg, value));
}
