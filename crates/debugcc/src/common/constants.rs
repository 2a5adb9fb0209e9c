//! Register bit definitions for the debug counter block.
//!
//! The counter block is shared by every debug mux on a SoC. It includes:
//! 1. **Branch Control:** The enable bit of a counter control block (cbcr) register.
//! 2. **Control Register:** Measurement window ticks and the counter enable bit.
//! 3. **Status Register:** The done flag and the raw cycle count.

/// Enable bit of a branch control (cbcr) register.
pub const CBCR_ENA: u32 = 1 << 0;

/// Mask of the reference tick count loaded into the control register.
pub const TICK_FIELD_MASK: u32 = 0x000F_FFFF;

/// Counter enable bit of the control register.
pub const CNT_EN: u32 = 1 << 20;

/// Set in the status register once the reference window has elapsed.
pub const CNT_DONE: u32 = 1 << 25;

/// Mask of the measured cycle count in the status register.
pub const MEASURE_CNT: u32 = 0x01FF_FFFF;

/// Ratio between the reference oscillator and the counter's reference tick.
pub const XO_DIVIDER: u64 = 4;

/// Register stride; every offset must be aligned to it.
pub const REG_WIDTH: u64 = 4;
