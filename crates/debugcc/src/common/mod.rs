//! Common building blocks shared by the clock and SoC layers.
//!
//! This module provides:
//! 1. **Constants:** Bit layout of the shared debug counter block.
//! 2. **Error Handling:** Configuration and runtime error types.
//! 3. **Field Codec:** Masked read-modify-write helpers for 32-bit registers.

/// Debug counter register bits.
pub mod constants;

/// Error types and error kinds.
pub mod error;

/// Register field codec.
pub mod field;

pub use error::{ConfigError, DebugCcError, ErrorKind};
pub use field::{Field, read_field, write_field};
