//! Traits for the platform collaborators of the debug clock subsystem.
//!
//! This module defines the seams between the measurement core and the platform. It provides:
//! 1. **Register Windows:** 32-bit read/write access to one named register region.
//! 2. **Window Resolution:** Mapping a symbolic window name to a live window, with a
//!    distinguishable "not present" outcome.
//! 3. **Reference Clock:** The oscillator handle whose rate paces the debug counter.
//!
//! All window implementors must be `Send` so the facade can move them behind its lock.

use std::fmt;

/// A contiguous register region, addressed by byte offset.
///
/// Offsets are relative to the start of the window and 4-byte aligned. The registry
/// checks every offset a mux uses against [`size`](Self::size) once, at bind time.
pub trait RegisterWindow: Send {
    /// Symbolic name the window was resolved from (e.g. `"qcom,gcc"`).
    fn name(&self) -> &str;
    /// Size of the region in bytes.
    fn size(&self) -> u64;
    /// Reads the 32-bit register at `offset`.
    fn read_u32(&mut self, offset: u64) -> u32;
    /// Writes the 32-bit register at `offset`.
    fn write_u32(&mut self, offset: u64, val: u32);
}

/// Outcome of resolving a window name.
pub enum Binding {
    /// The window exists and is mapped.
    Bound(Box<dyn RegisterWindow>),
    /// The window does not exist on this hardware variant.
    NotPresent,
    /// The window exists but could not be mapped.
    Error(String),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bound(window) => f.debug_tuple("Bound").field(&window.name()).finish(),
            Self::NotPresent => f.write_str("NotPresent"),
            Self::Error(msg) => f.debug_tuple("Error").field(msg).finish(),
        }
    }
}

/// Maps symbolic window names to live register windows.
///
/// Called once per distinct name during start-up; the registry never retries.
pub trait WindowResolver {
    /// Resolves `name` to a window.
    fn resolve(&mut self, name: &str) -> Binding;
}

/// The crystal oscillator that paces the debug counter.
pub trait ReferenceClock: Send + Sync {
    /// Name of the oscillator (e.g. `"xo_clk_src"`).
    fn name(&self) -> &str;
    /// Current rate in Hz; zero means the oscillator is unusable.
    fn rate(&self) -> u64;
}

/// A reference clock with a constant rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedReference {
    name: String,
    rate: u64,
}

impl FixedReference {
    /// Creates a fixed-rate reference clock.
    pub fn new(name: impl Into<String>, rate: u64) -> Self {
        Self {
            name: name.into(),
            rate,
        }
    }
}

impl ReferenceClock for FixedReference {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self) -> u64 {
        self.rate
    }
}
