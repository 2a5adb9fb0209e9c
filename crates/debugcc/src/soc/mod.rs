//! Platform side of the debug clock subsystem.
//!
//! This module holds the collaborator traits the core is written against and the
//! register windows that implement them.

/// Register window implementations (register file, simulator, MMIO).
pub mod devices;

/// Register window, resolver and reference clock traits.
pub mod traits;

pub use traits::{Binding, FixedReference, ReferenceClock, RegisterWindow, WindowResolver};
