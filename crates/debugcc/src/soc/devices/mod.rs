//! Register window implementations.
//!
//! This module contains the concrete windows a [`WindowResolver`](crate::soc::traits::WindowResolver)
//! can hand out: plain register files, a simulated debug clock controller, and mapped
//! hardware registers.

/// Memory-mapped hardware registers.
pub mod mmio;

/// Sparse in-memory register block.
pub mod register_file;

/// Simulated SoC emulating the debug counter.
pub mod sim;

pub use mmio::{MmioResolver, MmioWindow};
pub use register_file::RegisterFile;
pub use sim::SimulatedSoc;
