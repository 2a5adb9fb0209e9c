//! Clock-debug multiplexer measurement library.
//!
//! This crate routes internal SoC clock signals through a tree of debug multiplexers
//! into a shared hardware counter and reports their frequency. It provides:
//! 1. **Common:** Register field codec, counter bit layout, and error types.
//! 2. **Config:** Declarative topology description, JSON loading, and validation.
//! 3. **Clk:** Mux nodes, the measurement engine, the registry, and the clock facade.
//! 4. **SoC:** Register window and reference clock traits plus their implementations.
//! 5. **Targets:** Built-in hardware variants.

/// Common types (field codec, counter constants, errors).
pub mod common;
/// Topology configuration (defaults, mux and measurement descriptions, validation).
pub mod config;
/// Debug clocks (mux nodes, measurement, registry, facade).
pub mod clk;
/// Platform collaborators (register windows, resolvers, reference clock).
pub mod soc;
/// Built-in hardware variants.
pub mod targets;

/// Clock controller facade; construct with `DebugCc::start`.
pub use crate::clk::DebugCc;
/// Root topology type; build in code, take from [`targets`], or load from JSON.
pub use crate::config::TopologyConfig;
/// Error types returned by configuration and measurement.
pub use crate::common::{ConfigError, DebugCcError};
