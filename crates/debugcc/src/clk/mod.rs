//! Debug clocks.
//!
//! This module implements routing and measurement. It includes:
//! 1. **Mux Nodes:** Validated multiplexers and their parent tables.
//! 2. **Placeholders:** Measure-only clocks with a nominal rate.
//! 3. **Measurement:** The counter handshake and rate arithmetic.
//! 4. **Registry:** Start-up binding of muxes to register windows.
//! 5. **Facade:** Read-only clock objects served to callers.

/// Read-only clock facade.
pub mod facade;

/// Counter handshake and rate computation.
pub mod measure;

/// Debug multiplexer nodes.
pub mod mux;

/// Measure-only placeholder clocks.
pub mod placeholder;

/// Topology registry and window binding.
pub mod registry;

pub use facade::{ClockKind, DebugCc, DebugClock};
pub use measure::{MeasureBlock, MeasureOutcome, compute_rate};
pub use mux::{MuxNode, ParentEntry};
pub use placeholder::PlaceholderClock;
pub use registry::{BindReport, Registry, WindowSet};
