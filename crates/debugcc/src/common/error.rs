//! Error types for topology validation, start-up binding and measurement.
//!
//! This module defines the error handling for the debug clock subsystem. It provides:
//! 1. **Configuration Errors:** Invariant violations found while validating a topology.
//! 2. **Runtime Errors:** Start-up and lookup failures surfaced by the registry and facade.
//! 3. **Error Kinds:** A flat classification for callers that only need to branch on the cause.
//!
//! Measurement timeouts have no variant: a stuck clock domain reads as a zero rate.

use thiserror::Error;

/// Invariant violations detected while validating a topology description.
///
/// Every variant names the clock it was found on so that the registry can reject
/// exactly that node and keep going.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The parent-name table and the selector-code table differ in length.
    #[error("mux {mux}: {parents} parent names but {sels} selector codes")]
    TableLengthMismatch {
        /// Mux that carries the mismatched tables.
        mux: String,
        /// Number of parent names.
        parents: usize,
        /// Number of selector codes.
        sels: usize,
    },

    /// The pre-divider table is present but does not cover every parent.
    #[error("mux {mux}: {parents} parent names but {pre_divs} pre-dividers")]
    PreDivLengthMismatch {
        /// Mux that carries the mismatched tables.
        mux: String,
        /// Number of parent names.
        parents: usize,
        /// Number of pre-divider entries.
        pre_divs: usize,
    },

    /// A mux declares no parents at all.
    #[error("mux {0} has no parents")]
    NoParents(String),

    /// A mux without a selector field declares more than one parent.
    #[error("mux {mux} has no selector field but {parents} parents")]
    AmbiguousPassThrough {
        /// Offending mux.
        mux: String,
        /// Number of declared parents.
        parents: usize,
    },

    /// The same parent name appears twice in one parent table.
    #[error("mux {mux} lists parent {parent} more than once")]
    DuplicateParent {
        /// Offending mux.
        mux: String,
        /// Repeated parent name.
        parent: String,
    },

    /// Two clocks (muxes or placeholders) share a name.
    #[error("clock name {0} is registered twice")]
    DuplicateClock(String),

    /// A bitfield mask is not contiguous, or the shift does not match the mask.
    #[error("mux {mux}: invalid {field} field (mask {mask:#x}, shift {shift})")]
    InvalidField {
        /// Offending mux.
        mux: String,
        /// Which field (`src_sel` or `post_div`).
        field: &'static str,
        /// Configured in-register mask.
        mask: u32,
        /// Configured bit shift.
        shift: u32,
    },

    /// A selector code does not fit into the selector field.
    #[error("mux {mux}: selector {sel:#x} for {parent} does not fit mask {mask:#x}")]
    SelectorOverflow {
        /// Offending mux.
        mux: String,
        /// Parent whose code overflows.
        parent: String,
        /// Selector code.
        sel: u32,
        /// Selector field mask.
        mask: u32,
    },

    /// A divider value of zero.
    #[error("{clock}: divider for {what} must be non-zero")]
    ZeroDivider {
        /// Clock carrying the divider.
        clock: String,
        /// Which divider (`post_div` or a parent name).
        what: String,
    },

    /// A register offset is not aligned to the register width.
    #[error("{clock}: {what} {offset:#x} is not register aligned")]
    Misaligned {
        /// Clock carrying the offset.
        clock: String,
        /// Which offset.
        what: &'static str,
        /// Offending offset.
        offset: u64,
    },

    /// A mux is listed as a parent by more than one other mux.
    #[error("mux {mux} is fed into both {first} and {second}")]
    MultipleParents {
        /// Mux with ambiguous ancestry.
        mux: String,
        /// First claiming mux.
        first: String,
        /// Second claiming mux.
        second: String,
    },

    /// Mux ancestry loops back on itself.
    #[error("mux ancestry forms a cycle: {}", .chain.join(" -> "))]
    Cycle {
        /// Mux names along the loop, starting and ending at the same node.
        chain: Vec<String>,
    },

    /// A mux cannot reach the measurement root through its ancestors.
    #[error("mux {0} is not connected to the measurement root")]
    Detached(String),

    /// The measurement root names no valid mux.
    #[error("measurement root {0} is not a registered mux")]
    UnknownRoot(String),

    /// Measurement block constants are out of range.
    #[error("invalid measurement block: {0}")]
    InvalidMeasure(String),

    /// No built-in variant has this name.
    #[error("unknown target {name}; built-in: {known}")]
    UnknownTarget {
        /// Requested variant name.
        name: String,
        /// Comma-separated built-in variant names.
        known: String,
    },

    /// The topology JSON could not be parsed.
    #[error("failed to parse topology: {0}")]
    Json(String),

    /// The topology file could not be read.
    #[error("failed to read topology {path}: {message}")]
    Io {
        /// File that was being read.
        path: String,
        /// Underlying I/O error text.
        message: String,
    },
}

/// Failures reported by the registry and the debug clock facade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugCcError {
    /// No reference oscillator handle was supplied at start-up.
    #[error("reference clock is missing")]
    MissingReference,

    /// The reference oscillator reports no usable rate.
    #[error("reference clock {0} reports a zero rate")]
    ReferenceUnavailable(String),

    /// The requested name is not a registered or measurable clock.
    #[error("unknown clock {0}")]
    UnknownClock(String),

    /// A mux does not list the requested parent.
    #[error("mux {mux} has no parent named {parent}")]
    UnknownParent {
        /// Mux that was asked to select.
        mux: String,
        /// Requested parent name.
        parent: String,
    },

    /// A mux on the measurement route has no bound register window.
    #[error("mux {0} has no bound register window")]
    Unbound(String),

    /// The platform found the register window but could not map it.
    #[error("register window {window} failed to map: {message}")]
    WindowFailed {
        /// Window name.
        window: String,
        /// Platform error text.
        message: String,
    },

    /// A register offset falls outside the bound window or is misaligned.
    #[error("{clock}: offset {offset:#x} is outside window {window} ({size:#x} bytes)")]
    OffsetOutOfRange {
        /// Clock whose geometry is invalid for the window.
        clock: String,
        /// Window name.
        window: String,
        /// Offending offset.
        offset: u64,
        /// Window size in bytes.
        size: u64,
    },

    /// A write-side clock operation was attempted on a measurement-only clock.
    #[error("clock {0} is read-only")]
    ReadOnly(String),

    /// Topology validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Coarse classification of a [`DebugCcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Reference clock missing or unusable.
    Reference,
    /// Name lookup failed.
    UnknownClock,
    /// Parent lookup on a mux failed.
    UnknownParent,
    /// Register window not bound or unsuitable.
    Unbound,
    /// Write-side operation on a read-only clock.
    ReadOnly,
    /// Configuration invariant violated.
    Config,
}

impl DebugCcError {
    /// Returns the coarse classification of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingReference | Self::ReferenceUnavailable(_) => ErrorKind::Reference,
            Self::UnknownClock(_) => ErrorKind::UnknownClock,
            Self::UnknownParent { .. } => ErrorKind::UnknownParent,
            Self::Unbound(_) | Self::WindowFailed { .. } | Self::OffsetOutOfRange { .. } => {
                ErrorKind::Unbound
            }
            Self::ReadOnly(_) => ErrorKind::ReadOnly,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}
