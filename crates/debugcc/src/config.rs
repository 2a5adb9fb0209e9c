//! Topology configuration for the debug clock subsystem.
//!
//! This module defines the declarative description of one hardware variant. It provides:
//! 1. **Defaults:** Baseline constants of the measurement block (window, poll bound, XO divider).
//! 2. **Structures:** The measurement block, every debug mux, and the placeholder clocks.
//! 3. **Validation:** Whole-topology invariant checks used before anything is bound.
//!
//! Configuration is built in code (see [`crate::targets`]) or deserialized from JSON.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clk::mux::MuxNode;
use crate::clk::registry::link_ancestry;
use crate::common::constants::{REG_WIDTH, TICK_FIELD_MASK, XO_DIVIDER};
use crate::common::error::ConfigError;

/// Default constants of the measurement block.
mod defaults {
    /// Reference ticks per measurement window.
    ///
    /// At a 4.8 MHz reference tick this is a ~6.8 ms gate.
    pub const WINDOW_CYCLES: u32 = 0x8000;

    /// Status polls before a measurement is declared stuck.
    pub const POLL_LIMIT: u32 = 10_000;

    /// Delay between status polls in microseconds (busy polling when zero).
    pub const POLL_DELAY_US: u64 = 0;

    /// Fixed post-divider of a mux that does not declare one.
    pub const POST_DIV: u32 = 1;
}

/// Shared counter block that performs every measurement.
///
/// The registers live in the register window of the root mux.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureConfig {
    /// Name of the mux that feeds the counter.
    pub root: String,
    /// Counter control register (window ticks and enable bit).
    pub ctl_reg: u64,
    /// Counter status register (done bit and count).
    pub status_reg: u64,
    /// Branch control register gating the divided reference tick.
    pub xo_div4_cbcr: u64,
    /// Divider between the reference oscillator and the counter tick.
    #[serde(default = "MeasureConfig::default_xo_divider")]
    pub xo_divider: u64,
    /// Reference ticks per measurement window.
    #[serde(default = "MeasureConfig::default_window_cycles")]
    pub window_cycles: u32,
    /// Status polls before the measurement is abandoned.
    #[serde(default = "MeasureConfig::default_poll_limit")]
    pub poll_limit: u32,
    /// Sleep between polls in microseconds.
    #[serde(default = "MeasureConfig::default_poll_delay_us")]
    pub poll_delay_us: u64,
}

impl MeasureConfig {
    fn default_xo_divider() -> u64 {
        XO_DIVIDER
    }

    fn default_window_cycles() -> u32 {
        defaults::WINDOW_CYCLES
    }

    fn default_poll_limit() -> u32 {
        defaults::POLL_LIMIT
    }

    fn default_poll_delay_us() -> u64 {
        defaults::POLL_DELAY_US
    }

    /// Creates a measurement block with default timing constants.
    pub fn new(root: impl Into<String>, ctl_reg: u64, status_reg: u64, xo_div4_cbcr: u64) -> Self {
        Self {
            root: root.into(),
            ctl_reg,
            status_reg,
            xo_div4_cbcr,
            xo_divider: XO_DIVIDER,
            window_cycles: defaults::WINDOW_CYCLES,
            poll_limit: defaults::POLL_LIMIT,
            poll_delay_us: defaults::POLL_DELAY_US,
        }
    }

    /// Checks the timing constants and register alignment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidMeasure`] naming the first constant out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_cycles == 0 || self.window_cycles & !TICK_FIELD_MASK != 0 {
            return Err(ConfigError::InvalidMeasure(format!(
                "window_cycles {:#x} must be non-zero and fit {TICK_FIELD_MASK:#x}",
                self.window_cycles
            )));
        }
        if self.xo_divider == 0 {
            return Err(ConfigError::InvalidMeasure("xo_divider must be non-zero".into()));
        }
        if self.poll_limit == 0 {
            return Err(ConfigError::InvalidMeasure("poll_limit must be non-zero".into()));
        }
        for (what, reg) in [
            ("ctl_reg", self.ctl_reg),
            ("status_reg", self.status_reg),
            ("xo_div4_cbcr", self.xo_div4_cbcr),
        ] {
            if reg % REG_WIDTH != 0 {
                return Err(ConfigError::InvalidMeasure(format!(
                    "{what} {reg:#x} is not register aligned"
                )));
            }
        }
        Ok(())
    }
}

/// One debug multiplexer.
///
/// Mirrors the hardware description: register geometry relative to the named window,
/// the selector and post-divider field layout, and the parent table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuxConfig {
    /// Unique clock name of the mux.
    pub name: String,
    /// Symbolic name of the register window the mux lives in.
    pub window: String,
    /// Offset of the register holding the selector field.
    #[serde(default)]
    pub debug_offset: u64,
    /// Offset of the register holding the post-divider field.
    #[serde(default)]
    pub post_div_offset: u64,
    /// Offset of the mux's branch control register, if it has one.
    #[serde(default)]
    pub cbcr_offset: Option<u64>,
    /// Selector field mask (in register position); zero for a pass-through counter.
    #[serde(default)]
    pub src_sel_mask: u32,
    /// Selector field shift.
    #[serde(default)]
    pub src_sel_shift: u32,
    /// Post-divider field mask; zero when the mux has no programmable post-divider.
    #[serde(default)]
    pub post_div_mask: u32,
    /// Post-divider field shift.
    #[serde(default)]
    pub post_div_shift: u32,
    /// Fixed post-divider applied to every measurement through this mux.
    #[serde(default = "MuxConfig::default_post_div_val")]
    pub post_div_val: u32,
    /// Parent clock names, in table order.
    pub parents: Vec<String>,
    /// Selector code per parent.
    #[serde(default)]
    pub sels: Vec<u32>,
    /// Pre-divider per parent; every parent defaults to 1 when absent.
    #[serde(default)]
    pub pre_divs: Option<Vec<u32>>,
}

impl MuxConfig {
    fn default_post_div_val() -> u32 {
        defaults::POST_DIV
    }

    /// Creates a pass-through mux with no selector and a single parent.
    pub fn pass_through(
        name: impl Into<String>,
        window: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            window: window.into(),
            debug_offset: 0,
            post_div_offset: 0,
            cbcr_offset: None,
            src_sel_mask: 0,
            src_sel_shift: 0,
            post_div_mask: 0,
            post_div_shift: 0,
            post_div_val: defaults::POST_DIV,
            parents: vec![parent.into()],
            sels: vec![0],
            pre_divs: None,
        }
    }
}

/// A measure-only clock with a fixed nominal rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderConfig {
    /// Unique clock name.
    pub name: String,
    /// Nominal rate in Hz.
    pub rate: u64,
}

impl PlaceholderConfig {
    /// Creates a placeholder description.
    pub fn new(name: impl Into<String>, rate: u64) -> Self {
        Self {
            name: name.into(),
            rate,
        }
    }
}

/// Complete description of one hardware variant.
///
/// # Examples
///
/// ```
/// use debugcc_core::config::TopologyConfig;
///
/// let json = r#"{
///     "name": "tiny",
///     "measure": { "root": "top", "ctl_reg": 4, "status_reg": 8, "xo_div4_cbcr": 16 },
///     "muxes": [
///         { "name": "top", "window": "cc", "src_sel_mask": 56, "src_sel_shift": 3,
///           "parents": ["pll0", "pll1"], "sels": [1, 2] }
///     ],
///     "placeholders": [ { "name": "pll1", "rate": 1000 } ]
/// }"#;
///
/// let config = TopologyConfig::from_json_str(json).unwrap();
/// assert_eq!(config.measure.window_cycles, 0x8000);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Variant name (e.g. `"sdx55"`).
    pub name: String,
    /// Shared counter block.
    pub measure: MeasureConfig,
    /// Debug muxes.
    pub muxes: Vec<MuxConfig>,
    /// Measure-only placeholder clocks.
    #[serde(default)]
    pub placeholders: Vec<PlaceholderConfig>,
}

impl TopologyConfig {
    /// Parses a topology from JSON text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Json`] when the text is not a valid topology document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Reads and parses a topology JSON file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Json`] if it does not parse.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    /// Serializes the topology as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Checks every invariant of the topology and reports the first violation.
    ///
    /// The registry applies the same checks per node and skips offenders; this strict
    /// form is for tooling and for tests of static tables.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.measure.validate()?;

        let mut names = HashSet::new();
        let mut nodes = Vec::with_capacity(self.muxes.len());
        for mux in &self.muxes {
            if !names.insert(mux.name.as_str()) {
                return Err(ConfigError::DuplicateClock(mux.name.clone()));
            }
            nodes.push(MuxNode::from_config(mux)?);
        }
        for placeholder in &self.placeholders {
            if !names.insert(placeholder.name.as_str()) {
                return Err(ConfigError::DuplicateClock(placeholder.name.clone()));
            }
        }

        let root = nodes
            .iter()
            .position(|n| n.name() == self.measure.root)
            .ok_or_else(|| ConfigError::UnknownRoot(self.measure.root.clone()))?;

        let ancestry = link_ancestry(&nodes, root);
        match ancestry.rejected.into_iter().next() {
            Some((_, err)) => Err(err),
            None => Ok(()),
        }
    }

    /// Names of every distinct register window, in first-use order.
    pub fn windows(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.muxes
            .iter()
            .map(|m| m.window.as_str())
            .filter(|w| seen.insert(*w))
            .collect()
    }
}
