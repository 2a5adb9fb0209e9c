//! Simulated debug clock hardware.
//!
//! [`SimulatedSoc`] resolves every window of a topology to a [`RegisterFile`] and
//! emulates the shared counter block behind them:
//! 1. **Routing:** When the counter is enabled, the simulator walks the programmed
//!    selectors from the root down to a leaf source, honoring branch enables.
//! 2. **Counting:** The source rate, divided by the pre- and post-dividers on the way,
//!    is counted against the divided reference for `window_cycles` ticks.
//! 3. **Faults:** Windows can be absent or fail to map, and sources can be stuck so the
//!    done bit never rises.
//!
//! Handles are cheap clones over shared state, so a test can keep one while the
//! registry owns the windows.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use crate::common::constants::{CBCR_ENA, CNT_DONE, CNT_EN, MEASURE_CNT, REG_WIDTH, TICK_FIELD_MASK};
use crate::common::field::Field;
use crate::config::{MuxConfig, TopologyConfig};
use crate::soc::devices::register_file::RegisterFile;
use crate::soc::traits::{Binding, RegisterWindow, WindowResolver};

/// Window sizes are rounded up to this granule.
const PAGE: u64 = 0x1000;

/// Shared state behind every handle and window of one simulated SoC.
#[derive(Debug)]
struct SimState {
    topology: TopologyConfig,
    files: HashMap<String, RegisterFile>,
    absent: HashSet<String>,
    failing: HashMap<String, String>,
    rates: HashMap<String, u64>,
    stuck: HashSet<String>,
    xo_rate: u64,
    resolved: Vec<String>,
}

impl SimState {
    fn mux(&self, name: &str) -> Option<&MuxConfig> {
        self.topology.muxes.iter().find(|m| m.name == name)
    }

    fn reg(&self, window: &str, offset: u64) -> Option<u32> {
        self.files.get(window).map(|f| f.peek(offset))
    }

    fn root_window(&self) -> Option<&str> {
        self.mux(&self.topology.measure.root).map(|m| m.window.as_str())
    }

    fn on_write(&mut self, window: &str, offset: u64, val: u32) {
        let measure = &self.topology.measure;
        if self.root_window() != Some(window) || offset != measure.ctl_reg {
            return;
        }
        let status_reg = measure.status_reg;
        let status = if val & CNT_EN == 0 { 0 } else { self.count() };
        trace!(window, status, "simulated counter");
        if let Some(file) = self.files.get_mut(window) {
            file.poke(status_reg, status);
        }
    }

    /// Status word latched when the counter is enabled.
    fn count(&self) -> u32 {
        let measure = &self.topology.measure;
        let Some(root_window) = self.root_window() else {
            return 0;
        };
        if self.reg(root_window, measure.xo_div4_cbcr).unwrap_or(0) & CBCR_ENA == 0 {
            return 0;
        }
        let Some((source, pre, post)) = self.trace_route() else {
            return 0;
        };
        if self.stuck.contains(source) {
            return 0;
        }

        let rate = u128::from(self.rates.get(source).copied().unwrap_or(0));
        let tick = u128::from(self.xo_rate / measure.xo_divider.max(1));
        let window = u128::from(measure.window_cycles & TICK_FIELD_MASK);
        let divisor = tick * u128::from(pre) * u128::from(post);
        if divisor == 0 {
            return 0;
        }
        let count = (rate * window / divisor).min(u128::from(MEASURE_CNT));
        CNT_DONE | u32::try_from(count).unwrap_or(MEASURE_CNT)
    }

    /// Follows the programmed selectors from the root to a leaf.
    ///
    /// Returns the leaf source with the pre- and post-divider products, or `None` when
    /// a branch is gated, a window is missing, or a selector matches no parent.
    fn trace_route(&self) -> Option<(&str, u64, u64)> {
        let mut mux = self.mux(&self.topology.measure.root)?;
        let (mut pre, mut post) = (1_u64, 1_u64);
        for _ in 0..=self.topology.muxes.len() {
            if let Some(cbcr) = mux.cbcr_offset {
                if self.reg(&mux.window, cbcr)? & CBCR_ENA == 0 {
                    return None;
                }
            }

            let src_sel = Field::new(mux.src_sel_mask, mux.src_sel_shift);
            let index = if src_sel.is_present() {
                let sel = src_sel.extract(self.reg(&mux.window, mux.debug_offset)?);
                mux.sels.iter().position(|&s| s == sel)?
            } else {
                0
            };

            let post_div = Field::new(mux.post_div_mask, mux.post_div_shift);
            let hw_post = if post_div.is_present() {
                post_div.extract(self.reg(&mux.window, mux.post_div_offset)?)
            } else {
                mux.post_div_val
            };
            let pre_div = mux.pre_divs.as_ref().and_then(|p| p.get(index)).copied().unwrap_or(1);
            pre = pre.saturating_mul(u64::from(pre_div.max(1)));
            post = post.saturating_mul(u64::from(hw_post.max(1)));

            let parent = mux.parents.get(index)?;
            match self.mux(parent) {
                Some(next) => mux = next,
                None => return Some((parent.as_str(), pre, post)),
            }
        }
        None
    }
}

/// A window handed to the registry; every access goes to the shared state.
#[derive(Debug)]
struct SimWindow {
    name: String,
    size: u64,
    shared: Arc<Mutex<SimState>>,
}

impl SimWindow {
    fn state(&self) -> MutexGuard<'_, SimState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RegisterWindow for SimWindow {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_u32(&mut self, offset: u64) -> u32 {
        let mut state = self.state();
        state
            .files
            .get_mut(&self.name)
            .map_or(0, |file| file.read_u32(offset))
    }

    fn write_u32(&mut self, offset: u64, val: u32) {
        let mut state = self.state();
        if let Some(file) = state.files.get_mut(&self.name) {
            file.write_u32(offset, val);
        }
        state.on_write(&self.name, offset, val);
    }
}

/// A simulated SoC implementing [`WindowResolver`] for one topology.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use debugcc_core::clk::DebugCc;
/// use debugcc_core::soc::devices::SimulatedSoc;
/// use debugcc_core::soc::traits::{FixedReference, ReferenceClock};
/// use debugcc_core::targets::sdx55;
///
/// let mut topology = sdx55::topology();
/// topology.measure.window_cycles = 4800;
/// let mut soc = SimulatedSoc::new(&topology, sdx55::XO_RATE);
/// soc.set_rate("gcc_gp1_clk", 100_000_000);
///
/// let reference: Arc<dyn ReferenceClock> =
///     Arc::new(FixedReference::new(sdx55::REFERENCE, sdx55::XO_RATE));
/// let cc = DebugCc::start(&topology, &mut soc, Some(reference)).unwrap();
/// assert_eq!(cc.measure("gcc_gp1_clk").unwrap(), 100_000_000);
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedSoc {
    shared: Arc<Mutex<SimState>>,
}

impl SimulatedSoc {
    /// Creates zeroed windows for every window `topology` names.
    ///
    /// Each window is just large enough for the registers the topology uses, rounded
    /// up to 4 KiB. Placeholders run at their nominal rate; every other source is
    /// stopped until [`set_rate`](Self::set_rate) is called.
    pub fn new(topology: &TopologyConfig, xo_rate: u64) -> Self {
        let mut sizes: HashMap<&str, u64> = HashMap::new();
        for mux in &topology.muxes {
            let mut top = mux.debug_offset.max(mux.post_div_offset);
            top = top.max(mux.cbcr_offset.unwrap_or(0));
            if mux.name == topology.measure.root {
                let m = &topology.measure;
                top = top.max(m.ctl_reg).max(m.status_reg).max(m.xo_div4_cbcr);
            }
            let size = (top + REG_WIDTH).div_ceil(PAGE) * PAGE;
            let entry = sizes.entry(mux.window.as_str()).or_insert(0);
            *entry = (*entry).max(size);
        }

        let files = sizes
            .into_iter()
            .map(|(name, size)| (name.to_string(), RegisterFile::new(name, size)))
            .collect();
        let rates = topology
            .placeholders
            .iter()
            .map(|p| (p.name.clone(), p.rate))
            .collect();

        Self {
            shared: Arc::new(Mutex::new(SimState {
                topology: topology.clone(),
                files,
                absent: HashSet::new(),
                failing: HashMap::new(),
                rates,
                stuck: HashSet::new(),
                xo_rate,
                resolved: Vec::new(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the rate of a source signal in Hz.
    pub fn set_rate(&self, source: &str, rate: u64) {
        let _ = self.state().rates.insert(source.to_string(), rate);
    }

    /// Marks a source as stuck: enabling the counter on it never raises done.
    pub fn set_stuck(&self, source: &str, stuck: bool) {
        let mut state = self.state();
        if stuck {
            let _ = state.stuck.insert(source.to_string());
        } else {
            let _ = state.stuck.remove(source);
        }
    }

    /// Makes `window` resolve as not present.
    pub fn set_absent(&self, window: &str) {
        let _ = self.state().absent.insert(window.to_string());
    }

    /// Makes `window` fail to map with `message`.
    pub fn set_failing(&self, window: &str, message: &str) {
        let _ = self
            .state()
            .failing
            .insert(window.to_string(), message.to_string());
    }

    /// Replaces `window` with a zeroed register file of `size` bytes.
    pub fn set_window_size(&self, window: &str, size: u64) {
        let _ = self
            .state()
            .files
            .insert(window.to_string(), RegisterFile::new(window, size));
    }

    /// Reads a register without side effects; unknown windows read as 0.
    pub fn peek(&self, window: &str, offset: u64) -> u32 {
        self.state().reg(window, offset).unwrap_or(0)
    }

    /// Writes a register without side effects.
    pub fn poke(&self, window: &str, offset: u64, val: u32) {
        if let Some(file) = self.state().files.get_mut(window) {
            file.poke(offset, val);
        }
    }

    /// Register reads and writes made through resolved windows, summed over all windows.
    pub fn accesses(&self) -> u64 {
        self.state().files.values().map(RegisterFile::accesses).sum()
    }

    /// Window names resolved so far, in request order.
    pub fn resolved(&self) -> Vec<String> {
        self.state().resolved.clone()
    }
}

impl WindowResolver for SimulatedSoc {
    fn resolve(&mut self, name: &str) -> Binding {
        let mut state = self.state();
        state.resolved.push(name.to_string());
        if state.absent.contains(name) {
            return Binding::NotPresent;
        }
        if let Some(message) = state.failing.get(name) {
            return Binding::Error(message.clone());
        }
        match state.files.get(name) {
            Some(file) => Binding::Bound(Box::new(SimWindow {
                name: name.to_string(),
                size: file.size(),
                shared: Arc::clone(&self.shared),
            })),
            None => Binding::NotPresent,
        }
    }
}
