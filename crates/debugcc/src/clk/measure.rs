//! Measurement engine.
//!
//! This module drives the shared debug counter. It provides:
//! 1. **Counter Handshake:** Load the window, enable, poll for done, read, disable.
//! 2. **Route Programming:** Select every mux from the root down to the target, enabling
//!    branch clocks on the way and collecting the pre/post dividers.
//! 3. **Rate Arithmetic:** Integer conversion of a raw count into Hz.
//!
//! # Handshake
//!
//! ```text
//! Idle -> Setup -> Armed -> Polling -+-> Read ---+-> Teardown -> Idle
//!                                    +-> Failed -+
//! ```
//!
//! Teardown runs on every exit path. A poll that exceeds its bound is a failed
//! measurement and reads as 0 Hz; it never surfaces as an error.

use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::clk::mux::MuxNode;
use crate::clk::registry::{WindowId, WindowSet};
use crate::common::constants::{CBCR_ENA, CNT_DONE, CNT_EN, MEASURE_CNT, TICK_FIELD_MASK};
use crate::common::error::DebugCcError;
use crate::common::field::{Field, write_field};
use crate::config::MeasureConfig;
use crate::soc::traits::RegisterWindow;

/// Result of one counter handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureOutcome {
    /// The counter finished; holds the raw cycle count.
    Counted(u32),
    /// The done bit never rose within the poll bound.
    TimedOut {
        /// Number of status reads performed.
        polls: u32,
    },
}

impl MeasureOutcome {
    /// Raw count of a finished measurement.
    pub const fn raw_count(self) -> Option<u32> {
        match self {
            Self::Counted(raw) => Some(raw),
            Self::TimedOut { .. } => None,
        }
    }
}

/// Dividers accumulated along a measurement route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dividers {
    /// Product of the selected parents' pre-dividers.
    pub pre: u64,
    /// Product of the traversed muxes' post-dividers.
    pub post: u64,
}

impl Default for Dividers {
    fn default() -> Self {
        Self { pre: 1, post: 1 }
    }
}

/// What a route hop selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    /// Route the named parent to the mux output.
    Parent(&'a str),
    /// Keep whatever the selector currently routes.
    Current,
}

/// One mux on a measurement route, with the window it is bound to.
#[derive(Debug, Clone, Copy)]
pub struct Hop<'a> {
    /// Mux to program.
    pub mux: &'a MuxNode,
    /// Window the mux is bound to.
    pub window: WindowId,
    /// Parent to select.
    pub select: Selection<'a>,
}

/// The shared counter block, resolved from [`MeasureConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureBlock {
    ctl_reg: u64,
    status_reg: u64,
    xo_div4_cbcr: u64,
    xo_divider: u64,
    window_cycles: u32,
    poll_limit: u32,
    poll_delay: Duration,
}

impl From<&MeasureConfig> for MeasureBlock {
    fn from(cfg: &MeasureConfig) -> Self {
        Self {
            ctl_reg: cfg.ctl_reg,
            status_reg: cfg.status_reg,
            xo_div4_cbcr: cfg.xo_div4_cbcr,
            xo_divider: cfg.xo_divider.max(1),
            window_cycles: cfg.window_cycles,
            poll_limit: cfg.poll_limit,
            poll_delay: Duration::from_micros(cfg.poll_delay_us),
        }
    }
}

impl MeasureBlock {
    /// Offsets of the counter registers, for bind-time range checks.
    pub const fn register_offsets(&self) -> [u64; 3] {
        [self.ctl_reg, self.status_reg, self.xo_div4_cbcr]
    }

    /// Reference ticks per measurement window.
    pub const fn window_cycles(&self) -> u32 {
        self.window_cycles
    }

    /// Counter tick rate derived from the reference oscillator rate.
    pub const fn tick_rate(&self, xo_rate: u64) -> u64 {
        xo_rate / self.xo_divider
    }

    /// Control register value: the window in the tick field, optionally with the enable bit.
    pub const fn control_word(&self, enable: bool) -> u32 {
        let ticks = self.window_cycles & TICK_FIELD_MASK;
        if enable { ticks | CNT_EN } else { ticks }
    }

    /// Gates the divided reference tick into the counter.
    pub fn set_reference_gate(&self, window: &mut dyn RegisterWindow, enable: bool) {
        write_field(
            window,
            self.xo_div4_cbcr,
            Field::new(CBCR_ENA, 0),
            u32::from(enable),
        );
    }

    /// Runs one counter handshake on the root window.
    ///
    /// The selector chain must already route the target signal to the counter.
    pub fn handshake(&self, window: &mut dyn RegisterWindow) -> MeasureOutcome {
        // Idle: counter stopped with the window loaded.
        window.write_u32(self.ctl_reg, self.control_word(false));
        // Armed.
        window.write_u32(self.ctl_reg, self.control_word(true));

        let mut outcome = MeasureOutcome::TimedOut {
            polls: self.poll_limit,
        };
        for poll in 1..=self.poll_limit {
            if window.read_u32(self.status_reg) & CNT_DONE != 0 {
                let raw = window.read_u32(self.status_reg) & MEASURE_CNT;
                trace!(poll, raw, "debug counter done");
                outcome = MeasureOutcome::Counted(raw);
                break;
            }
            if !self.poll_delay.is_zero() {
                thread::sleep(self.poll_delay);
            }
        }

        // Teardown.
        window.write_u32(self.ctl_reg, self.control_word(false));
        outcome
    }

    /// Programs `route` (root first), runs the handshake and converts the count to Hz.
    ///
    /// Branch enables and the reference gate are cleared again before returning, on the
    /// error path too. A [`Selection::Current`] hop whose selector decodes to no parent
    /// skips the handshake and reads as 0 Hz.
    ///
    /// # Errors
    ///
    /// [`DebugCcError::UnknownParent`] if a hop names a parent its mux does not list.
    pub(crate) fn measure_route(
        &self,
        windows: &mut WindowSet,
        root: WindowId,
        route: &[Hop<'_>],
        xo_rate: u64,
    ) -> Result<u64, DebugCcError> {
        self.set_reference_gate(windows.get_mut(root), true);

        let mut divs = Dividers::default();
        let mut enabled = 0;
        let mut setup = Ok(());
        let mut routed = true;
        for hop in route {
            let window = windows.get_mut(hop.window);
            hop.mux.set_branch(window, true);
            enabled += 1;
            let pre_div = match hop.select {
                Selection::Parent(parent) => match hop.mux.select_parent(window, parent) {
                    Ok(pre_div) => pre_div,
                    Err(err) => {
                        setup = Err(err);
                        break;
                    }
                },
                Selection::Current => match hop.mux.current_parent(window) {
                    Some(entry) => {
                        let pre_div = entry.pre_div;
                        hop.mux.program_post_div(window);
                        pre_div
                    }
                    None => {
                        warn!(
                            mux = hop.mux.name(),
                            "selector matches no parent; reporting 0 Hz"
                        );
                        routed = false;
                        break;
                    }
                },
            };
            divs.pre = divs.pre.saturating_mul(u64::from(pre_div));
            divs.post = divs.post.saturating_mul(u64::from(hop.mux.post_div_val()));
        }

        let outcome = (setup.is_ok() && routed).then(|| self.handshake(windows.get_mut(root)));

        for hop in route[..enabled].iter().rev() {
            hop.mux.set_branch(windows.get_mut(hop.window), false);
        }
        self.set_reference_gate(windows.get_mut(root), false);
        setup?;

        match outcome {
            Some(MeasureOutcome::Counted(raw)) => {
                let rate = compute_rate(
                    raw,
                    self.tick_rate(xo_rate),
                    divs.post,
                    self.window_cycles,
                    divs.pre,
                );
                debug!(raw, pre_div = divs.pre, post_div = divs.post, rate, "measured");
                Ok(rate)
            }
            Some(MeasureOutcome::TimedOut { polls }) => {
                let target = route.last().map_or("?", |hop| hop.mux.name());
                warn!(polls, mux = target, "debug counter never finished; reporting 0 Hz");
                Ok(0)
            }
            None => Ok(0),
        }
    }
}

/// Converts a raw counter value into Hz.
///
/// `raw_count * tick_rate * post_div / window_cycles`, then scaled by `pre_div`. The
/// arithmetic is exact integer math and saturates at `u64::MAX`; a zero window reads as 0.
///
/// # Examples
///
/// ```
/// use debugcc_core::clk::measure::compute_rate;
///
/// assert_eq!(compute_rate(1000, 9600, 4, 1_024_000, 1), 37);
/// assert_eq!(compute_rate(0, 4_800_000, 4, 0x8000, 2), 0);
/// ```
pub fn compute_rate(
    raw_count: u32,
    tick_rate: u64,
    post_div: u64,
    window_cycles: u32,
    pre_div: u64,
) -> u64 {
    if window_cycles == 0 {
        return 0;
    }
    let counted = (u128::from(raw_count) * u128::from(tick_rate))
        .saturating_mul(u128::from(post_div))
        / u128::from(window_cycles);
    let rate = counted.saturating_mul(u128::from(pre_div));
    u64::try_from(rate).unwrap_or(u64::MAX)
}
