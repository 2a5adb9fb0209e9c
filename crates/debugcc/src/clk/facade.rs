//! Debug clock facade.
//!
//! [`DebugCc`] is what clock-consumer tooling talks to. Every registered clock, mux or
//! placeholder, is exposed as a read-only [`DebugClock`] whose rate is obtained fresh on
//! every call. A single lock serializes all measurements: the debug counter and the mux
//! selectors are shared hardware, so two handshakes must never interleave.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::clk::measure::Hop;
use crate::clk::registry::{BindReport, ClockId, Registry, WindowSet};
use crate::common::error::DebugCcError;
use crate::config::TopologyConfig;
use crate::soc::traits::{ReferenceClock, WindowResolver};

/// Kind of a registered clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockKind {
    /// A debug multiplexer; its rate is measured.
    Mux,
    /// A measure-only placeholder; its rate is the fixed nominal value.
    Placeholder,
}

/// The debug clock controller: registry plus the serialized measurement engine.
#[derive(Debug)]
pub struct DebugCc {
    registry: Registry,
    engine: Mutex<WindowSet>,
}

impl DebugCc {
    /// Wraps a built registry and the windows it bound.
    pub fn new(registry: Registry, windows: WindowSet) -> Self {
        Self {
            registry,
            engine: Mutex::new(windows),
        }
    }

    /// Builds the registry from `config` and starts serving measurements.
    ///
    /// # Errors
    ///
    /// Whatever [`Registry::build`] reports as fatal: a missing or dead reference clock,
    /// an invalid measurement block, or an unknown root mux.
    pub fn start(
        config: &TopologyConfig,
        resolver: &mut dyn WindowResolver,
        reference: Option<Arc<dyn ReferenceClock>>,
    ) -> Result<Self, DebugCcError> {
        let (registry, windows) = Registry::build(config, resolver, reference)?;
        Ok(Self::new(registry, windows))
    }

    /// The underlying registry.
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Start-up report of the registry.
    pub const fn report(&self) -> &BindReport {
        self.registry.report()
    }

    /// Current rate of a registered clock in Hz.
    ///
    /// A placeholder returns its nominal rate. A mux is routed into the counter through
    /// all of its ancestors and measured at its current selection. A clock domain that
    /// never finishes counting reads as 0.
    ///
    /// # Errors
    ///
    /// * [`DebugCcError::UnknownClock`] if `name` is not registered; no register is touched.
    /// * [`DebugCcError::Unbound`] if a mux on the route has no window.
    pub fn current_rate(&self, name: &str) -> Result<u64, DebugCcError> {
        match self.registry.lookup(name) {
            Some(ClockId::Placeholder(i)) => Ok(self.registry.placeholder(i).rate()),
            Some(ClockId::Mux(i)) => {
                let route = self.registry.route_to_mux(i)?;
                self.run(name, &route)
            }
            None => Err(DebugCcError::UnknownClock(name.to_string())),
        }
    }

    /// Measures any signal that some mux can route to the counter.
    ///
    /// Unlike [`current_rate`](Self::current_rate) this also covers clocks that are not
    /// registered here (functional clocks of other drivers listed in a parent table) and
    /// really measures placeholders instead of reporting their nominal rate.
    ///
    /// # Errors
    ///
    /// * [`DebugCcError::UnknownClock`] if no mux lists `name`; no register is touched.
    /// * [`DebugCcError::Unbound`] if a mux on the route has no window.
    pub fn measure(&self, name: &str) -> Result<u64, DebugCcError> {
        let route = self.registry.route_to_source(name)?;
        self.run(name, &route)
    }

    /// Looks up a registered clock.
    ///
    /// # Errors
    ///
    /// [`DebugCcError::UnknownClock`] if `name` is not registered.
    pub fn clock(&self, name: &str) -> Result<DebugClock<'_>, DebugCcError> {
        self.registry
            .lookup(name)
            .map(|id| DebugClock { cc: self, id })
            .ok_or_else(|| DebugCcError::UnknownClock(name.to_string()))
    }

    /// Every registered clock: muxes first, then placeholders, in configuration order.
    pub fn clocks(&self) -> impl Iterator<Item = DebugClock<'_>> + '_ {
        let muxes = (0..self.registry.muxes().len()).map(ClockId::Mux);
        let placeholders = (0..self.registry.placeholders().len()).map(ClockId::Placeholder);
        muxes
            .chain(placeholders)
            .map(move |id| DebugClock { cc: self, id })
    }

    /// Every name [`measure`](Self::measure) accepts, sorted.
    pub fn sources(&self) -> Vec<&str> {
        self.registry.sources()
    }

    fn run(&self, name: &str, route: &[Hop<'_>]) -> Result<u64, DebugCcError> {
        let root = self.registry.root_window()?;
        let xo_rate = self.registry.reference().rate();
        let mut windows = self.lock();
        debug!(clock = name, hops = route.len(), "measuring");
        self.registry
            .measure_block()
            .measure_route(&mut windows, root, route, xo_rate)
    }

    fn lock(&self) -> MutexGuard<'_, WindowSet> {
        // Poison is ignored: every measurement reprograms the registers it uses.
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A read-only handle to one registered clock.
#[derive(Debug, Clone, Copy)]
pub struct DebugClock<'a> {
    cc: &'a DebugCc,
    id: ClockId,
}

impl DebugClock<'_> {
    /// Clock name.
    pub fn name(&self) -> &str {
        match self.id {
            ClockId::Mux(i) => self.cc.registry.mux(i).name(),
            ClockId::Placeholder(i) => self.cc.registry.placeholder(i).name(),
        }
    }

    /// Whether this is a mux or a placeholder.
    pub const fn kind(&self) -> ClockKind {
        match self.id {
            ClockId::Mux(_) => ClockKind::Mux,
            ClockId::Placeholder(_) => ClockKind::Placeholder,
        }
    }

    /// Whether the clock can be measured: placeholders always, muxes only when bound.
    pub fn is_available(&self) -> bool {
        match self.id {
            ClockId::Mux(i) => self.cc.registry.is_bound(i),
            ClockId::Placeholder(_) => true,
        }
    }

    /// Current rate in Hz; see [`DebugCc::current_rate`].
    ///
    /// # Errors
    ///
    /// [`DebugCcError::Unbound`] if a mux on the route has no window.
    pub fn rate(&self) -> Result<u64, DebugCcError> {
        self.cc.current_rate(self.name())
    }

    /// Rejected: debug clocks are measurement-only.
    ///
    /// # Errors
    ///
    /// Always [`DebugCcError::ReadOnly`].
    pub fn set_rate(&self, _rate: u64) -> Result<(), DebugCcError> {
        Err(DebugCcError::ReadOnly(self.name().to_string()))
    }

    /// Rejected: debug clocks are measurement-only.
    ///
    /// # Errors
    ///
    /// Always [`DebugCcError::ReadOnly`].
    pub fn enable(&self) -> Result<(), DebugCcError> {
        Err(DebugCcError::ReadOnly(self.name().to_string()))
    }

    /// Rejected: debug clocks are measurement-only.
    ///
    /// # Errors
    ///
    /// Always [`DebugCcError::ReadOnly`].
    pub fn disable(&self) -> Result<(), DebugCcError> {
        Err(DebugCcError::ReadOnly(self.name().to_string()))
    }
}
