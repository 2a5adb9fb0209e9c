//! Topology registry.
//!
//! This module turns a [`TopologyConfig`] into the fixed set of clocks the facade serves.
//! It performs:
//! 1. **Node Validation:** Each mux and placeholder is checked on its own; offenders are
//!    rejected and reported, the rest keep going.
//! 2. **Ancestry Linking:** Mux-to-mux parent links form a forest under the measurement
//!    root; ambiguous, cyclic and detached muxes are rejected.
//! 3. **Window Binding:** Every distinct window name is resolved once. Nodes whose window
//!    is not present, fails to map, or is too small lose measurement capability.
//! 4. **Route Resolution:** Root-to-leaf hop lists for any measurable name.
//!
//! Binding happens once. Nothing is retried after start-up.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clk::measure::{Hop, MeasureBlock, Selection};
use crate::clk::mux::MuxNode;
use crate::clk::placeholder::PlaceholderClock;
use crate::common::constants::REG_WIDTH;
use crate::common::error::{ConfigError, DebugCcError};
use crate::config::TopologyConfig;
use crate::soc::traits::{Binding, ReferenceClock, RegisterWindow, WindowResolver};

/// Index of a bound window inside a [`WindowSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(usize);

/// The register windows bound at start-up.
#[derive(Default)]
pub struct WindowSet {
    windows: Vec<Box<dyn RegisterWindow>>,
}

impl WindowSet {
    fn push(&mut self, window: Box<dyn RegisterWindow>) -> WindowId {
        self.windows.push(window);
        WindowId(self.windows.len() - 1)
    }

    /// Borrows a bound window.
    pub fn get(&self, id: WindowId) -> &dyn RegisterWindow {
        self.windows[id.0].as_ref()
    }

    /// Mutably borrows a bound window.
    ///
    /// `WindowId`s are only handed out by the registry that filled this set.
    pub fn get_mut(&mut self, id: WindowId) -> &mut dyn RegisterWindow {
        self.windows[id.0].as_mut()
    }

    /// Number of bound windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Returns `true` when no window is bound.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl fmt::Debug for WindowSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.windows.iter().map(|w| w.name()))
            .finish()
    }
}

/// A registered clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockId {
    /// Index into the registry's muxes.
    Mux(usize),
    /// Index into the registry's placeholders.
    Placeholder(usize),
}

/// Outcome of linking mux ancestry.
#[derive(Debug, Default)]
pub struct Ancestry {
    /// For each mux, the mux it feeds into (`None` for the root and for rejected muxes).
    pub upstream: Vec<Option<usize>>,
    /// Muxes that cannot be routed, with the reason.
    pub rejected: Vec<(usize, ConfigError)>,
}

/// Links every mux to the mux that lists it as a parent and checks that each one
/// reaches `root`.
///
/// A mux claimed by two others, a loop, or a chain that ends anywhere but the root
/// is rejected. Rejection propagates: a mux whose upstream was rejected is detached.
pub fn link_ancestry(nodes: &[MuxNode], root: usize) -> Ancestry {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.name(), i))
        .collect();

    let mut upstream: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut rejected: Vec<(usize, ConfigError)> = Vec::new();

    for (owner, node) in nodes.iter().enumerate() {
        for parent in node.parents() {
            let Some(&child) = index.get(parent.name.as_str()) else {
                continue;
            };
            if child == root || child == owner {
                let chain = if child == owner {
                    vec![node.name().to_string(), node.name().to_string()]
                } else {
                    vec![
                        nodes[root].name().to_string(),
                        node.name().to_string(),
                        nodes[root].name().to_string(),
                    ]
                };
                rejected.push((owner, ConfigError::Cycle { chain }));
                continue;
            }
            match upstream[child] {
                None => upstream[child] = Some(owner),
                Some(first) => rejected.push((
                    child,
                    ConfigError::MultipleParents {
                        mux: nodes[child].name().to_string(),
                        first: nodes[first].name().to_string(),
                        second: node.name().to_string(),
                    },
                )),
            }
        }
    }

    let mut bad = vec![false; nodes.len()];
    for (i, _) in &rejected {
        bad[*i] = true;
    }

    for start in 0..nodes.len() {
        if start == root || bad[start] {
            continue;
        }
        let mut chain = vec![start];
        let mut cursor = start;
        loop {
            match upstream[cursor] {
                Some(next) if next == root => break,
                Some(next) if chain.contains(&next) => {
                    let from = chain.iter().position(|&c| c == next).unwrap_or(0);
                    let mut names: Vec<String> = chain[from..]
                        .iter()
                        .map(|&c| nodes[c].name().to_string())
                        .collect();
                    names.push(nodes[next].name().to_string());
                    if from > 0 {
                        bad[start] = true;
                        rejected.push((start, ConfigError::Detached(nodes[start].name().to_string())));
                    }
                    for &c in &chain[from..] {
                        if !bad[c] {
                            bad[c] = true;
                            rejected.push((
                                c,
                                ConfigError::Cycle {
                                    chain: names.clone(),
                                },
                            ));
                        }
                    }
                    break;
                }
                Some(next) if bad[next] => {
                    bad[start] = true;
                    rejected.push((start, ConfigError::Detached(nodes[start].name().to_string())));
                    break;
                }
                Some(next) => {
                    chain.push(next);
                    cursor = next;
                }
                None => {
                    bad[start] = true;
                    rejected.push((start, ConfigError::Detached(nodes[start].name().to_string())));
                    break;
                }
            }
        }
    }

    for (i, up) in upstream.iter_mut().enumerate() {
        if bad[i] || up.is_some_and(|u| bad[u]) {
            *up = None;
        }
    }

    Ancestry { upstream, rejected }
}

/// Outcome of resolving one window name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WindowState {
    Bound(WindowId),
    NotPresent,
    Failed(String),
}

/// What happened to each clock during start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    /// Muxes bound to a window and ready to measure.
    pub bound: Vec<String>,
    /// Muxes whose window does not exist on this hardware.
    pub not_present: Vec<String>,
    /// Muxes whose window could not be mapped or is unsuitable.
    pub failed: Vec<(String, DebugCcError)>,
    /// Clocks rejected by configuration checks.
    pub rejected: Vec<(String, ConfigError)>,
    /// Placeholders registered.
    pub placeholders: Vec<String>,
}

impl BindReport {
    /// Returns `true` when every configured clock was registered and bound.
    pub fn is_complete(&self) -> bool {
        self.not_present.is_empty() && self.failed.is_empty() && self.rejected.is_empty()
    }
}

/// The immutable clock topology plus the window binding of every mux.
pub struct Registry {
    name: String,
    muxes: Vec<MuxNode>,
    bindings: Vec<Option<WindowId>>,
    upstream: Vec<Option<usize>>,
    placeholders: Vec<PlaceholderClock>,
    clocks: HashMap<String, ClockId>,
    sources: HashMap<String, usize>,
    root: usize,
    measure: MeasureBlock,
    reference: Arc<dyn ReferenceClock>,
    report: BindReport,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("name", &self.name)
            .field("muxes", &self.muxes.len())
            .field("placeholders", &self.placeholders.len())
            .field("root", &self.muxes[self.root].name())
            .field("reference", &self.reference.name())
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Validates `config`, resolves every window and binds the muxes.
    ///
    /// Per-node problems (bad tables, cycles, missing windows) reject only that node and
    /// are listed in [`report`](Self::report).
    ///
    /// # Errors
    ///
    /// * [`DebugCcError::MissingReference`] / [`DebugCcError::ReferenceUnavailable`] when the
    ///   reference oscillator is absent or reports 0 Hz.
    /// * [`DebugCcError::Config`] when the measurement block is invalid or the root mux is
    ///   not registered.
    pub fn build(
        config: &TopologyConfig,
        resolver: &mut dyn WindowResolver,
        reference: Option<Arc<dyn ReferenceClock>>,
    ) -> Result<(Self, WindowSet), DebugCcError> {
        let reference = reference.ok_or(DebugCcError::MissingReference)?;
        if reference.rate() == 0 {
            return Err(DebugCcError::ReferenceUnavailable(reference.name().to_string()));
        }
        config.measure.validate()?;

        let mut report = BindReport::default();
        let mut taken: HashSet<&str> = HashSet::new();
        let mut muxes = Vec::new();
        for cfg in &config.muxes {
            if !taken.insert(cfg.name.as_str()) {
                warn!(mux = %cfg.name, "duplicate clock name; skipped");
                report
                    .rejected
                    .push((cfg.name.clone(), ConfigError::DuplicateClock(cfg.name.clone())));
                continue;
            }
            match MuxNode::from_config(cfg) {
                Ok(node) => muxes.push(node),
                Err(err) => {
                    warn!(mux = %cfg.name, error = %err, "invalid mux; skipped");
                    report.rejected.push((cfg.name.clone(), err));
                }
            }
        }

        let root = muxes
            .iter()
            .position(|m| m.name() == config.measure.root)
            .ok_or_else(|| ConfigError::UnknownRoot(config.measure.root.clone()))?;

        let ancestry = link_ancestry(&muxes, root);
        let mut keep = vec![true; muxes.len()];
        for (i, err) in ancestry.rejected {
            warn!(mux = muxes[i].name(), error = %err, "unroutable mux; skipped");
            keep[i] = false;
            report.rejected.push((muxes[i].name().to_string(), err));
        }

        // Compact the surviving muxes and remap the upstream links.
        let mut remap = vec![None; muxes.len()];
        let mut kept = Vec::new();
        for (i, node) in muxes.into_iter().enumerate() {
            if keep[i] {
                remap[i] = Some(kept.len());
                kept.push(node);
            }
        }
        let muxes = kept;
        let upstream: Vec<Option<usize>> = ancestry
            .upstream
            .iter()
            .enumerate()
            .filter(|(i, _)| keep[*i])
            .map(|(_, up)| up.and_then(|u| remap[u]))
            .collect();
        let root = remap[root].ok_or_else(|| ConfigError::UnknownRoot(config.measure.root.clone()))?;

        let mut clocks: HashMap<String, ClockId> = muxes
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name().to_string(), ClockId::Mux(i)))
            .collect();
        let mut placeholders = Vec::new();
        for cfg in &config.placeholders {
            if clocks.contains_key(&cfg.name) || taken.contains(cfg.name.as_str()) {
                warn!(clock = %cfg.name, "duplicate clock name; skipped");
                report
                    .rejected
                    .push((cfg.name.clone(), ConfigError::DuplicateClock(cfg.name.clone())));
                continue;
            }
            let _ = clocks.insert(cfg.name.clone(), ClockId::Placeholder(placeholders.len()));
            report.placeholders.push(cfg.name.clone());
            placeholders.push(PlaceholderClock::from(cfg));
        }

        let mut sources = HashMap::new();
        for (i, mux) in muxes.iter().enumerate() {
            for parent in mux.parents() {
                let _ = sources.entry(parent.name.clone()).or_insert(i);
            }
        }

        let measure = MeasureBlock::from(&config.measure);
        let mut windows = WindowSet::default();
        let mut resolved: HashMap<String, WindowState> = HashMap::new();
        let mut bindings = Vec::with_capacity(muxes.len());
        for (i, mux) in muxes.iter().enumerate() {
            let state = resolved
                .entry(mux.window().to_string())
                .or_insert_with(|| match resolver.resolve(mux.window()) {
                    Binding::Bound(window) => {
                        debug!(window = mux.window(), size = window.size(), "window bound");
                        WindowState::Bound(windows.push(window))
                    }
                    Binding::NotPresent => {
                        debug!(window = mux.window(), "window not present");
                        WindowState::NotPresent
                    }
                    Binding::Error(message) => {
                        warn!(window = mux.window(), %message, "window failed to map");
                        WindowState::Failed(message)
                    }
                })
                .clone();

            let binding = match state {
                WindowState::Bound(id) => {
                    let window = windows.get(id);
                    let mut offsets = mux.register_offsets();
                    if i == root {
                        offsets.extend(measure.register_offsets());
                    }
                    match check_offsets(mux.name(), window, &offsets) {
                        Ok(()) => {
                            report.bound.push(mux.name().to_string());
                            Some(id)
                        }
                        Err(err) => {
                            warn!(mux = mux.name(), error = %err, "window unsuitable");
                            report.failed.push((mux.name().to_string(), err));
                            None
                        }
                    }
                }
                WindowState::NotPresent => {
                    report.not_present.push(mux.name().to_string());
                    None
                }
                WindowState::Failed(message) => {
                    let err = DebugCcError::WindowFailed {
                        window: mux.window().to_string(),
                        message,
                    };
                    report.failed.push((mux.name().to_string(), err));
                    None
                }
            };
            bindings.push(binding);
        }

        info!(
            topology = %config.name,
            bound = report.bound.len(),
            not_present = report.not_present.len(),
            failed = report.failed.len(),
            rejected = report.rejected.len(),
            placeholders = report.placeholders.len(),
            "debug clock registry ready"
        );

        let registry = Self {
            name: config.name.clone(),
            muxes,
            bindings,
            upstream,
            placeholders,
            clocks,
            sources,
            root,
            measure,
            reference,
            report,
        };
        Ok((registry, windows))
    }

    /// Variant name of the topology.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What happened to every clock during start-up.
    pub const fn report(&self) -> &BindReport {
        &self.report
    }

    /// The shared counter block.
    pub const fn measure_block(&self) -> &MeasureBlock {
        &self.measure
    }

    /// The reference oscillator.
    pub fn reference(&self) -> &dyn ReferenceClock {
        self.reference.as_ref()
    }

    /// The mux feeding the counter.
    pub fn root(&self) -> &MuxNode {
        &self.muxes[self.root]
    }

    /// Looks up a registered clock by name.
    pub fn lookup(&self, name: &str) -> Option<ClockId> {
        self.clocks.get(name).copied()
    }

    /// Registered muxes.
    pub fn muxes(&self) -> &[MuxNode] {
        &self.muxes
    }

    /// Registered placeholders.
    pub fn placeholders(&self) -> &[PlaceholderClock] {
        &self.placeholders
    }

    /// Mux at `index`.
    pub fn mux(&self, index: usize) -> &MuxNode {
        &self.muxes[index]
    }

    /// Placeholder at `index`.
    pub fn placeholder(&self, index: usize) -> &PlaceholderClock {
        &self.placeholders[index]
    }

    /// Whether mux `index` has a bound window.
    pub fn is_bound(&self, index: usize) -> bool {
        self.bindings[index].is_some()
    }

    /// The mux that `index` feeds into.
    pub fn upstream(&self, index: usize) -> Option<&MuxNode> {
        self.upstream[index].map(|u| &self.muxes[u])
    }

    /// Every name that some mux can route to the counter, sorted.
    pub fn sources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Window of the counter block.
    ///
    /// # Errors
    ///
    /// [`DebugCcError::Unbound`] when the root mux has no window.
    pub fn root_window(&self) -> Result<WindowId, DebugCcError> {
        self.bindings[self.root].ok_or_else(|| DebugCcError::Unbound(self.root().name().to_string()))
    }

    /// Hops that route the output of mux `index` into the counter, root first.
    ///
    /// A single-parent mux selects that parent on the last hop; a multi-parent mux keeps
    /// its current selection.
    ///
    /// # Errors
    ///
    /// [`DebugCcError::Unbound`] naming the first unbound mux on the route.
    pub fn route_to_mux(&self, index: usize) -> Result<Vec<Hop<'_>>, DebugCcError> {
        let target = &self.muxes[index];
        let select = match target.parents() {
            [only] => Selection::Parent(only.name.as_str()),
            _ => Selection::Current,
        };
        let mut hops = vec![Hop {
            mux: target,
            window: self.window_of(index)?,
            select,
        }];
        let mut child = index;
        while let Some(up) = self.upstream[child] {
            hops.push(Hop {
                mux: &self.muxes[up],
                window: self.window_of(up)?,
                select: Selection::Parent(self.muxes[child].name()),
            });
            child = up;
        }
        hops.reverse();
        Ok(hops)
    }

    /// Hops that route `source` into the counter, root first.
    ///
    /// A mux name routes to that mux's current output; any other name is selected on the
    /// first mux that lists it.
    ///
    /// # Errors
    ///
    /// [`DebugCcError::UnknownClock`] when nothing can route `source`, or
    /// [`DebugCcError::Unbound`] naming the first unbound mux on the route.
    pub fn route_to_source<'a>(&'a self, source: &'a str) -> Result<Vec<Hop<'a>>, DebugCcError> {
        if let Some(ClockId::Mux(index)) = self.lookup(source) {
            return self.route_to_mux(index);
        }
        let owner = *self
            .sources
            .get(source)
            .ok_or_else(|| DebugCcError::UnknownClock(source.to_string()))?;
        let mut hops = self.route_to_mux(owner)?;
        if let Some(last) = hops.last_mut() {
            last.select = Selection::Parent(source);
        }
        Ok(hops)
    }

    fn window_of(&self, index: usize) -> Result<WindowId, DebugCcError> {
        self.bindings[index].ok_or_else(|| DebugCcError::Unbound(self.muxes[index].name().to_string()))
    }
}

fn check_offsets(
    clock: &str,
    window: &dyn RegisterWindow,
    offsets: &[u64],
) -> Result<(), DebugCcError> {
    let size = window.size();
    match offsets
        .iter()
        .find(|&&o| o % REG_WIDTH != 0 || o.saturating_add(REG_WIDTH) > size)
    {
        Some(&offset) => Err(DebugCcError::OffsetOutOfRange {
            clock: clock.to_string(),
            window: window.name().to_string(),
            offset,
            size,
        }),
        None => Ok(()),
    }
}
