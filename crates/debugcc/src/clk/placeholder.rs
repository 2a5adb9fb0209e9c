//! Measure-only placeholder clocks.

use crate::config::PlaceholderConfig;

/// A clock that exists only so the mux tables have something to point at.
///
/// Its real divider chain is not modelled; reading its rate returns the nominal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderClock {
    name: String,
    rate: u64,
}

impl PlaceholderClock {
    /// Creates a placeholder with a fixed nominal rate.
    pub fn new(name: impl Into<String>, rate: u64) -> Self {
        Self {
            name: name.into(),
            rate,
        }
    }

    /// Clock name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nominal rate in Hz.
    pub const fn rate(&self) -> u64 {
        self.rate
    }
}

impl From<&PlaceholderConfig> for PlaceholderClock {
    fn from(cfg: &PlaceholderConfig) -> Self {
        Self::new(cfg.name.clone(), cfg.rate)
    }
}
