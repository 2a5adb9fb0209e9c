//! Built-in hardware variants.
//!
//! Each variant is a function returning its [`TopologyConfig`]. The tables are the
//! register map of the part; they are not loaded from disk.

use crate::common::error::ConfigError;
use crate::config::TopologyConfig;

/// Snapdragon X55 modem debug clock controller.
pub mod sdx55;

/// Names of the built-in variants.
pub const VARIANTS: &[&str] = &["sdx55"];

/// Looks up a built-in variant by name.
pub fn by_name(name: &str) -> Option<TopologyConfig> {
    match name {
        "sdx55" => Some(sdx55::topology()),
        _ => None,
    }
}

/// Like [`by_name`], but an unknown name is an error listing the built-in variants.
///
/// # Errors
///
/// [`ConfigError::UnknownTarget`] when `name` is not in [`VARIANTS`].
pub fn lookup(name: &str) -> Result<TopologyConfig, ConfigError> {
    by_name(name).ok_or_else(|| ConfigError::UnknownTarget {
        name: name.to_string(),
        known: VARIANTS.join(", "),
    })
}
