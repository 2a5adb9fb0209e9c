//! # Configuration Tests
//!
//! Defaults, JSON loading, and whole-topology validation.

use std::io::Write;

use debugcc_core::common::ConfigError;
use debugcc_core::config::{MeasureConfig, MuxConfig, PlaceholderConfig, TopologyConfig};
use pretty_assertions::assert_eq;

use crate::common::harness::two_level;

fn mux(name: &str, parents: &[&str], sels: &[u32]) -> MuxConfig {
    MuxConfig {
        name: name.into(),
        window: "cc".into(),
        debug_offset: 0,
        post_div_offset: 0,
        cbcr_offset: None,
        src_sel_mask: 0xFF,
        src_sel_shift: 0,
        post_div_mask: 0,
        post_div_shift: 0,
        post_div_val: 1,
        parents: parents.iter().map(|p| (*p).to_string()).collect(),
        sels: sels.to_vec(),
        pre_divs: None,
    }
}

fn topology(muxes: Vec<MuxConfig>) -> TopologyConfig {
    TopologyConfig {
        name: "test".into(),
        measure: MeasureConfig::new("top", 0x10, 0x14, 0x18),
        muxes,
        placeholders: Vec::new(),
    }
}

// ══════════════════════════════════════════════════════════
// Defaults and loading
// ══════════════════════════════════════════════════════════

#[test]
fn measure_defaults() {
    let measure = MeasureConfig::new("top", 0x10, 0x14, 0x18);
    assert_eq!(measure.xo_divider, 4);
    assert_eq!(measure.window_cycles, 0x8000);
    assert_eq!(measure.poll_limit, 10_000);
    assert_eq!(measure.poll_delay_us, 0);
}

#[test]
fn json_fills_defaults() {
    let json = r#"{
        "name": "min",
        "measure": { "root": "top", "ctl_reg": 16, "status_reg": 20, "xo_div4_cbcr": 24 },
        "muxes": [ { "name": "top", "window": "cc", "parents": ["x"], "sels": [0] } ]
    }"#;
    let config = TopologyConfig::from_json_str(json).unwrap();
    assert_eq!(config.measure, MeasureConfig::new("top", 16, 20, 24));
    assert_eq!(config.muxes[0].post_div_val, 1);
    assert_eq!(config.muxes[0].cbcr_offset, None);
    assert_eq!(config.muxes[0].pre_divs, None);
    assert!(config.placeholders.is_empty());
    assert!(config.validate().is_ok());
}

#[test]
fn json_file_round_trip() {
    let mut written = two_level();
    written.placeholders.push(PlaceholderConfig::new("c", 1000));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(written.to_json().unwrap().as_bytes()).unwrap();

    let loaded = TopologyConfig::from_json_file(file.path()).unwrap();
    assert_eq!(loaded, written);
}

#[test]
fn malformed_json_is_rejected() {
    let err = TopologyConfig::from_json_str("{ \"name\": 3 }").unwrap_err();
    assert!(matches!(err, ConfigError::Json(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TopologyConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn windows_are_listed_once_in_first_use_order() {
    assert_eq!(two_level().windows(), vec!["cc", "sub", "pt"]);
}

// ══════════════════════════════════════════════════════════
// Validation
// ══════════════════════════════════════════════════════════

#[test]
fn two_level_is_valid() {
    assert_eq!(two_level().validate(), Ok(()));
}

#[test]
fn table_length_mismatch() {
    let config = topology(vec![mux("top", &["a", "b"], &[1])]);
    assert_eq!(
        config.validate(),
        Err(ConfigError::TableLengthMismatch {
            mux: "top".into(),
            parents: 2,
            sels: 1,
        })
    );
}

#[test]
fn pre_div_length_mismatch() {
    let mut top = mux("top", &["a", "b"], &[1, 2]);
    top.pre_divs = Some(vec![1]);
    let err = topology(vec![top]).validate().unwrap_err();
    assert!(matches!(err, ConfigError::PreDivLengthMismatch { pre_divs: 1, .. }));
}

#[test]
fn unknown_root() {
    let mut config = topology(vec![mux("top", &["a"], &[1])]);
    config.measure.root = "gone".into();
    assert_eq!(config.validate(), Err(ConfigError::UnknownRoot("gone".into())));
}

#[test]
fn duplicate_names() {
    let mut config = topology(vec![mux("top", &["a"], &[1])]);
    config.placeholders.push(PlaceholderConfig::new("top", 1000));
    assert_eq!(config.validate(), Err(ConfigError::DuplicateClock("top".into())));
}

#[test]
fn detached_cycle() {
    let config = topology(vec![
        mux("top", &["x"], &[1]),
        mux("a", &["b"], &[1]),
        mux("b", &["a"], &[1]),
    ]);
    assert_eq!(
        config.validate(),
        Err(ConfigError::Cycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        })
    );
}

#[test]
fn self_loop_on_root() {
    let config = topology(vec![mux("top", &["top"], &[1])]);
    assert_eq!(
        config.validate(),
        Err(ConfigError::Cycle {
            chain: vec!["top".into(), "top".into()],
        })
    );
}

#[test]
fn mux_fed_into_two_muxes() {
    let config = topology(vec![
        mux("top", &["a", "b"], &[1, 2]),
        mux("a", &["c"], &[1]),
        mux("b", &["c"], &[1]),
        MuxConfig::pass_through("c", "cc", "z"),
    ]);
    assert_eq!(
        config.validate(),
        Err(ConfigError::MultipleParents {
            mux: "c".into(),
            first: "a".into(),
            second: "b".into(),
        })
    );
}

#[test]
fn unreferenced_mux_is_detached() {
    let config = topology(vec![mux("top", &["a"], &[1]), mux("orphan", &["b"], &[1])]);
    assert_eq!(config.validate(), Err(ConfigError::Detached("orphan".into())));
}

#[test]
fn non_contiguous_selector_mask() {
    let mut top = mux("top", &["a"], &[1]);
    top.src_sel_mask = 0x28;
    top.src_sel_shift = 3;
    let err = topology(vec![top]).validate().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidField { field: "src_sel", .. }));
}

#[test]
fn window_cycles_must_fit_the_tick_field() {
    let mut config = topology(vec![mux("top", &["a"], &[1])]);
    config.measure.window_cycles = 0x10_0000;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidMeasure(_))));

    config.measure.window_cycles = 0;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidMeasure(_))));
}

#[test]
fn misaligned_counter_registers() {
    let mut config = topology(vec![mux("top", &["a"], &[1])]);
    config.measure.status_reg = 0x15;
    assert!(matches!(config.validate(), Err(ConfigError::InvalidMeasure(_))));
}
