//! # Mux Node Tests
//!
//! Validation of mux descriptions and the register effects of parent selection.

use debugcc_core::clk::mux::MuxNode;
use debugcc_core::common::field::read_field;
use debugcc_core::common::{ConfigError, DebugCcError};
use debugcc_core::config::MuxConfig;
use debugcc_core::soc::devices::RegisterFile;
use debugcc_core::targets::sdx55;
use rstest::rstest;

fn node(cfg: &MuxConfig) -> MuxNode {
    MuxNode::from_config(cfg).unwrap()
}

fn window_for(cfg: &MuxConfig) -> RegisterFile {
    let size = sdx55::WINDOWS
        .iter()
        .find(|(name, _)| *name == cfg.window)
        .map_or(0x1000, |&(_, size)| size);
    RegisterFile::new(cfg.window.clone(), size)
}

// ══════════════════════════════════════════════════════════
// Parent selection
// ══════════════════════════════════════════════════════════

#[test]
fn every_sdx55_selection_reads_back_its_code() {
    for cfg in sdx55::topology().muxes {
        let mux = node(&cfg);
        let mut window = window_for(&cfg);
        for (parent, &sel) in cfg.parents.iter().zip(&cfg.sels) {
            mux.select_parent(&mut window, parent).unwrap();
            if mux.has_selector() {
                assert_eq!(
                    read_field(&mut window, mux.debug_offset(), mux.src_sel()),
                    sel,
                    "{} -> {parent}",
                    cfg.name
                );
            }
            assert_eq!(
                mux.current_parent(&mut window).map(|p| p.name.as_str()),
                Some(parent.as_str())
            );
        }
    }
}

#[rstest]
#[case("apss_cc_debug_mux", 0x7C)]
#[case("gcc_blsp1_ahb_clk", 0x34)]
#[case("gcc_eth_ptp_clk", 0xFD)]
#[case("mc_cc_debug_mux", 0x73)]
#[case("measure_only_snoc_clk", 0x109)]
fn gcc_selection(#[case] parent: &str, #[case] sel: u32) {
    let cfg = sdx55::gcc_debug_mux();
    let mux = node(&cfg);
    let mut window = window_for(&cfg);

    assert_eq!(mux.select_parent(&mut window, parent), Ok(1));
    assert_eq!(window.peek(0x79000) & 0x3FF, sel);
    assert_eq!(window.peek(0x29000) & 0xF, 4);
}

#[test]
fn apss_selector_is_bits_5_3() {
    let cfg = sdx55::apss_cc_debug_mux();
    let mux = node(&cfg);
    let mut window = window_for(&cfg);
    window.poke(0x1C, 0xFFFF_FFC7);

    mux.select_parent(&mut window, "measure_only_apcs_clk").unwrap();
    assert_eq!(window.peek(0x1C), 0xFFFF_FFDF);
}

#[test]
fn pre_divider_of_the_selected_parent_is_returned() {
    let mut cfg = sdx55::apss_cc_debug_mux();
    cfg.pre_divs = Some(vec![2]);
    let mux = node(&cfg);
    let mut window = window_for(&cfg);
    assert_eq!(mux.select_parent(&mut window, "measure_only_apcs_clk"), Ok(2));
}

#[test]
fn unknown_parent_touches_nothing() {
    let cfg = sdx55::gcc_debug_mux();
    let mux = node(&cfg);
    let mut window = window_for(&cfg);

    let err = mux.select_parent(&mut window, "gcc_gp4_clk").unwrap_err();
    assert_eq!(
        err,
        DebugCcError::UnknownParent {
            mux: "gcc_debug_mux".into(),
            parent: "gcc_gp4_clk".into(),
        }
    );
    assert_eq!(window.accesses(), 0);
}

#[test]
fn pass_through_selection_touches_nothing() {
    let cfg = sdx55::mc_cc_debug_mux();
    let mux = node(&cfg);
    let mut window = window_for(&cfg);

    assert!(!mux.has_selector());
    assert_eq!(mux.select_parent(&mut window, "measure_only_bimc_clk"), Ok(1));
    assert_eq!(window.accesses(), 0);
    assert!(mux.register_offsets().is_empty());
}

#[test]
fn branch_enable_keeps_other_bits() {
    let cfg = sdx55::gcc_debug_mux();
    let mux = node(&cfg);
    let mut window = window_for(&cfg);
    window.poke(0x29004, 0x8000_0000);

    mux.set_branch(&mut window, true);
    assert_eq!(window.peek(0x29004), 0x8000_0001);
    mux.set_branch(&mut window, false);
    assert_eq!(window.peek(0x29004), 0x8000_0000);
}

#[test]
fn unknown_selector_code_has_no_current_parent() {
    let cfg = sdx55::gcc_debug_mux();
    let mux = node(&cfg);
    let mut window = window_for(&cfg);
    window.poke(0x79000, 0x3FF);
    assert_eq!(mux.current_parent(&mut window), None);
}

// ══════════════════════════════════════════════════════════
// Validation
// ══════════════════════════════════════════════════════════

#[test]
fn selector_code_must_fit_the_mask() {
    let mut cfg = sdx55::apss_cc_debug_mux();
    cfg.sels = vec![0x8];
    assert!(matches!(
        MuxNode::from_config(&cfg),
        Err(ConfigError::SelectorOverflow { sel: 0x8, mask: 0x38, .. })
    ));
}

#[test]
fn pass_through_with_two_parents_is_ambiguous() {
    let mut cfg = sdx55::mc_cc_debug_mux();
    cfg.parents.push("measure_only_mccc_clk".into());
    cfg.sels.push(0);
    assert!(matches!(
        MuxNode::from_config(&cfg),
        Err(ConfigError::AmbiguousPassThrough { parents: 2, .. })
    ));
}

#[test]
fn zero_post_divider() {
    let mut cfg = sdx55::gcc_debug_mux();
    cfg.post_div_val = 0;
    assert!(matches!(
        MuxNode::from_config(&cfg),
        Err(ConfigError::ZeroDivider { .. })
    ));
}

#[test]
fn post_divider_must_fit_its_field() {
    let mut cfg = sdx55::gcc_debug_mux();
    cfg.post_div_val = 0x10;
    assert!(matches!(
        MuxNode::from_config(&cfg),
        Err(ConfigError::InvalidField { field: "post_div", .. })
    ));
}

#[test]
fn zero_pre_divider() {
    let mut cfg = sdx55::apss_cc_debug_mux();
    cfg.pre_divs = Some(vec![0]);
    assert!(matches!(
        MuxNode::from_config(&cfg),
        Err(ConfigError::ZeroDivider { .. })
    ));
}

#[test]
fn duplicate_parent() {
    let mut cfg = sdx55::gcc_debug_mux();
    cfg.parents[1] = cfg.parents[0].clone();
    assert!(matches!(
        MuxNode::from_config(&cfg),
        Err(ConfigError::DuplicateParent { .. })
    ));
}

#[test]
fn misaligned_offset() {
    let mut cfg = sdx55::gcc_debug_mux();
    cfg.cbcr_offset = Some(0x29006);
    assert!(matches!(
        MuxNode::from_config(&cfg),
        Err(ConfigError::Misaligned { what: "cbcr_offset", offset: 0x29006, .. })
    ));
}

#[test]
fn empty_parent_table() {
    let mut cfg = sdx55::mc_cc_debug_mux();
    cfg.parents.clear();
    cfg.sels.clear();
    assert_eq!(
        MuxNode::from_config(&cfg),
        Err(ConfigError::NoParents("mc_cc_debug_mux".into()))
    );
}
