//! # Measurement Engine Tests
//!
//! Rate arithmetic, the counter handshake against mocked and in-memory windows,
//! and measurement determinism.

use debugcc_core::clk::measure::{MeasureBlock, MeasureOutcome, compute_rate};
use debugcc_core::common::constants::{CNT_DONE, CNT_EN, MEASURE_CNT};
use debugcc_core::config::MeasureConfig;
use debugcc_core::soc::devices::RegisterFile;
use mockall::Sequence;
use mockall::predicate::eq;
use proptest::prelude::*;

use crate::common::harness::TestContext;
use crate::common::mocks::window::MockWindow;

const CTL: u64 = 0x79004;
const STATUS: u64 = 0x79008;

fn block(poll_limit: u32) -> MeasureBlock {
    let mut cfg = MeasureConfig::new("gcc_debug_mux", CTL, STATUS, 0x22010);
    cfg.poll_limit = poll_limit;
    MeasureBlock::from(&cfg)
}

// ══════════════════════════════════════════════════════════
// Rate arithmetic
// ══════════════════════════════════════════════════════════

#[test]
fn no_selector_root_scenario() {
    assert_eq!(compute_rate(1000, 9600, 4, 1_024_000, 1), 37);
}

#[test]
fn pre_divider_scales_after_the_division() {
    assert_eq!(compute_rate(1000, 9600, 4, 1_024_000, 2), 74);
    assert_eq!(compute_rate(25_000, 4_800_000, 4, 4800, 1), 100_000_000);
}

#[test]
fn zero_count_is_zero_hz() {
    assert_eq!(compute_rate(0, 4_800_000, 4, 0x8000, 8), 0);
}

#[test]
fn zero_window_is_zero_hz() {
    assert_eq!(compute_rate(1000, 4_800_000, 4, 0, 1), 0);
}

#[test]
fn huge_products_saturate() {
    assert_eq!(compute_rate(MEASURE_CNT, u64::MAX, u64::MAX, 1, u64::MAX), u64::MAX);
}

#[test]
fn tick_rate_and_control_word() {
    let block = block(8);
    assert_eq!(block.tick_rate(19_200_000), 4_800_000);
    assert_eq!(block.window_cycles(), 0x8000);
    assert_eq!(block.control_word(false), 0x8000);
    assert_eq!(block.control_word(true), 0x8000 | CNT_EN);
}

// ══════════════════════════════════════════════════════════
// Handshake
// ══════════════════════════════════════════════════════════

#[test]
fn handshake_reads_count_once_done() {
    let mut window = MockWindow::new();
    let mut seq = Sequence::new();
    window
        .expect_write_u32()
        .with(eq(CTL), eq(0x8000))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| ());
    window
        .expect_write_u32()
        .with(eq(CTL), eq(0x8000 | CNT_EN))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| ());
    window
        .expect_read_u32()
        .with(eq(STATUS))
        .times(2)
        .in_sequence(&mut seq)
        .returning(|_| CNT_DONE | 1234);
    window
        .expect_write_u32()
        .with(eq(CTL), eq(0x8000))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| ());

    assert_eq!(block(8).handshake(&mut window), MeasureOutcome::Counted(1234));
}

#[test]
fn handshake_polls_until_done() {
    let mut window = MockWindow::new();
    let mut polls = 0;
    window.expect_write_u32().returning(|_, _| ());
    window.expect_read_u32().with(eq(STATUS)).returning(move |_| {
        polls += 1;
        if polls >= 3 { CNT_DONE | 77 } else { 0 }
    });

    assert_eq!(block(8).handshake(&mut window).raw_count(), Some(77));
}

#[test]
fn timeout_deasserts_enable() {
    let mut window = RegisterFile::new("qcom,gcc", 0x1F_0000);

    let outcome = block(5).handshake(&mut window);

    assert_eq!(outcome, MeasureOutcome::TimedOut { polls: 5 });
    assert_eq!(outcome.raw_count(), None);
    assert_eq!(window.peek(CTL) & CNT_EN, 0);
    assert_eq!(window.reads(), 5);
}

#[test]
fn stuck_source_measures_zero_and_tears_down() {
    let ctx = TestContext::sdx55();
    ctx.soc.set_rate("gcc_gp1_clk", 100_000_000);
    ctx.soc.set_stuck("gcc_gp1_clk", true);

    assert_eq!(ctx.cc.measure("gcc_gp1_clk").unwrap(), 0);
    assert_eq!(ctx.soc.peek("qcom,gcc", CTL) & CNT_EN, 0);
    assert_eq!(ctx.soc.peek("qcom,gcc", 0x29004) & 1, 0);
    assert_eq!(ctx.soc.peek("qcom,gcc", 0x22010) & 1, 0);

    ctx.soc.set_stuck("gcc_gp1_clk", false);
    assert_eq!(ctx.cc.measure("gcc_gp1_clk").unwrap(), 100_000_000);
}

// ══════════════════════════════════════════════════════════
// Determinism
// ══════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn compute_rate_is_deterministic(
        raw in 0..=MEASURE_CNT,
        tick in 1_u64..100_000_000,
        post in 1_u64..16,
        window in 1_u32..0x10_0000,
        pre in 1_u64..16,
    ) {
        let first = compute_rate(raw, tick, post, window, pre);
        prop_assert_eq!(first, compute_rate(raw, tick, post, window, pre));
        prop_assert_eq!(
            u128::from(first),
            u128::from(raw) * u128::from(tick) * u128::from(post) / u128::from(window)
                * u128::from(pre)
        );
    }
}

#[test]
fn repeated_measurements_agree() {
    let ctx = TestContext::sdx55();
    ctx.soc.set_rate("gcc_sdcc1_apps_clk", 384_000_000);
    let first = ctx.cc.measure("gcc_sdcc1_apps_clk").unwrap();
    for _ in 0..4 {
        assert_eq!(ctx.cc.measure("gcc_sdcc1_apps_clk").unwrap(), first);
    }
    assert_eq!(first, 384_000_000);
}
