//! # Register Field Codec Tests
//!
//! Read-modify-write behavior of `read_field` / `write_field` against a
//! `RegisterFile`, including access counts and preservation of outside bits.

use debugcc_core::common::field::{Field, read_field, write_field};
use debugcc_core::soc::devices::RegisterFile;
use proptest::prelude::*;
use rstest::rstest;

const REG: u64 = 0x1C;

fn window_with(value: u32) -> RegisterFile {
    let mut window = RegisterFile::new("test", 0x100);
    window.poke(REG, value);
    window
}

// ══════════════════════════════════════════════════════════
// Scenarios
// ══════════════════════════════════════════════════════════

#[test]
fn selector_code_lands_in_bits_5_3() {
    let mut window = window_with(0);
    write_field(&mut window, REG, Field::new(0x38, 3), 0x3);
    assert_eq!(window.peek(REG), 0b011 << 3);
    assert_eq!(read_field(&mut window, REG, Field::new(0x38, 3)), 0x3);
}

#[test]
fn write_preserves_outside_bits() {
    let mut window = window_with(0xFFFF_FFFF);
    write_field(&mut window, REG, Field::new(0x38, 3), 0x3);
    assert_eq!(window.peek(REG), 0xFFFF_FFDF);
}

#[test]
fn write_is_one_read_and_one_write() {
    let mut window = window_with(0);
    write_field(&mut window, REG, Field::new(0x3FF, 0), 0x109);
    assert_eq!((window.reads(), window.writes()), (1, 1));

    let _ = read_field(&mut window, REG, Field::new(0x3FF, 0));
    assert_eq!((window.reads(), window.writes()), (2, 1));
}

#[rstest]
#[case(Field::new(0xF, 0), 0x1F, 0xF)]
#[case(Field::new(0x38, 3), 0x9, 0x1)]
#[case(Field::new(0x8000_0000, 31), 0x3, 0x1)]
fn oversized_values_are_truncated(#[case] field: Field, #[case] value: u32, #[case] stored: u32) {
    let mut window = window_with(0);
    write_field(&mut window, REG, field, value);
    assert_eq!(read_field(&mut window, REG, field), stored);
}

#[test]
fn absent_field_reads_zero_and_writes_nothing() {
    let mut window = window_with(0xDEAD_BEEF);
    write_field(&mut window, REG, Field::NONE, 0x7);
    assert_eq!(window.peek(REG), 0xDEAD_BEEF);
    assert_eq!(read_field(&mut window, REG, Field::NONE), 0);
}

// ══════════════════════════════════════════════════════════
// Properties
// ══════════════════════════════════════════════════════════

fn any_field() -> impl Strategy<Value = Field> {
    (1_u32..=32).prop_flat_map(|width| {
        (0..=32 - width).prop_map(move |shift| {
            let run = if width == 32 { u32::MAX } else { (1 << width) - 1 };
            Field::new(run << shift, shift)
        })
    })
}

proptest! {
    #[test]
    fn write_then_read_round_trips(field in any_field(), initial: u32, value: u32) {
        let mut window = window_with(initial);
        write_field(&mut window, REG, field, value);

        prop_assert!(field.is_well_formed());
        prop_assert_eq!(read_field(&mut window, REG, field), value & field.max_value());
        prop_assert_eq!(window.peek(REG) & !field.mask, initial & !field.mask);
    }
}
