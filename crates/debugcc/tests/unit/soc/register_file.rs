//! # Register File Tests

use debugcc_core::soc::devices::RegisterFile;
use debugcc_core::soc::traits::RegisterWindow;

#[test]
fn registers_reset_to_zero() {
    let mut file = RegisterFile::new("qcom,gcc", 0x1000);
    assert_eq!(file.read_u32(0x10), 0);
    assert_eq!(file.name(), "qcom,gcc");
    assert_eq!(file.size(), 0x1000);
}

#[test]
fn writes_stick_and_are_counted() {
    let mut file = RegisterFile::new("w", 0x1000);
    file.write_u32(0x20, 0xCAFE);
    assert_eq!(file.read_u32(0x20), 0xCAFE);
    assert_eq!((file.reads(), file.writes(), file.accesses()), (1, 1, 2));
}

#[test]
fn peek_and_poke_are_not_counted() {
    let mut file = RegisterFile::new("w", 0x1000);
    file.poke(0x4, 7);
    assert_eq!(file.peek(0x4), 7);
    assert_eq!(file.accesses(), 0);
}

#[test]
fn out_of_range_writes_are_dropped() {
    let mut file = RegisterFile::new("w", 0x10);
    file.write_u32(0x10, 1);
    assert_eq!(file.read_u32(0x10), 0);
}
