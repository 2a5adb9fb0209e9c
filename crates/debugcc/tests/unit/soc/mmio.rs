//! # MMIO Window Tests
//!
//! Volatile access over a caller-owned buffer and resolver outcomes.

use debugcc_core::soc::devices::{MmioResolver, MmioWindow};
use debugcc_core::soc::traits::{Binding, RegisterWindow, WindowResolver};

fn window_over(buffer: &mut [u32]) -> MmioWindow {
    let size = u64::try_from(buffer.len() * 4).unwrap();
    // SAFETY: the buffer outlives the window in every test and is not touched meanwhile.
    unsafe { MmioWindow::from_raw("buf", buffer.as_mut_ptr().cast(), size) }
}

#[test]
fn reads_and_writes_hit_the_buffer() {
    let mut buffer = vec![0_u32; 8];
    {
        let mut window = window_over(&mut buffer);
        window.write_u32(0x8, 0x1234_5678);
        assert_eq!(window.read_u32(0x8), 0x1234_5678);
        assert_eq!(window.size(), 32);
    }
    assert_eq!(buffer[2], 0x1234_5678);
}

#[test]
fn out_of_range_and_misaligned_accesses_are_ignored() {
    let mut buffer = vec![0xFFFF_FFFF_u32; 4];
    {
        let mut window = window_over(&mut buffer);
        assert_eq!(window.read_u32(0x10), 0);
        assert_eq!(window.read_u32(0x2), 0);
        window.write_u32(0x10, 0);
        window.write_u32(0x6, 0);
    }
    assert!(buffer.iter().all(|&w| w == 0xFFFF_FFFF));
}

#[test]
fn undeclared_regions_are_not_present() {
    let mut resolver = MmioResolver::new("/dev/mem");
    assert!(matches!(resolver.resolve("qcom,gcc"), Binding::NotPresent));
}

#[test]
fn unmappable_device_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut resolver =
        MmioResolver::new(dir.path().join("no-such-mem")).with_region("qcom,gcc", 0x10_0000, 0x1000);
    assert!(matches!(resolver.resolve("qcom,gcc"), Binding::Error(_)));
}
