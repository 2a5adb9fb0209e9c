//! Memory-mapped register windows.
//!
//! This module provides the windows used on real hardware:
//! 1. **`MmioWindow`:** Volatile 32-bit access to a mapped register region.
//! 2. **`MmioResolver`:** Maps named physical regions through a memory device
//!    (`/dev/mem` by default) on Unix systems.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::common::constants::REG_WIDTH;
use crate::soc::traits::{Binding, RegisterWindow, WindowResolver};

/// A register window over mapped memory.
///
/// Misaligned or out-of-range accesses read as 0 and drop writes.
pub struct MmioWindow {
    name: String,
    ptr: *mut u8,
    size: u64,
    mapped: bool,
}

// SAFETY: the window exclusively owns its pointer; every access goes through `&mut self`.
unsafe impl Send for MmioWindow {}

impl fmt::Debug for MmioWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MmioWindow")
            .field("name", &self.name)
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .finish()
    }
}

impl MmioWindow {
    /// Wraps an already mapped region.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for volatile 32-bit reads and writes over `size` bytes, aligned
    /// to 4 bytes, and not accessed through any other path while the window lives.
    pub unsafe fn from_raw(name: impl Into<String>, ptr: *mut u8, size: u64) -> Self {
        Self {
            name: name.into(),
            ptr,
            size,
            mapped: false,
        }
    }

    /// Maps `size` bytes at physical address `base` through the memory device at `device`.
    ///
    /// # Errors
    ///
    /// A description of the failing step: the device cannot be opened, the range does not
    /// fit the host types, or `mmap` fails.
    #[cfg(unix)]
    pub fn map(
        name: impl Into<String>,
        device: &std::path::Path,
        base: u64,
        size: u64,
    ) -> Result<Self, String> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let path = CString::new(device.as_os_str().as_bytes()).map_err(|e| e.to_string())?;
        let len = usize::try_from(size).map_err(|e| e.to_string())?;
        let offset = libc::off_t::try_from(base).map_err(|e| e.to_string())?;

        // SAFETY: `path` is NUL-terminated and outlives the call.
        let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDWR | libc::O_SYNC) };
        if fd < 0 {
            return Err(format!(
                "open {}: {}",
                device.display(),
                std::io::Error::last_os_error()
            ));
        }
        // SAFETY: a fresh shared mapping of an open descriptor; the result is checked below.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                offset,
            )
        };
        let err = std::io::Error::last_os_error();
        // SAFETY: `fd` was opened above and is not used after this point.
        let _ = unsafe { libc::close(fd) };
        if ptr == libc::MAP_FAILED {
            return Err(format!("mmap {base:#x}+{size:#x}: {err}"));
        }

        Ok(Self {
            name: name.into(),
            ptr: ptr.cast::<u8>(),
            size,
            mapped: true,
        })
    }

    fn slot(&self, offset: u64) -> Option<*mut u32> {
        if offset % REG_WIDTH != 0 || offset.checked_add(REG_WIDTH)? > self.size {
            return None;
        }
        let offset = usize::try_from(offset).ok()?;
        // SAFETY: `offset + 4 <= size`, so the pointer stays inside the region.
        Some(unsafe { self.ptr.add(offset) }.cast::<u32>())
    }
}

impl RegisterWindow for MmioWindow {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_u32(&mut self, offset: u64) -> u32 {
        // SAFETY: `slot` only returns aligned in-range pointers.
        self.slot(offset)
            .map_or(0, |reg| unsafe { reg.read_volatile() })
    }

    fn write_u32(&mut self, offset: u64, val: u32) {
        if let Some(reg) = self.slot(offset) {
            // SAFETY: `slot` only returns aligned in-range pointers.
            unsafe { reg.write_volatile(val) };
        }
    }
}

impl Drop for MmioWindow {
    fn drop(&mut self) {
        #[cfg(unix)]
        if self.mapped {
            if let Ok(len) = usize::try_from(self.size) {
                // SAFETY: the region was mapped by `map` with this length.
                let _ = unsafe { libc::munmap(self.ptr.cast(), len) };
            }
        }
    }
}

/// Resolves window names to physical regions mapped through a memory device.
///
/// Names without a region resolve as not present.
#[derive(Debug, Clone)]
pub struct MmioResolver {
    device: PathBuf,
    regions: HashMap<String, (u64, u64)>,
}

impl MmioResolver {
    /// Creates a resolver over `device` (usually `/dev/mem`).
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            regions: HashMap::new(),
        }
    }

    /// Declares the physical `base` and `size` of window `name`.
    #[must_use]
    pub fn with_region(mut self, name: impl Into<String>, base: u64, size: u64) -> Self {
        let _ = self.regions.insert(name.into(), (base, size));
        self
    }
}

impl WindowResolver for MmioResolver {
    fn resolve(&mut self, name: &str) -> Binding {
        let Some(&(base, size)) = self.regions.get(name) else {
            return Binding::NotPresent;
        };
        #[cfg(unix)]
        {
            match MmioWindow::map(name, &self.device, base, size) {
                Ok(window) => Binding::Bound(Box::new(window)),
                Err(message) => Binding::Error(message),
            }
        }
        #[cfg(not(unix))]
        {
            Binding::Error(format!(
                "cannot map {name} at {base:#x}+{size:#x} from {}: unsupported host",
                self.device.display()
            ))
        }
    }
}
