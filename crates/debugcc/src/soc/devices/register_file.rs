//! Sparse in-memory register window.
//!
//! A [`RegisterFile`] behaves like a block of 32-bit registers that all reset to zero.
//! Only written registers occupy memory. Accesses outside the window read as 0 and
//! drop writes, like an unclaimed region of a real bus.

use std::collections::HashMap;

use crate::soc::traits::RegisterWindow;

/// A named, sparse block of 32-bit registers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    name: String,
    size: u64,
    regs: HashMap<u64, u32>,
    reads: u64,
    writes: u64,
}

impl RegisterFile {
    /// Creates a zeroed window of `size` bytes.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            ..Self::default()
        }
    }

    /// Reads a register without counting the access.
    pub fn peek(&self, offset: u64) -> u32 {
        self.regs.get(&offset).copied().unwrap_or(0)
    }

    /// Writes a register without counting the access.
    pub fn poke(&mut self, offset: u64, val: u32) {
        if offset < self.size {
            let _ = self.regs.insert(offset, val);
        }
    }

    /// Number of reads through [`RegisterWindow::read_u32`].
    pub const fn reads(&self) -> u64 {
        self.reads
    }

    /// Number of writes through [`RegisterWindow::write_u32`].
    pub const fn writes(&self) -> u64 {
        self.writes
    }

    /// Total counted accesses.
    pub const fn accesses(&self) -> u64 {
        self.reads + self.writes
    }
}

impl RegisterWindow for RegisterFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read_u32(&mut self, offset: u64) -> u32 {
        self.reads += 1;
        self.peek(offset)
    }

    fn write_u32(&mut self, offset: u64, val: u32) {
        self.writes += 1;
        self.poke(offset, val);
    }
}
