/// Mapped register windows and the memory-device resolver.
pub mod mmio;

/// Sparse register file.
pub mod register_file;
