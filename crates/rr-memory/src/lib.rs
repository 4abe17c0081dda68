//! Memory access for oxidized-rr scripts
//!
//! Sized reads and writes over the host's [`MemoryBus`](rr_core::MemoryBus),
//! the write-watch table behind `memory.registerwrite`, and a flat RAM bus
//! for headless hosts and tests.

pub mod access;
pub mod flat;
pub mod watch;

pub use access::{read_range, read_sized, write_sized, AccessWidth};
pub use flat::{Endianness, FlatMemory};
pub use watch::{WatchEntry, WriteWatchTable};
