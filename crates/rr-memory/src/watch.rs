//! Write watches
//!
//! Each watched address keeps the callback to run and the last byte value
//! the scan observed there. The host reports writes after they commit; the
//! scan compares every watched byte against its stored value and hands back
//! the callbacks whose byte changed.

use std::collections::BTreeMap;

/// One watched address
#[derive(Debug, Clone)]
pub struct WatchEntry<C> {
    pub callback: C,
    pub last_value: u8,
}

/// Table of write watches, generic over the callback handle
#[derive(Debug)]
pub struct WriteWatchTable<C> {
    entries: BTreeMap<u32, WatchEntry<C>>,
    /// Set by the first registration; the scan is skipped until then
    in_use: bool,
}

impl<C: Clone> WriteWatchTable<C> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            in_use: false,
        }
    }

    /// Register `callback` for `addr`, priming the stored value with the
    /// byte currently there. `None` removes the watch.
    pub fn register(&mut self, addr: u32, callback: Option<C>, current: u8) {
        match callback {
            Some(callback) => {
                self.entries.insert(
                    addr,
                    WatchEntry {
                        callback,
                        last_value: current,
                    },
                );
                if !self.in_use {
                    tracing::debug!("Memory write watches enabled");
                }
                self.in_use = true;
            }
            None => {
                self.entries.remove(&addr);
            }
        }
    }

    /// Whether any watch was registered since the last reset
    pub fn in_use(&self) -> bool {
        self.in_use
    }

    /// Addresses to check in this scan.
    ///
    /// Callbacks run between calls to [`WriteWatchTable::observe`] and may
    /// register or remove watches, so the scan walks this copy instead of
    /// the live table.
    pub fn snapshot(&self) -> Vec<u32> {
        self.entries.keys().copied().collect()
    }

    /// Compare `current` against the stored value for `addr`. On a change
    /// the stored value is updated and the callback returned. Addresses
    /// removed since the snapshot yield `None`.
    pub fn observe(&mut self, addr: u32, current: u8) -> Option<C> {
        let entry = self.entries.get_mut(&addr)?;
        if entry.last_value == current {
            return None;
        }
        entry.last_value = current;
        Some(entry.callback.clone())
    }

    pub fn get(&self, addr: u32) -> Option<&WatchEntry<C>> {
        self.entries.get(&addr)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Drop every watch and close the gate
    pub fn clear(&mut self) {
        self.entries.clear();
        self.in_use = false;
    }
}

impl<C: Clone> Default for WriteWatchTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
