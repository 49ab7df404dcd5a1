//! Environment statistics

use crate::allocator::AllocatorStats;
use serde::Serialize;

/// Running lifecycle counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub bound: u64,
    pub unbound: u64,
    /// Wrappers finalized by the collector
    pub finalized: u64,
    /// Native objects destroyed by the bridge
    pub destroyed: u64,
    /// Weak/strong transitions of wrappers
    pub ownership_flips: u64,
    pub values_disposed: u64,
    pub microtask_checkpoints: u64,
}

/// Snapshot returned by `print_statistics`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub objects: usize,
    pub bound: usize,
    pub persistent: usize,
    pub native_classes: usize,
    pub host_classes: usize,
    pub script_classes: usize,
    pub module_loaders: usize,
    pub module_resolvers: usize,
    pub timers: usize,
    pub interned_names: usize,
    pub battery_save_mode: bool,
    pub allocator: AllocatorStats,
    pub counters: Counters,
}

impl Statistics {
    /// Human-readable lines, one per figure
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("objects: {} ({} bound, {} persistent)", self.objects, self.bound, self.persistent),
            format!(
                "classes: {} native ({} host), {} script",
                self.native_classes, self.host_classes, self.script_classes
            ),
            format!("modules: {} loaders, {} resolvers", self.module_loaders, self.module_resolvers),
            format!("timers: {}", self.timers),
            format!("interned names: {}", self.interned_names),
            format!(
                "variants: {} live, {} capacity, {} pages, peak {}",
                self.allocator.live, self.allocator.capacity, self.allocator.pages, self.allocator.peak
            ),
            format!(
                "lifecycle: {} bound, {} unbound, {} finalized, {} destroyed, {} flips",
                self.counters.bound,
                self.counters.unbound,
                self.counters.finalized,
                self.counters.destroyed,
                self.counters.ownership_flips
            ),
        ]
    }
}
