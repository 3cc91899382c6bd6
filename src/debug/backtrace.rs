//! Allocation backtrace tracking.
//!
//! Records where each live free-list allocation came from so a scope
//! destroyed with live allocations can say who leaked.

use std::collections::HashMap;

/// A captured backtrace for a live allocation.
#[derive(Clone, Debug)]
pub struct AllocationTrace {
    /// Address handed to the caller.
    pub address: usize,

    /// Size requested by the caller.
    pub size: usize,

    /// Captured backtrace, already formatted.
    pub backtrace: String,

    /// Allocation sequence number within the owning scope.
    pub sequence: u64,
}

/// Tracker for live allocations of a single scope.
#[derive(Default)]
pub struct AllocationTracker {
    traces: HashMap<usize, AllocationTrace>,
    sequence: u64,
}

impl AllocationTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an allocation with its backtrace.
    pub fn record_alloc(&mut self, address: usize, size: usize) {
        let trace = AllocationTrace {
            address,
            size,
            backtrace: format!("{:?}", ::backtrace::Backtrace::new()),
            sequence: self.sequence,
        };
        self.sequence += 1;
        self.traces.insert(address, trace);
    }

    /// Forget an allocation. Returns false if the address was not live.
    pub fn record_free(&mut self, address: usize) -> bool {
        self.traces.remove(&address).is_some()
    }

    /// Get the trace for an address (if live).
    pub fn get_trace(&self, address: usize) -> Option<&AllocationTrace> {
        self.traces.get(&address)
    }

    /// Number of live allocations.
    pub fn live_count(&self) -> usize {
        self.traces.len()
    }

    /// Log every live allocation, oldest first.
    pub fn log_leak_report(&self) {
        let mut live: Vec<&AllocationTrace> = self.traces.values().collect();
        live.sort_by_key(|t| t.sequence);

        for trace in live {
            log::warn!(
                target: "scopealloc",
                "leaked allocation #{} at 0x{:x} ({} bytes)\n{}",
                trace.sequence,
                trace.address,
                trace.size,
                trace.backtrace
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_live_allocations() {
        let mut tracker = AllocationTracker::new();
        tracker.record_alloc(0x1000, 64);
        tracker.record_alloc(0x2000, 32);

        assert_eq!(tracker.live_count(), 2);
        assert_eq!(tracker.get_trace(0x2000).map(|t| t.sequence), Some(1));

        assert!(tracker.record_free(0x1000));
        assert!(!tracker.record_free(0x1000));
        assert_eq!(tracker.live_count(), 1);
    }
}
