use loopscope_host::Address;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic per-routine counter. Existing entries are bumped under a shared
/// lock; the map is only write-locked the first time a routine is seen.
#[derive(Debug, Default)]
struct CounterMap(RwLock<HashMap<Address, AtomicU64>>);

impl CounterMap {
    fn add(&self, key: Address, n: u64) {
        if let Some(c) = self.0.read().get(&key) {
            c.fetch_add(n, Ordering::Relaxed);
            return;
        }
        self.0
            .write()
            .entry(key)
            .or_default()
            .fetch_add(n, Ordering::Relaxed);
    }

    fn get(&self, key: Address) -> u64 {
        self.0
            .read()
            .get(&key)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or_default()
    }
}

/// Executed instructions and calls, per routine start address
#[derive(Debug, Default)]
pub struct RoutineAccounting {
    instructions: CounterMap,
    calls: CounterMap,
}

impl RoutineAccounting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `n` executed instructions to `routine`; called once per block entry
    pub fn add_instructions(&self, routine: Address, n: u64) {
        self.instructions.add(routine, n)
    }

    pub fn record_call(&self, routine: Address) {
        self.calls.add(routine, 1)
    }

    pub fn instructions(&self, routine: Address) -> u64 {
        self.instructions.get(routine)
    }

    pub fn calls(&self, routine: Address) -> u64 {
        self.calls.get(routine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn unknown_routines_are_zero() {
        let acc = RoutineAccounting::new();
        assert_eq!(acc.instructions(0x1234), 0);
        assert_eq!(acc.calls(0x1234), 0);
    }

    #[test]
    fn totals_are_sums() {
        let acc = RoutineAccounting::new();
        acc.add_instructions(0x10, 4);
        acc.add_instructions(0x10, 3);
        acc.add_instructions(0x20, 1);
        acc.record_call(0x10);
        acc.record_call(0x10);
        assert_eq!(acc.instructions(0x10), 7);
        assert_eq!(acc.instructions(0x20), 1);
        assert_eq!(acc.calls(0x10), 2);
        assert_eq!(acc.calls(0x20), 0);
    }

    #[test]
    fn concurrent_counting() {
        let acc = RoutineAccounting::new();
        thread::scope(|s| {
            for t in 0..4u64 {
                let acc = &acc;
                s.spawn(move || {
                    for _ in 0..500 {
                        acc.add_instructions(0x10, 2);
                        acc.record_call(0x100 + t);
                    }
                });
            }
        });
        assert_eq!(acc.instructions(0x10), 4000);
        for t in 0..4 {
            assert_eq!(acc.calls(0x100 + t), 500);
        }
    }
}
