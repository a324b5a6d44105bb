//! Convergence reduction.
//!
//! Every worker produces one "changed" bit per generation; the run keeps
//! going while the logical OR of all bits is true.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared OR-accumulator for threads in one address space.
/// Reset and read by the coordinator only while workers are parked at a
/// barrier; the barrier provides the happens-before edges.
#[derive(Debug, Default)]
pub struct ChangedFlag(AtomicBool);

impl ChangedFlag {
    pub fn new() -> Self {
        ChangedFlag(AtomicBool::new(false))
    }

    /// OR a worker's local result into the flag.
    pub fn accumulate(&self, changed: bool) {
        if changed {
            self.0.fetch_or(true, Ordering::Relaxed);
        }
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Fold local flags into the global decision.
pub fn combine<I: IntoIterator<Item = bool>>(flags: I) -> bool {
    flags.into_iter().fold(false, |acc, f| acc || f)
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn combine_is_logical_or() {
        assert!(!combine(Vec::<bool>::new()));
        assert!(!combine([false, false, false]));
        assert!(combine([false, true, false]));
        assert!(combine(vec![true]));
    }

    #[test]
    fn changed_flag_accumulates_across_threads() {
        let flag = ChangedFlag::new();
        std::thread::scope(|s| {
            for w in 0..8 {
                let flag = &flag;
                s.spawn(move || flag.accumulate(w == 5));
            }
        });
        assert!(flag.is_set());
        flag.reset();
        assert!(!flag.is_set());
        flag.accumulate(false);
        assert!(!flag.is_set());
    }
}
