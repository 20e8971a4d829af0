//! Global atomic counters for engine observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single `tracing::info!`
//! event (e.g. at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters — no allocations, no locking.
pub struct Metrics {
    checks_dispatched: AtomicU64,
    checks_finished: AtomicU64,
    checks_failed: AtomicU64,
    targets_rewritten: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            checks_dispatched: AtomicU64::new(0),
            checks_finished: AtomicU64::new(0),
            checks_failed: AtomicU64::new(0),
            targets_rewritten: AtomicU64::new(0),
        }
    }

    pub fn inc_checks_dispatched(&self) {
        self.checks_dispatched.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "checks_dispatched", "counter incremented");
    }

    pub fn inc_checks_finished(&self) {
        self.checks_finished.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "checks_finished", "counter incremented");
    }

    pub fn inc_checks_failed(&self) {
        self.checks_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "checks_failed", "counter incremented");
    }

    pub fn inc_targets_rewritten(&self) {
        self.targets_rewritten.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "targets_rewritten", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            checks_dispatched = self.checks_dispatched(),
            checks_finished = self.checks_finished(),
            checks_failed = self.checks_failed(),
            targets_rewritten = self.targets_rewritten(),
        );
    }

    pub fn checks_dispatched(&self) -> u64 {
        self.checks_dispatched.load(Ordering::Relaxed)
    }

    pub fn checks_finished(&self) -> u64 {
        self.checks_finished.load(Ordering::Relaxed)
    }

    pub fn checks_failed(&self) -> u64 {
        self.checks_failed.load(Ordering::Relaxed)
    }

    pub fn targets_rewritten(&self) -> u64 {
        self.targets_rewritten.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.checks_dispatched.store(0, Ordering::Relaxed);
        self.checks_finished.store(0, Ordering::Relaxed);
        self.checks_failed.store(0, Ordering::Relaxed);
        self.targets_rewritten.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        m.inc_checks_dispatched();
        m.inc_checks_dispatched();
        assert_eq!(m.checks_dispatched(), 2);

        m.inc_checks_finished();
        assert_eq!(m.checks_finished(), 1);

        m.inc_checks_failed();
        m.inc_checks_failed();
        assert_eq!(m.checks_failed(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_checks_dispatched();
        m.inc_checks_failed();
        m.reset();
        assert_eq!(m.checks_dispatched(), 0);
        assert_eq!(m.checks_failed(), 0);
    }
}
