use std::iter::Sum;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters updated on every fetch of a cell.
#[derive(Debug)]
pub struct StatsCounter {
    hits: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

impl StatsCounter {
    pub fn new() -> Self {
        StatsCounter {
            hits: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of the statistics.
    pub fn snapshot(&self) -> Metrics {
        Metrics::new(
            self.hits.load(Ordering::Relaxed),
            self.refreshes.load(Ordering::Relaxed),
            self.failures.load(Ordering::Relaxed),
        )
    }
}

impl Default for StatsCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of cache statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    /// Fetches answered from the stored value without calling `update`.
    pub hits: u64,
    /// Successful `update` calls.
    pub refreshes: u64,
    /// `update` calls that returned an error.
    pub failures: u64,
    /// `hits / (hits + refreshes)`, or `0.0` if nothing was fetched.
    pub hit_rate: f64,
}

impl Metrics {
    fn new(hits: u64, refreshes: u64, failures: u64) -> Self {
        let total = hits + refreshes;
        let hit_rate = if total == 0 {
            0.0_f64
        } else {
            hits as f64 / total as f64
        };
        Metrics {
            hits,
            refreshes,
            failures,
            hit_rate,
        }
    }

    /// Number of fetches that completed with a value or a refresh.
    pub fn fetch_count(&self) -> u64 {
        self.hits + self.refreshes
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics::new(0, 0, 0)
    }
}

impl Add for Metrics {
    type Output = Metrics;

    fn add(self, rhs: Metrics) -> Metrics {
        Metrics::new(
            self.hits + rhs.hits,
            self.refreshes + rhs.refreshes,
            self.failures + rhs.failures,
        )
    }
}

impl Sum for Metrics {
    fn sum<I: Iterator<Item = Metrics>>(iter: I) -> Metrics {
        iter.fold(Metrics::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_hit_rate() {
        let stats = StatsCounter::new();
        stats.record_refresh();
        stats.record_hit();
        stats.record_hit();
        stats.record_hit();
        stats.record_failure();

        let m = stats.snapshot();
        assert_eq!((m.hits, m.refreshes, m.failures), (3, 1, 1));
        assert_eq!(m.fetch_count(), 4);
        assert!((m.hit_rate - 0.75).abs() < 1e-9, "hit_rate = {}", m.hit_rate);
    }

    #[test]
    fn metrics_sum_recomputes_hit_rate() {
        let a = Metrics::new(1, 1, 0);
        let b = Metrics::new(3, 1, 2);
        let total: Metrics = vec![a, b].into_iter().sum();
        assert_eq!((total.hits, total.refreshes, total.failures), (4, 2, 2));
        assert!((total.hit_rate - 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn empty_sum_is_zero() {
        let total: Metrics = std::iter::empty().sum();
        assert_eq!(total, Metrics::default());
        assert_eq!(total.hit_rate, 0.0);
    }
}
