use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::entry::Entry;
use crate::metrics::stats::{Metrics, StatsCounter};
use crate::policy::CachePolicy;

/// A single cached value, refreshed on demand by a [`CachePolicy`].
///
/// The cell starts empty. [`fetch`](CachedValue::fetch) asks the policy
/// whether the stored value is stale and, if so, runs `update` while holding
/// the cell's lock: concurrent fetches wait for that one refresh instead of
/// starting their own.
///
/// # Example
/// ```
/// use lungo::policy::{Policy, WhenAbsent};
/// use lungo::sync::CachedValue;
///
/// let news: CachedValue<Vec<String>> = CachedValue::new();
/// let policy = Policy::new(WhenAbsent, || {
///     Ok::<_, std::io::Error>(vec!["News 1".to_string(), "News 2".to_string()])
/// });
///
/// let first = news.fetch(&policy).unwrap().unwrap();
/// let second = news.fetch(&policy).unwrap().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// ```
pub struct CachedValue<T> {
    slot: Mutex<Option<Entry<T>>>,
    stats: StatsCounter,
}

impl<T> CachedValue<T> {
    pub fn new() -> Self {
        CachedValue {
            slot: Mutex::new(None),
            stats: StatsCounter::new(),
        }
    }

    /// Returns the current value, refreshing it first if `policy` decides the
    /// stored value (or its absence) must be invalidated.
    ///
    /// The invalidation check, `update` and the returned value's use count
    /// all happen under one lock acquisition. `Ok(None)` means the cell is
    /// empty and the policy declined to fill it.
    ///
    /// If `update` fails the error is returned and the stored value is left
    /// as it was.
    pub fn fetch<P>(&self, policy: &P) -> Result<Option<Arc<T>>, P::Error>
    where
        P: CachePolicy<T> + ?Sized,
    {
        let mut slot = self.slot.lock();
        if policy.should_invalidate(slot.as_ref()) {
            tracing::debug!(empty = slot.is_none(), "refreshing cached value");
            let current = slot.as_ref().map(Entry::value_arc);
            match policy.update(current) {
                Ok(value) => {
                    *slot = Some(Entry::new(value));
                    self.stats.record_refresh();
                    tracing::debug!("cached value refreshed");
                }
                Err(err) => {
                    tracing::debug!("cached value refresh failed");
                    self.stats.record_failure();
                    return Err(err);
                }
            }
        } else {
            tracing::trace!("cached value is fresh");
            self.stats.record_hit();
        }

        // The use is counted in the same hold as the decision, so concurrent
        // callers cannot both pass a usage check on one remaining use.
        Ok(slot.as_mut().map(Entry::serve))
    }

    /// Returns the stored value without consulting a policy. Does not count
    /// as a use.
    pub fn peek(&self) -> Option<Arc<T>> {
        self.slot.lock().as_ref().map(Entry::value_arc)
    }

    /// Drops the stored value. The next fetch sees an empty cell.
    pub fn invalidate(&self) -> Option<Arc<T>> {
        self.slot.lock().take().map(|entry| entry.value_arc())
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }

    pub fn stats(&self) -> Metrics {
        self.stats.snapshot()
    }
}

impl<T> Default for CachedValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for CachedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedValue")
            .field("value", &self.peek())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::policy::{Always, FnRule, Policy, WhenAbsent};

    #[test]
    fn empty_cell_with_declining_policy_returns_none() {
        let cell: CachedValue<u32> = CachedValue::new();
        let policy = Policy::new(FnRule(|_: Option<&Entry<u32>>| false), || {
            Ok::<_, Infallible>(1)
        });
        assert_eq!(cell.fetch(&policy), Ok(None));
        assert!(cell.is_empty());
    }

    #[test]
    fn update_sees_previous_value() {
        struct Increment;

        impl CachePolicy<u32> for Increment {
            type Error = Infallible;

            fn should_invalidate(&self, _current: Option<&Entry<u32>>) -> bool {
                true
            }

            fn update(&self, current: Option<Arc<u32>>) -> Result<u32, Infallible> {
                Ok(current.map_or(0, |v| *v + 1))
            }
        }

        let cell = CachedValue::new();
        assert_eq!(cell.fetch(&Increment).unwrap().as_deref(), Some(&0));
        assert_eq!(cell.fetch(&Increment).unwrap().as_deref(), Some(&1));
        assert_eq!(cell.fetch(&Increment).unwrap().as_deref(), Some(&2));
    }

    #[test]
    fn peek_does_not_count_as_use() {
        let cell = CachedValue::new();
        let policy = Policy::new(WhenAbsent, || Ok::<_, Infallible>(9u8));
        assert_eq!(cell.peek(), None);
        cell.fetch(&policy).unwrap();
        assert_eq!(cell.peek().as_deref(), Some(&9));
        assert_eq!(cell.slot.lock().as_ref().map(Entry::uses), Some(1));
    }

    #[test]
    fn invalidate_forces_next_refresh() {
        let calls = AtomicU32::new(0);
        let cell = CachedValue::new();
        let policy = Policy::new(WhenAbsent, || {
            Ok::<_, Infallible>(calls.fetch_add(1, Ordering::Relaxed))
        });

        assert_eq!(cell.fetch(&policy).unwrap().as_deref(), Some(&0));
        assert_eq!(cell.invalidate().as_deref(), Some(&0));
        assert!(cell.is_empty());
        assert_eq!(cell.fetch(&policy).unwrap().as_deref(), Some(&1));
    }

    #[test]
    fn stats_count_hits_and_refreshes() {
        let cell = CachedValue::new();
        let policy = Policy::new(Always, || Ok::<_, Infallible>(()));
        cell.fetch(&policy).unwrap();
        cell.fetch(&policy).unwrap();
        let stats = cell.stats();
        assert_eq!((stats.hits, stats.refreshes), (0, 2));
    }
}
