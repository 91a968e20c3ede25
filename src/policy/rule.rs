//! Invalidation rules: the pure half of a cache policy.
//!
//! A rule only looks at the current [`Entry`] (its value, age and how often
//! it has been served) and keeps no state of its own, so one rule can be
//! shared by any number of cells.
//!
//! # Example
//! ```
//! use lungo::policy::{Invalidation, TimeThreshold};
//! use std::time::Duration;
//!
//! // Refresh every 30 seconds, or immediately once the list is empty.
//! let rule = TimeThreshold::new(Duration::from_secs(30))
//!     .or_when(|news: &Vec<String>| news.is_empty());
//! assert!(rule.should_invalidate(None));
//! ```

use std::time::Duration;

use crate::entry::Entry;

/// Decides whether the current entry of a cell must be replaced.
///
/// `None` means the cell holds no value yet.
pub trait Invalidation<T>: Send + Sync {
    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool;
}

// ---------------------------------------------------------------------------
// Built-in rules
// ---------------------------------------------------------------------------

/// Every fetch refreshes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Always;

impl<T> Invalidation<T> for Always {
    #[inline]
    fn should_invalidate(&self, _current: Option<&Entry<T>>) -> bool {
        true
    }
}

/// Refreshes only when the cell is empty: the first fetch computes the value,
/// every later fetch returns it.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhenAbsent;

impl<T> Invalidation<T> for WhenAbsent {
    #[inline]
    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool {
        current.is_none()
    }
}

/// A value is returned by at most `threshold` fetches; the fetch after that
/// refreshes it.
///
/// With `threshold = 2`, fetches 1, 3, 5, ... refresh. A threshold of 0
/// refreshes on every fetch.
#[derive(Clone, Copy, Debug)]
pub struct UsageThreshold {
    threshold: u64,
}

impl UsageThreshold {
    pub fn new(threshold: u64) -> Self {
        UsageThreshold { threshold }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }
}

impl<T> Invalidation<T> for UsageThreshold {
    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool {
        current.map_or(true, |entry| entry.uses() >= self.threshold)
    }
}

/// Refreshes once the value is `threshold` old, or earlier when the optional
/// extra criterion (see [`TimeThreshold::or_when`]) says the value is stale.
pub struct TimeThreshold<T> {
    threshold: Duration,
    criteria: Option<Box<dyn Fn(&T) -> bool + Send + Sync>>,
}

impl<T> TimeThreshold<T> {
    pub fn new(threshold: Duration) -> Self {
        TimeThreshold {
            threshold,
            criteria: None,
        }
    }

    /// Adds an extra refresh criterion evaluated against the cached value.
    pub fn or_when<F>(mut self, criteria: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.criteria = Some(Box::new(criteria));
        self
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

impl<T> Invalidation<T> for TimeThreshold<T> {
    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool {
        let Some(entry) = current else { return true };
        if entry.age() >= self.threshold {
            return true;
        }
        self.criteria
            .as_ref()
            .is_some_and(|criteria| criteria(entry.value()))
    }
}

/// A rule backed by a closure.
pub struct FnRule<F>(pub F);

impl<T, F> Invalidation<T> for FnRule<F>
where
    F: Fn(Option<&Entry<T>>) -> bool + Send + Sync,
{
    #[inline]
    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool {
        (self.0)(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn served(value: u32, times: u64) -> Entry<u32> {
        let mut entry = Entry::new(value);
        for _ in 0..times {
            entry.serve();
        }
        entry
    }

    #[test]
    fn when_absent_only_fires_on_empty_cell() {
        assert!(Invalidation::<u32>::should_invalidate(&WhenAbsent, None));
        assert!(!WhenAbsent.should_invalidate(Some(&served(1, 100))));
    }

    #[test]
    fn usage_threshold_boundary() {
        let rule = UsageThreshold::new(2);
        assert!(Invalidation::<u32>::should_invalidate(&rule, None));
        assert!(!rule.should_invalidate(Some(&served(1, 1))));
        assert!(rule.should_invalidate(Some(&served(1, 2))));
    }

    #[test]
    fn usage_threshold_zero_always_refreshes() {
        let rule = UsageThreshold::new(0);
        assert!(rule.should_invalidate(Some(&served(1, 0))));
    }

    #[tokio::test(start_paused = true)]
    async fn time_threshold_fires_after_threshold() {
        let rule = TimeThreshold::new(Duration::from_millis(100));
        let entry = Entry::new(5u32);
        assert!(!rule.should_invalidate(Some(&entry)));

        tokio::time::advance(Duration::from_millis(99)).await;
        assert!(!rule.should_invalidate(Some(&entry)));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(rule.should_invalidate(Some(&entry)));
    }

    #[test]
    fn time_threshold_extra_criteria() {
        let rule = TimeThreshold::new(Duration::from_secs(3600)).or_when(|v: &u32| *v == 0);
        assert!(!rule.should_invalidate(Some(&Entry::new(1))));
        assert!(rule.should_invalidate(Some(&Entry::new(0))));
        assert!(rule.should_invalidate(None));
    }

    #[test]
    fn fn_rule_wraps_closure() {
        let rule = FnRule(|current: Option<&Entry<u32>>| current.map_or(true, |e| *e.value() > 10));
        assert!(!rule.should_invalidate(Some(&Entry::new(3))));
        assert!(rule.should_invalidate(Some(&Entry::new(11))));
    }
}
