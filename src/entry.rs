use std::sync::Arc;

use crate::time::{Duration, Instant};

/// A value stored in a cache cell, together with the bookkeeping the cell
/// keeps for it.
///
/// Policies see the current entry (or `None` when the cell is empty) when
/// deciding whether to invalidate.
#[derive(Debug)]
pub struct Entry<T> {
    value: Arc<T>,
    refreshed_at: Instant,
    /// Number of fetches that returned this value.
    uses: u64,
}

impl<T> Entry<T> {
    pub(crate) fn new(value: T) -> Self {
        Entry {
            value: Arc::new(value),
            refreshed_at: Instant::now(),
            uses: 0,
        }
    }

    /// The cached value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// A shared handle to the cached value.
    pub fn value_arc(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }

    /// When the policy's `update` produced this value.
    pub fn refreshed_at(&self) -> Instant {
        self.refreshed_at
    }

    /// Time elapsed since the value was produced.
    pub fn age(&self) -> Duration {
        self.refreshed_at.elapsed()
    }

    /// How many fetches have returned this value so far.
    pub fn uses(&self) -> u64 {
        self.uses
    }

    /// Records one more fetch returning this value.
    #[inline]
    pub(crate) fn serve(&mut self) -> Arc<T> {
        self.uses += 1;
        Arc::clone(&self.value)
    }
}
