use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::entry::Entry;
use crate::metrics::stats::{Metrics, StatsCounter};
use crate::policy::AsyncCachePolicy;

/// The async counterpart of [`sync::CachedValue`](crate::sync::CachedValue).
///
/// # Example
/// ```
/// use lungo::future::CachedValue;
/// use lungo::policy::{Policy, UsageThreshold};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cell = CachedValue::new();
/// let policy = Policy::new(UsageThreshold::new(5), || async {
///     Ok::<_, std::io::Error>("fresh".to_string())
/// });
/// let value = cell.fetch(&policy).await.unwrap();
/// assert_eq!(value.as_deref().map(String::as_str), Some("fresh"));
/// # }
/// ```
pub struct CachedValue<T> {
    slot: Mutex<Option<Entry<T>>>,
    stats: StatsCounter,
}

impl<T> CachedValue<T>
where
    T: Send + Sync + 'static,
{
    pub fn new() -> Self {
        CachedValue {
            slot: Mutex::new(None),
            stats: StatsCounter::new(),
        }
    }

    /// Returns the current value, refreshing it first if `policy` decides the
    /// stored value (or its absence) must be invalidated.
    ///
    /// Callers that arrive while a refresh is in flight wait for it to finish
    /// and then re-evaluate the policy against the refreshed value.
    ///
    /// If `update` fails the error is returned and the stored value is left
    /// as it was.
    pub async fn fetch<P>(&self, policy: &P) -> Result<Option<Arc<T>>, P::Error>
    where
        P: AsyncCachePolicy<T> + ?Sized,
    {
        let mut slot = self.slot.lock().await;
        if policy.should_invalidate(slot.as_ref()) {
            tracing::debug!(empty = slot.is_none(), "refreshing cached value");
            let current = slot.as_ref().map(Entry::value_arc);
            match policy.update(current).await {
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

    /// Returns the stored value without consulting a policy. Waits for an
    /// in-flight refresh.
    pub async fn peek(&self) -> Option<Arc<T>> {
        self.slot.lock().await.as_ref().map(Entry::value_arc)
    }

    /// Drops the stored value. The next fetch sees an empty cell.
    pub async fn invalidate(&self) -> Option<Arc<T>> {
        self.slot.lock().await.take().map(|entry| entry.value_arc())
    }

    pub fn stats(&self) -> Metrics {
        self.stats.snapshot()
    }
}

impl<T> Default for CachedValue<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CachedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedValue")
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::policy::{Policy, WhenAbsent};

    #[tokio::test]
    async fn failed_refresh_keeps_previous_value() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);
        let policy = Policy::new(crate::policy::Always, move || {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            async move {
                if n == 0 {
                    Ok(n)
                } else {
                    Err("backend down")
                }
            }
        });

        let cell = CachedValue::new();
        assert_eq!(cell.fetch(&policy).await.unwrap().as_deref(), Some(&0));
        assert_eq!(cell.fetch(&policy).await, Err("backend down"));
        assert_eq!(cell.peek().await.as_deref(), Some(&0));
        assert_eq!(cell.stats().failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waiting_callers_reuse_the_in_flight_refresh() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let policy = Policy::new(WhenAbsent, move || {
            let n = counter.fetch_add(1, Ordering::Relaxed);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok::<_, Infallible>(n)
            }
        });

        let cell = CachedValue::new();
        let (a, b, c) = futures::join!(
            cell.fetch(&policy),
            cell.fetch(&policy),
            cell.fetch(&policy)
        );
        assert_eq!(
            (a.unwrap(), b.unwrap(), c.unwrap()),
            (Some(Arc::new(0)), Some(Arc::new(0)), Some(Arc::new(0)))
        );
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
