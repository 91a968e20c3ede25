pub mod rule;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entry::Entry;
pub use rule::{Always, FnRule, Invalidation, TimeThreshold, UsageThreshold, WhenAbsent};

/// Decides when a cached value is stale and how to produce a new one.
///
/// Both methods are called by [`sync::CachedValue::fetch`] while it holds the
/// cell's lock, so `update` never runs twice concurrently for one cell.
///
/// [`sync::CachedValue::fetch`]: crate::sync::CachedValue::fetch
pub trait CachePolicy<T>: Send + Sync {
    type Error;

    /// Returns `true` if `current` must be replaced. `None` means the cell
    /// holds no value yet.
    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool;

    /// Computes the replacement value. May block (network, disk).
    fn update(&self, current: Option<Arc<T>>) -> Result<T, Self::Error>;
}

/// The async counterpart of [`CachePolicy`], used by [`future::CachedValue`].
///
/// [`future::CachedValue`]: crate::future::CachedValue
#[async_trait]
pub trait AsyncCachePolicy<T: Send + Sync + 'static>: Send + Sync {
    type Error: Send;

    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool;

    async fn update(&self, current: Option<Arc<T>>) -> Result<T, Self::Error>;
}

/// A policy shared by all cells of a repository. Receives the key of the
/// cell being fetched.
pub trait KeyedPolicy<K, T>: Send + Sync {
    type Error;

    fn should_invalidate(&self, key: &K, current: Option<&Entry<T>>) -> bool;

    fn update(&self, key: &K, current: Option<Arc<T>>) -> Result<T, Self::Error>;
}

/// The async counterpart of [`KeyedPolicy`].
#[async_trait]
pub trait AsyncKeyedPolicy<K, T>: Send + Sync
where
    K: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    type Error: Send;

    fn should_invalidate(&self, key: &K, current: Option<&Entry<T>>) -> bool;

    async fn update(&self, key: &K, current: Option<Arc<T>>) -> Result<T, Self::Error>;
}

// ---------------------------------------------------------------------------
// Policy: rule + updater
// ---------------------------------------------------------------------------

/// An [`Invalidation`] rule paired with an updater closure.
///
/// Which policy traits `Policy` implements depends on the updater's shape:
///
/// | updater                                 | implements           |
/// |-----------------------------------------|----------------------|
/// | `Fn() -> Result<T, E>`                  | [`CachePolicy`]      |
/// | `Fn() -> impl Future<Output = Result<T, E>>` | [`AsyncCachePolicy`] |
/// | `Fn(&K) -> Result<T, E>`                | [`KeyedPolicy`]      |
/// | `Fn(&K) -> impl Future<Output = Result<T, E>>` | [`AsyncKeyedPolicy`] |
///
/// # Example
/// ```
/// use lungo::policy::{Policy, UsageThreshold};
/// use lungo::sync::CachedValue;
///
/// let policy = Policy::new(UsageThreshold::new(5), || Ok::<_, std::io::Error>(42u32));
/// let cell = CachedValue::new();
/// assert_eq!(cell.fetch(&policy).unwrap().as_deref(), Some(&42));
/// ```
pub struct Policy<R, U> {
    rule: R,
    updater: U,
}

impl<R, U> Policy<R, U> {
    pub fn new(rule: R, updater: U) -> Self {
        Policy { rule, updater }
    }

    pub fn rule(&self) -> &R {
        &self.rule
    }
}

impl<T, R, U, E> CachePolicy<T> for Policy<R, U>
where
    R: Invalidation<T>,
    U: Fn() -> Result<T, E> + Send + Sync,
{
    type Error = E;

    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool {
        self.rule.should_invalidate(current)
    }

    fn update(&self, _current: Option<Arc<T>>) -> Result<T, E> {
        (self.updater)()
    }
}

#[async_trait]
impl<T, R, U, Fut, E> AsyncCachePolicy<T> for Policy<R, U>
where
    T: Send + Sync + 'static,
    R: Invalidation<T>,
    U: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Send + 'static,
{
    type Error = E;

    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool {
        self.rule.should_invalidate(current)
    }

    async fn update(&self, _current: Option<Arc<T>>) -> Result<T, E> {
        (self.updater)().await
    }
}

impl<K, T, R, U, E> KeyedPolicy<K, T> for Policy<R, U>
where
    R: Invalidation<T>,
    U: Fn(&K) -> Result<T, E> + Send + Sync,
{
    type Error = E;

    fn should_invalidate(&self, _key: &K, current: Option<&Entry<T>>) -> bool {
        self.rule.should_invalidate(current)
    }

    fn update(&self, key: &K, _current: Option<Arc<T>>) -> Result<T, E> {
        (self.updater)(key)
    }
}

#[async_trait]
impl<K, T, R, U, Fut, E> AsyncKeyedPolicy<K, T> for Policy<R, U>
where
    K: Send + Sync + 'static,
    T: Send + Sync + 'static,
    R: Invalidation<T>,
    U: Fn(&K) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    E: Send + 'static,
{
    type Error = E;

    fn should_invalidate(&self, _key: &K, current: Option<&Entry<T>>) -> bool {
        self.rule.should_invalidate(current)
    }

    async fn update(&self, key: &K, _current: Option<Arc<T>>) -> Result<T, E> {
        (self.updater)(key).await
    }
}

// ---------------------------------------------------------------------------
// Shared: key-agnostic policy used as a keyed one
// ---------------------------------------------------------------------------

/// Lets a key-agnostic policy drive a repository. The key is ignored.
///
/// Created via [`RepositoryBuilder::shared`](crate::RepositoryBuilder::shared).
pub struct Shared<P>(pub P);

impl<K, T, P> KeyedPolicy<K, T> for Shared<P>
where
    P: CachePolicy<T>,
{
    type Error = P::Error;

    fn should_invalidate(&self, _key: &K, current: Option<&Entry<T>>) -> bool {
        self.0.should_invalidate(current)
    }

    fn update(&self, _key: &K, current: Option<Arc<T>>) -> Result<T, P::Error> {
        self.0.update(current)
    }
}

#[async_trait]
impl<K, T, P> AsyncKeyedPolicy<K, T> for Shared<P>
where
    K: Send + Sync + 'static,
    T: Send + Sync + 'static,
    P: AsyncCachePolicy<T>,
{
    type Error = P::Error;

    fn should_invalidate(&self, _key: &K, current: Option<&Entry<T>>) -> bool {
        self.0.should_invalidate(current)
    }

    async fn update(&self, _key: &K, current: Option<Arc<T>>) -> Result<T, P::Error> {
        self.0.update(current).await
    }
}

// ---------------------------------------------------------------------------
// Bound: keyed policy fixed to one key
// ---------------------------------------------------------------------------

/// A keyed policy bound to the key of the cell being fetched, so repositories
/// can hand it to a cell's `fetch`.
pub(crate) struct Bound<'a, K, P> {
    pub(crate) key: &'a K,
    pub(crate) policy: &'a P,
}

impl<K, T, P> CachePolicy<T> for Bound<'_, K, P>
where
    K: Sync,
    P: KeyedPolicy<K, T>,
{
    type Error = P::Error;

    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool {
        self.policy.should_invalidate(self.key, current)
    }

    fn update(&self, current: Option<Arc<T>>) -> Result<T, P::Error> {
        self.policy.update(self.key, current)
    }
}

#[async_trait]
impl<'a, K, T, P> AsyncCachePolicy<T> for Bound<'a, K, P>
where
    K: Send + Sync + 'static,
    T: Send + Sync + 'static,
    P: AsyncKeyedPolicy<K, T>,
{
    type Error = P::Error;

    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool {
        self.policy.should_invalidate(self.key, current)
    }

    async fn update(&self, current: Option<Arc<T>>) -> Result<T, P::Error> {
        self.policy.update(self.key, current).await
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[test]
    fn policy_delegates_to_rule_and_updater() {
        let calls = AtomicU64::new(0);
        let policy = Policy::new(WhenAbsent, || {
            Ok::<_, Infallible>(calls.fetch_add(1, Ordering::Relaxed))
        });

        assert!(CachePolicy::<u64>::should_invalidate(&policy, None));
        assert!(!CachePolicy::should_invalidate(&policy, Some(&Entry::new(7u64))));
        assert_eq!(CachePolicy::update(&policy, None), Ok(0));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn keyed_updater_sees_the_key() {
        let policy = Policy::new(Always, |key: &String| Ok::<_, Infallible>(key.len()));
        assert_eq!(KeyedPolicy::update(&policy, &"four".to_string(), None), Ok(4));
    }

    #[test]
    fn shared_ignores_the_key() {
        let policy = Shared(Policy::new(Always, || Ok::<_, Infallible>("same")));
        assert_eq!(KeyedPolicy::update(&policy, &1u8, None), Ok("same"));
        assert_eq!(KeyedPolicy::update(&policy, &2u8, None), Ok("same"));
    }

    #[tokio::test]
    async fn async_updater_is_awaited() {
        let policy = Policy::new(Always, || async { Ok::<_, Infallible>(3u8) });
        assert_eq!(AsyncCachePolicy::update(&policy, None).await, Ok(3));
    }
}
