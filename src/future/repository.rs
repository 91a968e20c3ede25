use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use ahash::AHashMap;

use crate::builder::RepositoryBuilder;
use crate::error::FetchError;
use crate::future::CachedValue;
use crate::metrics::stats::Metrics;
use crate::policy::{AsyncKeyedPolicy, Bound};

/// The async counterpart of
/// [`sync::CachedRepository`](crate::sync::CachedRepository).
///
/// Cells refresh independently: a slow refresh of one key never blocks a
/// fetch of another.
pub struct CachedRepository<T, P, K = String> {
    entries: AHashMap<K, CachedValue<T>>,
    policy: P,
}

impl<T, P, K> CachedRepository<T, P, K>
where
    T: Send + Sync + 'static,
    K: Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
    /// Creates a repository with one empty cell per key.
    pub fn new<I>(keys: I, policy: P) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        let entries = keys
            .into_iter()
            .map(|key| (key, CachedValue::new()))
            .collect();
        CachedRepository { entries, policy }
    }

    /// Returns a [`RepositoryBuilder`] for constructing a repository.
    pub fn builder(policy: P) -> RepositoryBuilder<P, K> {
        RepositoryBuilder::new(policy)
    }

    /// Fetches the value for `key` through the repository's policy.
    pub async fn fetch<Q>(&self, key: &Q) -> Result<Option<Arc<T>>, FetchError<P::Error>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
        P: AsyncKeyedPolicy<K, T>,
        P::Error: fmt::Display,
    {
        let (key, cell) = self
            .entries
            .get_key_value(key)
            .ok_or_else(|| FetchError::UnknownKey(format!("{key:?}")))?;

        let bound = Bound {
            key,
            policy: &self.policy,
        };
        cell.fetch(&bound).await.map_err(|err| {
            tracing::warn!(?key, error = %err, "repository refresh failed");
            FetchError::Refresh(err)
        })
    }

    /// Returns the stored value for `key` without consulting the policy.
    pub async fn peek<Q>(&self, key: &Q) -> Option<Arc<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.get(key) {
            Some(cell) => cell.peek().await,
            None => None,
        }
    }

    /// Drops the stored value for `key`. Returns `false` if the key is not
    /// registered.
    pub async fn invalidate<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        match self.entries.get(key) {
            Some(cell) => {
                tracing::debug!(?key, "invalidating repository entry");
                cell.invalidate().await;
                true
            }
            None => false,
        }
    }

    /// Drops every stored value. Keys stay registered.
    pub async fn invalidate_all(&self) {
        for cell in self.entries.values() {
            cell.invalidate().await;
        }
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Statistics summed over every cell.
    pub fn stats(&self) -> Metrics {
        self.entries.values().map(CachedValue::stats).sum()
    }
}

impl<T, P, K: fmt::Debug> fmt::Debug for CachedRepository<T, P, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedRepository")
            .field("keys", &self.entries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
