use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use ahash::AHashMap;

use crate::builder::RepositoryBuilder;
use crate::error::FetchError;
use crate::metrics::stats::Metrics;
use crate::policy::{Bound, KeyedPolicy};
use crate::sync::CachedValue;

/// A fixed set of independent [`CachedValue`] cells, one per key, all driven
/// by one shared [`KeyedPolicy`].
///
/// Keys are registered up front; fetching an unknown key is an error rather
/// than creating a cell on demand.
///
/// # Example
/// ```
/// use lungo::policy::{Policy, WhenAbsent};
/// use lungo::RepositoryBuilder;
///
/// let repo: lungo::sync::CachedRepository<String, _> =
///     RepositoryBuilder::new(Policy::new(WhenAbsent, |key: &String| {
///         Ok::<_, std::io::Error>(key.to_uppercase())
///     }))
///     .keys(["alpha", "beta"].map(String::from))
///     .build();
///
/// assert_eq!(repo.fetch("alpha").unwrap().as_deref().map(String::as_str), Some("ALPHA"));
/// assert!(repo.fetch("gamma").is_err());
/// ```
pub struct CachedRepository<T, P, K = String> {
    entries: AHashMap<K, CachedValue<T>>,
    policy: P,
}

impl<T, P, K> CachedRepository<T, P, K>
where
    K: Hash + Eq + fmt::Debug,
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
    pub fn fetch<Q>(&self, key: &Q) -> Result<Option<Arc<T>>, FetchError<P::Error>>
    where
        K: Borrow<Q> + Sync,
        Q: Hash + Eq + fmt::Debug + ?Sized,
        P: KeyedPolicy<K, T>,
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
        cell.fetch(&bound).map_err(|err| {
            tracing::warn!(?key, error = %err, "repository refresh failed");
            FetchError::Refresh(err)
        })
    }

    /// Returns the stored value for `key` without consulting the policy.
    pub fn peek<Q>(&self, key: &Q) -> Option<Arc<T>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key).and_then(CachedValue::peek)
    }

    /// Drops the stored value for `key`. Returns `false` if the key is not
    /// registered.
    pub fn invalidate<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + fmt::Debug + ?Sized,
    {
        match self.entries.get(key) {
            Some(cell) => {
                tracing::debug!(?key, "invalidating repository entry");
                cell.invalidate();
                true
            }
            None => false,
        }
    }

    /// Drops every stored value. Keys stay registered.
    pub fn invalidate_all(&self) {
        for cell in self.entries.values() {
            cell.invalidate();
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

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;
    use crate::policy::{Always, Policy};

    #[test]
    fn duplicate_keys_collapse_into_one_cell() {
        let repo: CachedRepository<u8, _> = CachedRepository::new(
            ["a", "a", "b"].map(String::from),
            Policy::new(Always, |_: &String| Ok::<_, Infallible>(1u8)),
        );
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn invalidate_unknown_key_returns_false() {
        let repo: CachedRepository<u8, _> = CachedRepository::new(
            ["a".to_string()],
            Policy::new(Always, |_: &String| Ok::<_, Infallible>(1u8)),
        );
        assert!(repo.invalidate("a"));
        assert!(!repo.invalidate("z"));
    }

    #[test]
    fn unknown_key_error_names_the_key() {
        let repo: CachedRepository<u8, _> = CachedRepository::new(
            Vec::<String>::new(),
            Policy::new(Always, |_: &String| Ok::<_, Infallible>(1u8)),
        );
        let err = repo.fetch("missing").unwrap_err();
        assert_eq!(err.to_string(), "no cache cell registered for key \"missing\"");
    }
}
