use std::fmt;
use std::hash::Hash;

use crate::policy::Shared;
use crate::{future, sync};

/// Builder for configuring and constructing a cached repository.
///
/// # Example
/// ```
/// use lungo::policy::{Policy, UsageThreshold};
/// use lungo::RepositoryBuilder;
///
/// let repo: lungo::sync::CachedRepository<u64, _> =
///     RepositoryBuilder::shared(Policy::new(UsageThreshold::new(3), || {
///         Ok::<_, std::io::Error>(7)
///     }))
///     .key("latest".to_string())
///     .build();
///
/// assert_eq!(repo.fetch("latest").unwrap().as_deref(), Some(&7));
/// ```
pub struct RepositoryBuilder<P, K = String> {
    policy: P,
    keys: Vec<K>,
}

impl<P, K> RepositoryBuilder<P, K> {
    /// Starts a builder around a [`KeyedPolicy`] (or [`AsyncKeyedPolicy`]).
    ///
    /// [`KeyedPolicy`]: crate::policy::KeyedPolicy
    /// [`AsyncKeyedPolicy`]: crate::policy::AsyncKeyedPolicy
    pub fn new(policy: P) -> Self {
        RepositoryBuilder {
            policy,
            keys: Vec::new(),
        }
    }

    /// Registers one key.
    pub fn key(mut self, key: K) -> Self {
        self.keys.push(key);
        self
    }

    /// Registers several keys.
    pub fn keys<I>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
    {
        self.keys.extend(keys);
        self
    }
}

impl<P, K> RepositoryBuilder<Shared<P>, K> {
    /// Starts a builder around a key-agnostic policy shared by every cell.
    pub fn shared(policy: P) -> Self {
        RepositoryBuilder::new(Shared(policy))
    }
}

impl<P, K> RepositoryBuilder<P, K>
where
    K: Hash + Eq + fmt::Debug,
{
    /// Builds a blocking repository.
    pub fn build<T>(self) -> sync::CachedRepository<T, P, K> {
        sync::CachedRepository::new(self.keys, self.policy)
    }
}

impl<P, K> RepositoryBuilder<P, K>
where
    K: Hash + Eq + fmt::Debug + Send + Sync + 'static,
{
    /// Builds an async repository.
    pub fn build_async<T>(self) -> future::CachedRepository<T, P, K>
    where
        T: Send + Sync + 'static,
    {
        future::CachedRepository::new(self.keys, self.policy)
    }
}
