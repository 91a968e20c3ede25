//! Single-value cache cells refreshed through pluggable policies.
//!
//! A [`sync::CachedValue`] (or [`future::CachedValue`]) holds at most one
//! value. Every fetch asks a [`policy::CachePolicy`] whether that value is
//! stale and, if so, refreshes it while holding the cell's lock, so
//! concurrent fetches collapse into one refresh. A [`sync::CachedRepository`]
//! groups one cell per key behind one shared policy.

mod builder;
mod entry;
mod error;
mod metrics;
pub mod config;
pub mod future;
pub mod policy;
pub mod sync;

pub use builder::RepositoryBuilder;
pub use entry::Entry;
pub use error::FetchError;
pub use metrics::stats::Metrics;

#[cfg(test)]
pub(crate) use tokio::time;

#[cfg(not(test))]
pub(crate) use std::time;
