//! Declarative repository configuration.
//!
//! ```yaml
//! keys: [profile, settings]
//! rule:
//!   type: time_threshold
//!   threshold: 5m
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::builder::RepositoryBuilder;
use crate::entry::Entry;
use crate::policy::{Always, Invalidation, Policy, TimeThreshold, UsageThreshold, WhenAbsent};

/// Which built-in invalidation rule to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleConfig {
    /// Refresh on every fetch.
    Always,
    /// Refresh only when nothing is cached.
    #[default]
    WhenAbsent,
    /// Refresh after a value has been returned `threshold` times.
    UsageThreshold { threshold: u64 },
    /// Refresh once a value is older than `threshold`.
    TimeThreshold {
        #[serde(with = "humantime_serde")]
        threshold: Duration,
    },
}

impl<T> Invalidation<T> for RuleConfig {
    fn should_invalidate(&self, current: Option<&Entry<T>>) -> bool {
        match *self {
            RuleConfig::Always => Always.should_invalidate(current),
            RuleConfig::WhenAbsent => WhenAbsent.should_invalidate(current),
            RuleConfig::UsageThreshold { threshold } => {
                UsageThreshold::new(threshold).should_invalidate(current)
            }
            RuleConfig::TimeThreshold { threshold } => {
                TimeThreshold::<T>::new(threshold).should_invalidate(current)
            }
        }
    }
}

/// Keys and rule of a repository. The updater is supplied in code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Keys to register; one cell is created per key.
    pub keys: Vec<String>,
    /// The invalidation rule shared by all cells.
    pub rule: RuleConfig,
}

impl RepositoryConfig {
    /// Pairs the configured rule with `updater` and registers the configured
    /// keys.
    pub fn into_builder<U>(self, updater: U) -> RepositoryBuilder<Policy<RuleConfig, U>> {
        RepositoryBuilder::new(Policy::new(self.rule, updater)).keys(self.keys)
    }
}
