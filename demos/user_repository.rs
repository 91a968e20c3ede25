//! A user-profile repository backed by a slow "remote API".
//!
//! The profile is fetched once and then served from the cell until it has
//! been returned five times, after which the next fetch goes back to the API.
//!
//! Run with:
//!     RUST_LOG=lungo=debug cargo run --example user_repository

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lungo::future::CachedValue;
use lungo::policy::{Policy, UsageThreshold};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct UserInformation {
    username: String,
    tier: String,
    country: String,
    revision: u32,
}

#[derive(Debug)]
struct ApiError;

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("user API unavailable")
    }
}

/// Stand-in for a network client.
#[derive(Clone, Default)]
struct UserApi {
    requests: Arc<AtomicU32>,
}

impl UserApi {
    async fn fetch_user_information(&self) -> Result<UserInformation, ApiError> {
        let revision = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(UserInformation {
            username: "Lisandro".to_string(),
            tier: "Normal".to_string(),
            country: "ARG".to_string(),
            revision,
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let api = UserApi::default();
    let client = api.clone();
    let policy = Policy::new(UsageThreshold::new(5), move || {
        let client = client.clone();
        async move { client.fetch_user_information().await }
    });
    let user: CachedValue<UserInformation> = CachedValue::new();

    for i in 1..=11 {
        let start = Instant::now();
        match user.fetch(&policy).await {
            Ok(Some(info)) => println!(
                "fetch {i:>2}: {} ({}, {}) rev {} in {:?}",
                info.username,
                info.tier,
                info.country,
                info.revision,
                start.elapsed()
            ),
            Ok(None) => println!("fetch {i:>2}: nothing cached"),
            Err(err) => println!("fetch {i:>2}: {err}"),
        }
    }

    let stats = user.stats();
    println!(
        "\napi requests: {}  hits: {}  refreshes: {}  hit rate: {:.2}",
        api.requests.load(Ordering::Relaxed),
        stats.hits,
        stats.refreshes,
        stats.hit_rate
    );
}
