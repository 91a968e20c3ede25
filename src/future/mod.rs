//! Async cache cells. `update` is awaited while the cell's `tokio` mutex is
//! held, so concurrent fetches of one cell wait for a single refresh.

mod repository;
mod value;

pub use repository::CachedRepository;
pub use value::CachedValue;
