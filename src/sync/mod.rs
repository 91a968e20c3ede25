//! Blocking cache cells. `update` runs on the calling thread while the
//! cell's `parking_lot` mutex is held.

mod repository;
mod value;

pub use repository::CachedRepository;
pub use value::CachedValue;
