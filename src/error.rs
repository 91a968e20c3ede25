use thiserror::Error;

/// Errors returned by a repository fetch.
///
/// `E` is the error type of the repository's policy.
#[derive(Debug, Error)]
pub enum FetchError<E> {
    /// The key was not registered when the repository was built.
    #[error("no cache cell registered for key {0}")]
    UnknownKey(String),
    /// The policy's `update` failed. The previously cached value is kept.
    #[error("refreshing the cached value failed: {0}")]
    Refresh(E),
}

impl<E> FetchError<E> {
    /// Returns the policy error, if this is a refresh failure.
    pub fn into_refresh(self) -> Option<E> {
        match self {
            FetchError::Refresh(e) => Some(e),
            FetchError::UnknownKey(_) => None,
        }
    }
}
