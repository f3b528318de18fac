//! Cache port: the narrow key-value contract the scoring core depends on.
//!
//! Backends own their connection handling; the core only calls [`Store::get`],
//! [`Store::set`] and [`Store::available`], and never retries on its own.

mod memory;
mod redis_store;
mod retry;

use std::sync::Arc;
use std::time::Duration;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use retry::RetryingStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Failures reported by a cache backend.
pub enum StoreError {
    /// The backend cannot be reached at all.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },
    /// The backend was reached but the operation failed.
    #[error("store operation failed: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Key-value cache with per-entry TTL.
///
/// Implementations are shared across concurrent requests.
pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError>;

    /// Liveness probe used to avoid calls against a dead backend.
    fn available(&self) -> bool;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), StoreError> {
        (**self).set(key, value, ttl)
    }

    fn available(&self) -> bool {
        (**self).available()
    }
}
