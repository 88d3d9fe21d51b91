//! Per-flight mutual exclusion.
//!
//! A [`LockService`] is a key/value store that can set a key only when it is
//! absent (with an expiry) and delete it only when the caller still owns it.
//! The expiry is the backstop for holders that crash between acquire and
//! release.

mod memory;
mod redis_lock;

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

pub use memory::MemoryLockService;
pub use redis_lock::RedisLockService;

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("lock backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait LockService: Send + Sync {
    /// Set `key = owner_token` if `key` is absent, expiring after `ttl`.
    /// Returns whether the key was set.
    async fn acquire(&self, key: &str, owner_token: &str, ttl: Duration) -> Result<bool, LockError>;

    /// Delete `key` only if it still holds `owner_token`, as one atomic step.
    /// Returns whether the key was deleted.
    async fn release_if_owned(&self, key: &str, owner_token: &str) -> Result<bool, LockError>;
}

/// Lock key guarding the seat inventory of one flight.
pub fn flight_lock_key(flight_id: Uuid) -> String {
    format!("flight_lock:{}", flight_id)
}
