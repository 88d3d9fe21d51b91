use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{LockError, LockService};

/// Process-local lock table with the same contract as the Redis lock.
///
/// Only excludes callers that share this instance, so it fits single-node
/// deployments and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLockService {
    // key -> (owner token, expiry)
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
}

impl MemoryLockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` is currently held by anyone. Expired entries count as free.
    pub fn is_held(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .get(key)
                    .is_some_and(|(_, expires_at)| *expires_at > Instant::now())
            })
            .unwrap_or(false)
    }

    /// Owner token currently stored under `key`, if it has not expired.
    pub fn holder(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(token, _)| token.clone())
    }
}

#[async_trait]
impl LockService for MemoryLockService {
    async fn acquire(&self, key: &str, owner_token: &str, ttl: Duration) -> Result<bool, LockError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| LockError::Backend("lock table poisoned".to_string()))?;

        let now = Instant::now();
        if let Some((_, expires_at)) = entries.get(key) {
            if *expires_at > now {
                return Ok(false);
            }
        }

        entries.insert(key.to_string(), (owner_token.to_string(), now + ttl));
        Ok(true)
    }

    async fn release_if_owned(&self, key: &str, owner_token: &str) -> Result<bool, LockError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| LockError::Backend("lock table poisoned".to_string()))?;

        match entries.get(key) {
            Some((token, expires_at)) if token == owner_token && *expires_at > Instant::now() => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn second_acquire_fails_while_held() {
        let locks = MemoryLockService::new();

        assert!(locks.acquire("flight_lock:a", "first", TTL).await.unwrap());
        assert!(!locks.acquire("flight_lock:a", "second", TTL).await.unwrap());
        assert_eq!(locks.holder("flight_lock:a").as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let locks = MemoryLockService::new();

        assert!(locks.acquire("flight_lock:a", "first", TTL).await.unwrap());
        assert!(locks.acquire("flight_lock:b", "second", TTL).await.unwrap());
    }

    #[tokio::test]
    async fn release_requires_matching_owner() {
        let locks = MemoryLockService::new();
        locks.acquire("flight_lock:a", "owner", TTL).await.unwrap();

        assert!(!locks.release_if_owned("flight_lock:a", "intruder").await.unwrap());
        assert!(locks.is_held("flight_lock:a"));

        assert!(locks.release_if_owned("flight_lock:a", "owner").await.unwrap());
        assert!(!locks.is_held("flight_lock:a"));
    }

    #[tokio::test]
    async fn expired_lock_can_be_taken_over() {
        let locks = MemoryLockService::new();
        locks
            .acquire("flight_lock:a", "crashed", Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(!locks.is_held("flight_lock:a"));
        assert!(locks.acquire("flight_lock:a", "next", TTL).await.unwrap());
        // The stale owner must not remove the new holder's key
        assert!(!locks.release_if_owned("flight_lock:a", "crashed").await.unwrap());
        assert_eq!(locks.holder("flight_lock:a").as_deref(), Some("next"));
    }
}
