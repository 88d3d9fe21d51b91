use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Script};

use super::{LockError, LockService};

// GET and DEL must run as one server-side step, otherwise a holder whose key
// expired could delete a lock taken afterwards by someone else.
const RELEASE_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    else
        return 0
    end
"#;

/// Redis-backed lock using `SET NX PX` and a compare-and-delete script.
#[derive(Clone)]
pub struct RedisLockService {
    conn_manager: ConnectionManager,
    release_script: Script,
}

impl RedisLockService {
    pub async fn new(redis_url: &str) -> Result<Self, LockError> {
        let client = Client::open(redis_url)
            .map_err(|e| LockError::Backend(format!("Failed to create Redis client: {}", e)))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            LockError::Backend(format!("Failed to create Redis connection manager: {}", e))
        })?;

        Ok(Self {
            conn_manager,
            release_script: Script::new(RELEASE_SCRIPT),
        })
    }
}

#[async_trait]
impl LockService for RedisLockService {
    async fn acquire(&self, key: &str, owner_token: &str, ttl: Duration) -> Result<bool, LockError> {
        let mut conn = self.conn_manager.clone();
        // PX rejects zero
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(owner_token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| LockError::Backend(format!("Failed to acquire {}: {}", key, e)))?;

        Ok(result.is_some())
    }

    async fn release_if_owned(&self, key: &str, owner_token: &str) -> Result<bool, LockError> {
        let mut conn = self.conn_manager.clone();

        let deleted: i64 = self
            .release_script
            .key(key)
            .arg(owner_token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| LockError::Backend(format!("Failed to release {}: {}", key, e)))?;

        Ok(deleted == 1)
    }
}
