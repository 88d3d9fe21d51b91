use std::env;
use std::time::Duration;

/// Which lock backend guards the per-flight critical region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockBackend {
    Redis,
    Memory,
}

/// How seat inventory is protected while a reservation runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    /// External per-flight lock around read, check and write.
    Locked,
    /// Single conditional decrement in the database, no external lock.
    Conditional,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub lock_backend: LockBackend,
    pub lock_ttl: Duration,
    pub strategy: StrategyKind,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let lock_backend = match env::var("LOCK_BACKEND")
            .unwrap_or_else(|_| "redis".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "redis" => LockBackend::Redis,
            "memory" => LockBackend::Memory,
            other => panic!("LOCK_BACKEND must be 'redis' or 'memory', got '{}'", other),
        };

        let strategy = match env::var("RESERVATION_STRATEGY")
            .unwrap_or_else(|_| "locked".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "locked" => StrategyKind::Locked,
            "conditional" => StrategyKind::Conditional,
            other => panic!(
                "RESERVATION_STRATEGY must be 'locked' or 'conditional', got '{}'",
                other
            ),
        };

        let redis_url = env::var("REDIS_URL").ok();
        if lock_backend == LockBackend::Redis && strategy == StrategyKind::Locked {
            assert!(
                redis_url.is_some(),
                "REDIS_URL must be set when LOCK_BACKEND=redis"
            );
        }

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            redis_url,
            lock_backend,
            lock_ttl: Duration::from_millis(
                env::var("LOCK_TTL_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .expect("LOCK_TTL_MS must be a number"),
            ),
            strategy,
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
