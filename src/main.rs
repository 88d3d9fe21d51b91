use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use sea_orm_migration::MigratorTrait;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flight_reservation_backend::{
    config::{Config, LockBackend, StrategyKind},
    db,
    inventory::{InventoryStore, SeaOrmInventoryStore},
    lock::{LockService, MemoryLockService, RedisLockService},
    middleware::rate_limit::{create_public_governor, log_request},
    reservation::ReservationService,
    routes, AppState,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flight_reservation_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    tracing::info!("Starting server at {}", config.server_addr());

    // Connect to database
    let db = db::connect(&config)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Migrations complete");

    let store: Arc<dyn InventoryStore> = Arc::new(SeaOrmInventoryStore::new(db));
    let reservations = match config.strategy {
        StrategyKind::Locked => {
            let lock = connect_lock(&config).await;
            tracing::info!(
                backend = ?config.lock_backend,
                ttl_ms = config.lock_ttl.as_millis() as u64,
                "Reservations guarded by per-flight lock"
            );
            ReservationService::locked(store, lock, config.lock_ttl)
        }
        StrategyKind::Conditional => {
            tracing::info!("Reservations use conditional seat decrement");
            ReservationService::conditional(store)
        }
    };

    let state = AppState::new(reservations);

    // Create router with middleware
    let app = routes::create_router(state)
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(create_public_governor());

    // Start server with socket address for rate limiting
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}

async fn connect_lock(config: &Config) -> Arc<dyn LockService> {
    match config.lock_backend {
        LockBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .expect("REDIS_URL must be set when LOCK_BACKEND=redis");
            let lock = RedisLockService::new(url)
                .await
                .expect("Failed to connect to Redis");
            tracing::info!("Connected to Redis");
            Arc::new(lock)
        }
        LockBackend::Memory => {
            tracing::warn!("In-memory lock only excludes requests within this process");
            Arc::new(MemoryLockService::new())
        }
    }
}
