pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod inventory;
pub mod lock;
pub mod middleware;
pub mod reservation;
pub mod routes;
pub mod utils;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, AppResult};

use inventory::InventoryStore;
use reservation::ReservationService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InventoryStore>,
    pub reservations: Arc<ReservationService>,
}

impl AppState {
    pub fn new(reservations: ReservationService) -> Self {
        Self {
            store: Arc::clone(reservations.store()),
            reservations: Arc::new(reservations),
        }
    }
}
