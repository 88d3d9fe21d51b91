//! Point reads and writes against flight inventory, bookings and passengers.
//!
//! None of these calls compose into a transaction; callers that need a
//! consistent check-and-decrement either hold the flight lock around them or
//! use [`InventoryStore::decrement_if_available`].

mod memory;
mod sea_orm_store;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{booking, passenger};

pub use memory::MemoryInventoryStore;
pub use sea_orm_store::SeaOrmInventoryStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        StoreError::Database(err.to_string())
    }
}

/// Booking row to insert; id and timestamps are assigned by the caller and
/// the store respectively.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub user_id: Uuid,
    pub booking_reference: String,
    pub total_price: f64,
    pub status: booking::BookingStatus,
    pub contact_info: serde_json::Value,
}

/// Outcome of a conditional seat decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    Applied { remaining: i32 },
    Insufficient { remaining: i32 },
    NotFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: booking::Model,
    pub passengers: Vec<passenger::Model>,
}

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn remaining_seats(&self, flight_id: Uuid) -> Result<Option<i32>, StoreError>;

    async fn set_remaining_seats(&self, flight_id: Uuid, seats: i32) -> Result<(), StoreError>;

    /// Fails with [`StoreError::Conflict`] when the booking reference is taken.
    async fn insert_booking(&self, booking: NewBooking) -> Result<booking::Model, StoreError>;

    /// Inserts the whole batch or nothing.
    async fn insert_passengers(&self, passengers: Vec<passenger::Model>) -> Result<(), StoreError>;

    /// Decrements by `seats` only if at least `seats` remain, in one step.
    async fn decrement_if_available(&self, flight_id: Uuid, seats: i32) -> Result<Decrement, StoreError>;

    async fn increment_seats(&self, flight_id: Uuid, seats: i32) -> Result<(), StoreError>;

    async fn find_booking(&self, reference: &str) -> Result<Option<BookingDetails>, StoreError>;
}
