//! Seat reservation for a single flight.
//!
//! [`ReservationService::reserve`] checks inventory, decrements it, writes the
//! booking and its passengers, and always hands back a structured result.
//! Two ways of keeping the check-and-decrement consistent are supported; see
//! [`ReservationStrategy`].

mod error;
mod service;
mod state;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::BookingStatus;

pub use error::{FailureReason, ReservationError};
pub use service::{ReservationService, ReservationStrategy, DEFAULT_LOCK_TTL};
pub use state::AttemptState;

pub type ReservationResult = Result<Reservation, ReservationError>;

/// Width of the `booking.booking_reference` column.
pub const MAX_BOOKING_REFERENCE_LEN: usize = 32;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PassengerDetails {
    pub full_name: String,
    pub national_id: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub flight_id: Uuid,
    pub requester_id: Uuid,
    pub passengers: Vec<PassengerDetails>,
    /// Already priced by the caller for cabin class and party size.
    pub total_price: f64,
    /// Caller-generated and expected to be unique.
    pub booking_reference: String,
}

impl ReservationRequest {
    /// Checks the preconditions and returns the number of seats requested.
    pub fn validate(&self) -> Result<i32, ReservationError> {
        if self.passengers.is_empty() {
            return Err(ReservationError::Invalid(
                "At least one passenger is required".to_string(),
            ));
        }
        if self.booking_reference.trim().is_empty() {
            return Err(ReservationError::Invalid(
                "Booking reference must not be empty".to_string(),
            ));
        }
        if self.booking_reference.chars().count() > MAX_BOOKING_REFERENCE_LEN {
            return Err(ReservationError::Invalid(format!(
                "Booking reference must be at most {} characters",
                MAX_BOOKING_REFERENCE_LEN
            )));
        }
        if !self.total_price.is_finite() || self.total_price < 0.0 {
            return Err(ReservationError::Invalid(
                "Total price must be a non-negative number".to_string(),
            ));
        }

        i32::try_from(self.passengers.len())
            .map_err(|_| ReservationError::Invalid("Too many passengers".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reservation {
    pub booking_id: Uuid,
    pub booking_reference: String,
    pub flight_id: Uuid,
    pub status: BookingStatus,
    pub seats_reserved: i32,
    pub remaining_seats: i32,
    pub ticket_price: f64,
}

/// Even per-ticket share of `total_price`.
///
/// Any rounding remainder is left as is; the shares can differ from the total
/// by floating point error.
pub fn split_price(total_price: f64, passenger_count: i32) -> f64 {
    total_price / f64::from(passenger_count)
}
