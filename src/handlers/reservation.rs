use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::inventory::BookingDetails;
use crate::reservation::{PassengerDetails, Reservation, ReservationRequest};
use crate::utils::reference::generate_booking_reference;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub requester_id: Uuid,
    pub passengers: Vec<PassengerDetails>,
    pub total_price: f64,
    pub booking_reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub flight_id: Uuid,
    pub remaining_seats: i32,
}

/// Reserve seats on a flight
pub async fn create_reservation(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
    Json(payload): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let booking_reference = payload
        .booking_reference
        .unwrap_or_else(generate_booking_reference);

    let request = ReservationRequest {
        flight_id,
        requester_id: payload.requester_id,
        passengers: payload.passengers,
        total_price: payload.total_price,
        booking_reference,
    };

    let reservation = state.reservations.reserve(request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Look up a booking and its passengers by reference
pub async fn get_booking(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> AppResult<Json<BookingDetails>> {
    let booking = state
        .store
        .find_booking(&reference)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    Ok(Json(booking))
}

/// Current remaining seats for a flight
pub async fn flight_availability(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
) -> AppResult<Json<AvailabilityResponse>> {
    let remaining_seats = state
        .store
        .remaining_seats(flight_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Flight not found".to_string()))?;

    Ok(Json(AvailabilityResponse {
        flight_id,
        remaining_seats,
    }))
}
