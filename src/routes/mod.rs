use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::reservation;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let flight_routes = Router::new()
        .route("/{id}/availability", get(reservation::flight_availability))
        .route("/{id}/reservations", post(reservation::create_reservation));

    let booking_routes = Router::new().route("/{reference}", get(reservation::get_booking));

    Router::new()
        .nest("/api/flights", flight_routes)
        .nest("/api/bookings", booking_routes)
        .with_state(state)
}
