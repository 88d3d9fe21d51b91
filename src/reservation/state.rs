use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

use super::ReservationResult;

/// Progress of one reservation attempt.
///
/// Any state after `LockPending` may jump straight to `Released` on failure;
/// a failed acquire goes from `LockPending` to `Released` with nothing held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    LockPending,
    LockHeld,
    InventoryChecked,
    InventoryReserved,
    BookingPersisted,
    PassengersPersisted,
    Released,
}

/// Logs state transitions for one attempt.
///
/// Clones share the same state, so the critical region task and the task
/// that owns the lock advance a single trace.
#[derive(Debug, Clone)]
pub(crate) struct Attempt {
    flight_id: Uuid,
    booking_reference: Arc<str>,
    state: Arc<Mutex<AttemptState>>,
}

impl Attempt {
    pub(crate) fn new(flight_id: Uuid, booking_reference: &str) -> Self {
        Self {
            flight_id,
            booking_reference: Arc::from(booking_reference),
            state: Arc::new(Mutex::new(AttemptState::Idle)),
        }
    }

    pub(crate) fn state(&self) -> AttemptState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn advance(&self, next: AttemptState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(
            flight_id = %self.flight_id,
            booking_reference = %self.booking_reference,
            from = ?*state,
            to = ?next,
            "Reservation attempt advanced"
        );
        *state = next;
    }

    pub(crate) fn finish(&self, result: &ReservationResult) {
        self.advance(AttemptState::Released);

        match result {
            Ok(reservation) => tracing::info!(
                flight_id = %self.flight_id,
                booking_reference = %self.booking_reference,
                seats = reservation.seats_reserved,
                remaining_seats = reservation.remaining_seats,
                "Reservation confirmed"
            ),
            Err(err) => tracing::info!(
                flight_id = %self.flight_id,
                booking_reference = %self.booking_reference,
                reason = ?err.reason(),
                "Reservation rejected: {}",
                err
            ),
        }
    }
}
