use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::state::{Attempt, AttemptState};
use super::{
    split_price, Reservation, ReservationError, ReservationRequest, ReservationResult,
};
use crate::entities::booking::BookingStatus;
use crate::entities::passenger;
use crate::inventory::{Decrement, InventoryStore, NewBooking, StoreError};
use crate::lock::{flight_lock_key, LockService};
use crate::utils::reference::generate_lock_token;

/// Long enough for one reservation, short enough that a crashed holder does
/// not block the flight for long.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(5);

/// How the read-check-decrement step is kept consistent across callers.
#[derive(Clone)]
pub enum ReservationStrategy {
    /// Hold a per-flight lock around point reads and writes.
    Locked {
        lock: Arc<dyn LockService>,
        ttl: Duration,
    },
    /// Let the store decrement conditionally; no external lock.
    Conditional,
}

/// How to undo the seat decrement when the booking cannot be written.
#[derive(Debug, Clone, Copy)]
enum Compensation {
    /// Write back the absolute pre-decrement count. Only valid under the lock.
    Restore(i32),
    /// Add the seats back relative to whatever is stored now.
    Increment(i32),
}

#[derive(Clone)]
pub struct ReservationService {
    store: Arc<dyn InventoryStore>,
    strategy: ReservationStrategy,
}

impl ReservationService {
    pub fn new(store: Arc<dyn InventoryStore>, strategy: ReservationStrategy) -> Self {
        Self { store, strategy }
    }

    pub fn locked(store: Arc<dyn InventoryStore>, lock: Arc<dyn LockService>, ttl: Duration) -> Self {
        Self::new(store, ReservationStrategy::Locked { lock, ttl })
    }

    pub fn conditional(store: Arc<dyn InventoryStore>) -> Self {
        Self::new(store, ReservationStrategy::Conditional)
    }

    pub fn store(&self) -> &Arc<dyn InventoryStore> {
        &self.store
    }

    /// Reserve one seat per passenger on `request.flight_id`.
    ///
    /// Never retries: a held lock yields [`ReservationError::Busy`] and the
    /// caller decides on backoff.
    ///
    /// Once validation passes the attempt runs on its own task. Dropping the
    /// returned future stops the wait, not the attempt: the writes and the
    /// lock release still happen.
    pub async fn reserve(&self, request: ReservationRequest) -> ReservationResult {
        let attempt = Attempt::new(request.flight_id, &request.booking_reference);
        let seats = match request.validate() {
            Ok(seats) => seats,
            Err(err) => {
                attempt.finish(&Err(err.clone()));
                return Err(err);
            }
        };

        let store = Arc::clone(&self.store);
        let task = match &self.strategy {
            ReservationStrategy::Locked { lock, ttl } => {
                let lock = Arc::clone(lock);
                let ttl = *ttl;
                tokio::spawn(async move {
                    let outcome =
                        reserve_locked(store, lock.as_ref(), ttl, request, seats, &attempt).await;
                    attempt.finish(&outcome);
                    outcome
                })
            }
            ReservationStrategy::Conditional => tokio::spawn(async move {
                let outcome = reserve_conditionally(store, request, seats, &attempt).await;
                attempt.finish(&outcome);
                outcome
            }),
        };

        join_attempt(task).await
    }
}

/// Turn a task that died instead of returning into an `Unknown` failure.
async fn join_attempt(task: JoinHandle<ReservationResult>) -> ReservationResult {
    match task.await {
        Ok(result) => result,
        Err(join_err) => {
            tracing::error!(error = %join_err, "Reservation task aborted");
            Err(ReservationError::Unknown(if join_err.is_panic() {
                "reservation task panicked".to_string()
            } else {
                "reservation task was cancelled".to_string()
            }))
        }
    }
}

async fn reserve_locked(
    store: Arc<dyn InventoryStore>,
    lock: &dyn LockService,
    ttl: Duration,
    request: ReservationRequest,
    seats: i32,
    attempt: &Attempt,
) -> ReservationResult {
    let key = flight_lock_key(request.flight_id);
    let token = generate_lock_token();

    attempt.advance(AttemptState::LockPending);
    match lock.acquire(&key, &token, ttl).await {
        Ok(true) => {}
        Ok(false) => return Err(ReservationError::Busy),
        Err(err) => {
            tracing::error!(lock_key = %key, error = %err, "Failed to acquire reservation lock");
            return Err(ReservationError::Unknown(format!(
                "lock service unavailable: {}",
                err
            )));
        }
    }
    attempt.advance(AttemptState::LockHeld);

    // The region gets its own task so a panic inside it still reaches the
    // release below.
    let region = tokio::spawn(reserve_under_lock(store, request, seats, attempt.clone()));
    let outcome = join_attempt(region).await;
    if outcome.is_err() {
        tracing::debug!(lock_key = %key, state = ?attempt.state(), "Critical region ended early");
    }

    // Every path past a successful acquire ends here. A failed release is
    // left to the TTL.
    match lock.release_if_owned(&key, &token).await {
        Ok(true) => tracing::debug!(lock_key = %key, "Reservation lock released"),
        Ok(false) => tracing::warn!(
            lock_key = %key,
            "Reservation lock expired before release; critical region outlived the TTL"
        ),
        Err(err) => tracing::warn!(
            lock_key = %key,
            error = %err,
            "Failed to release reservation lock; relying on expiry"
        ),
    }

    outcome
}

async fn reserve_under_lock(
    store: Arc<dyn InventoryStore>,
    request: ReservationRequest,
    seats: i32,
    attempt: Attempt,
) -> ReservationResult {
    let flight_id = request.flight_id;

    let remaining = store
        .remaining_seats(flight_id)
        .await
        .map_err(|e| ReservationError::Unknown(format!("Failed to read inventory: {}", e)))?
        .ok_or(ReservationError::NotFound { flight_id })?;
    attempt.advance(AttemptState::InventoryChecked);

    if remaining < seats {
        return Err(ReservationError::InsufficientInventory { remaining, requested: seats });
    }

    let after = remaining - seats;
    store
        .set_remaining_seats(flight_id, after)
        .await
        .map_err(|e| ReservationError::Persistence(format!("Failed to update inventory: {}", e)))?;
    attempt.advance(AttemptState::InventoryReserved);

    persist_booking(
        store.as_ref(),
        &request,
        seats,
        after,
        Compensation::Restore(remaining),
        &attempt,
    )
    .await
}

async fn reserve_conditionally(
    store: Arc<dyn InventoryStore>,
    request: ReservationRequest,
    seats: i32,
    attempt: &Attempt,
) -> ReservationResult {
    let flight_id = request.flight_id;

    let after = match store.decrement_if_available(flight_id, seats).await {
        Ok(Decrement::Applied { remaining }) => remaining,
        Ok(Decrement::Insufficient { remaining }) => {
            return Err(ReservationError::InsufficientInventory { remaining, requested: seats });
        }
        Ok(Decrement::NotFound) => return Err(ReservationError::NotFound { flight_id }),
        Err(e) => {
            return Err(ReservationError::Persistence(format!(
                "Failed to update inventory: {}",
                e
            )));
        }
    };
    attempt.advance(AttemptState::InventoryChecked);
    attempt.advance(AttemptState::InventoryReserved);

    persist_booking(
        store.as_ref(),
        &request,
        seats,
        after,
        Compensation::Increment(seats),
        attempt,
    )
    .await
}

async fn persist_booking(
    store: &dyn InventoryStore,
    request: &ReservationRequest,
    seats: i32,
    remaining_seats: i32,
    compensation: Compensation,
    attempt: &Attempt,
) -> ReservationResult {
    let flight_id = request.flight_id;
    let ticket_price = split_price(request.total_price, seats);

    let new_booking = NewBooking {
        id: Uuid::new_v4(),
        flight_id,
        user_id: request.requester_id,
        booking_reference: request.booking_reference.clone(),
        total_price: request.total_price,
        status: BookingStatus::Confirmed,
        contact_info: json!({ "phone": request.passengers[0].phone }),
    };

    let booking = match store.insert_booking(new_booking).await {
        Ok(booking) => booking,
        Err(err) => {
            compensate(store, flight_id, compensation).await;
            return Err(match err {
                StoreError::Conflict(_) => {
                    ReservationError::DuplicateReference(request.booking_reference.clone())
                }
                other => ReservationError::Persistence(format!("Failed to create booking: {}", other)),
            });
        }
    };
    attempt.advance(AttemptState::BookingPersisted);

    let passengers = request
        .passengers
        .iter()
        .map(|p| passenger::Model {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            full_name: p.full_name.clone(),
            national_id: p.national_id.clone(),
            phone: p.phone.clone(),
            ticket_price,
        })
        .collect();

    if let Err(err) = store.insert_passengers(passengers).await {
        // Known gap: the booking stays confirmed with no passengers and the
        // seats stay taken. Needs manual reconciliation.
        tracing::error!(
            flight_id = %flight_id,
            booking_id = %booking.id,
            booking_reference = %booking.booking_reference,
            error = %err,
            "Passenger batch failed; booking left without passengers"
        );
        return Err(ReservationError::Persistence(format!(
            "Failed to save passenger details: {}",
            err
        )));
    }
    attempt.advance(AttemptState::PassengersPersisted);

    Ok(Reservation {
        booking_id: booking.id,
        booking_reference: booking.booking_reference,
        flight_id,
        status: booking.status,
        seats_reserved: seats,
        remaining_seats,
        ticket_price,
    })
}

async fn compensate(store: &dyn InventoryStore, flight_id: Uuid, compensation: Compensation) {
    let result = match compensation {
        Compensation::Restore(seats) => store.set_remaining_seats(flight_id, seats).await,
        Compensation::Increment(seats) => store.increment_seats(flight_id, seats).await,
    };

    match result {
        Ok(()) => tracing::warn!(
            flight_id = %flight_id,
            compensation = ?compensation,
            "Booking insert failed; seat inventory restored"
        ),
        Err(err) => tracing::error!(
            flight_id = %flight_id,
            compensation = ?compensation,
            error = %err,
            "Booking insert failed and seat inventory could not be restored"
        ),
    }
}
