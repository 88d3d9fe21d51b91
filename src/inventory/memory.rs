use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{BookingDetails, Decrement, InventoryStore, NewBooking, StoreError};
use crate::entities::{booking, passenger};

#[derive(Debug, Default)]
struct Tables {
    flights: HashMap<Uuid, i32>,
    bookings: Vec<booking::Model>,
    passengers: Vec<passenger::Model>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_seat_write: AtomicBool,
    fail_booking_insert: AtomicBool,
    panic_booking_insert: AtomicBool,
    fail_passenger_insert: AtomicBool,
}

/// In-process store with the same point-operation semantics as the database
/// store, plus one-shot fault injection for exercising failure paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryInventoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
    latency: Duration,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every operation sleeps for `latency` before touching the tables, which
    /// widens the gap between a read and the following write.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn add_flight(&self, remaining_seats: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.tables().flights.insert(id, remaining_seats);
        id
    }

    pub fn seats(&self, flight_id: Uuid) -> Option<i32> {
        self.tables().flights.get(&flight_id).copied()
    }

    pub fn bookings(&self) -> Vec<booking::Model> {
        self.tables().bookings.clone()
    }

    pub fn passengers(&self) -> Vec<passenger::Model> {
        self.tables().passengers.clone()
    }

    pub fn fail_next_seat_write(&self) {
        self.faults.fail_seat_write.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_booking_insert(&self) {
        self.faults.fail_booking_insert.store(true, Ordering::SeqCst);
    }

    /// Makes the next booking insert panic, standing in for an unexpected
    /// failure inside the critical region.
    pub fn panic_next_booking_insert(&self) {
        self.faults.panic_booking_insert.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_passenger_insert(&self) {
        self.faults.fail_passenger_insert.store(true, Ordering::SeqCst);
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic never happens while the guard is held, so poisoning is not
        // expected; recover the data regardless.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn take_fault(flag: &AtomicBool) -> bool {
        flag.swap(false, Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn remaining_seats(&self, flight_id: Uuid) -> Result<Option<i32>, StoreError> {
        self.simulate_latency().await;
        Ok(self.seats(flight_id))
    }

    async fn set_remaining_seats(&self, flight_id: Uuid, seats: i32) -> Result<(), StoreError> {
        self.simulate_latency().await;
        if Self::take_fault(&self.faults.fail_seat_write) {
            return Err(StoreError::Unavailable("injected seat write failure".to_string()));
        }
        if seats < 0 {
            return Err(StoreError::Database(format!(
                "remaining_seats check violated for flight {}",
                flight_id
            )));
        }

        match self.tables().flights.get_mut(&flight_id) {
            Some(remaining) => {
                *remaining = seats;
                Ok(())
            }
            None => Err(StoreError::Database(format!("Flight {} not found", flight_id))),
        }
    }

    async fn insert_booking(&self, new_booking: NewBooking) -> Result<booking::Model, StoreError> {
        self.simulate_latency().await;
        if Self::take_fault(&self.faults.panic_booking_insert) {
            panic!("injected panic while inserting booking {}", new_booking.booking_reference);
        }
        if Self::take_fault(&self.faults.fail_booking_insert) {
            return Err(StoreError::Unavailable("injected booking insert failure".to_string()));
        }

        let mut tables = self.tables();
        if tables
            .bookings
            .iter()
            .any(|b| b.booking_reference == new_booking.booking_reference)
        {
            return Err(StoreError::Conflict(format!(
                "Booking reference {} already exists",
                new_booking.booking_reference
            )));
        }

        let model = booking::Model {
            id: new_booking.id,
            flight_id: new_booking.flight_id,
            user_id: new_booking.user_id,
            booking_reference: new_booking.booking_reference,
            total_price: new_booking.total_price,
            status: new_booking.status,
            contact_info: new_booking.contact_info,
            created_at: Utc::now().fixed_offset(),
        };
        tables.bookings.push(model.clone());
        Ok(model)
    }

    async fn insert_passengers(&self, passengers: Vec<passenger::Model>) -> Result<(), StoreError> {
        self.simulate_latency().await;
        if Self::take_fault(&self.faults.fail_passenger_insert) {
            return Err(StoreError::Unavailable("injected passenger insert failure".to_string()));
        }

        self.tables().passengers.extend(passengers);
        Ok(())
    }

    async fn decrement_if_available(&self, flight_id: Uuid, seats: i32) -> Result<Decrement, StoreError> {
        self.simulate_latency().await;
        if Self::take_fault(&self.faults.fail_seat_write) {
            return Err(StoreError::Unavailable("injected seat write failure".to_string()));
        }

        let mut tables = self.tables();
        Ok(match tables.flights.get_mut(&flight_id) {
            None => Decrement::NotFound,
            Some(remaining) if *remaining < seats => Decrement::Insufficient { remaining: *remaining },
            Some(remaining) => {
                *remaining -= seats;
                Decrement::Applied { remaining: *remaining }
            }
        })
    }

    async fn increment_seats(&self, flight_id: Uuid, seats: i32) -> Result<(), StoreError> {
        self.simulate_latency().await;
        if Self::take_fault(&self.faults.fail_seat_write) {
            return Err(StoreError::Unavailable("injected seat write failure".to_string()));
        }

        match self.tables().flights.get_mut(&flight_id) {
            Some(remaining) => {
                *remaining += seats;
                Ok(())
            }
            None => Err(StoreError::Database(format!("Flight {} not found", flight_id))),
        }
    }

    async fn find_booking(&self, reference: &str) -> Result<Option<BookingDetails>, StoreError> {
        self.simulate_latency().await;
        let tables = self.tables();

        Ok(tables
            .bookings
            .iter()
            .find(|b| b.booking_reference == reference)
            .map(|booking| BookingDetails {
                booking: booking.clone(),
                passengers: tables
                    .passengers
                    .iter()
                    .filter(|p| p.booking_id == booking.id)
                    .cloned()
                    .collect(),
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_booking(flight_id: Uuid, reference: &str) -> NewBooking {
        NewBooking {
            id: Uuid::new_v4(),
            flight_id,
            user_id: Uuid::new_v4(),
            booking_reference: reference.to_string(),
            total_price: 300.0,
            status: booking::BookingStatus::Confirmed,
            contact_info: json!({ "phone": "555-0100" }),
        }
    }

    #[tokio::test]
    async fn conditional_decrement_never_goes_negative() {
        let store = MemoryInventoryStore::new();
        let flight = store.add_flight(3);

        assert_eq!(
            store.decrement_if_available(flight, 2).await.unwrap(),
            Decrement::Applied { remaining: 1 }
        );
        assert_eq!(
            store.decrement_if_available(flight, 2).await.unwrap(),
            Decrement::Insufficient { remaining: 1 }
        );
        assert_eq!(
            store.decrement_if_available(Uuid::new_v4(), 1).await.unwrap(),
            Decrement::NotFound
        );
        assert_eq!(store.seats(flight), Some(1));
    }

    #[tokio::test]
    async fn duplicate_reference_is_a_conflict() {
        let store = MemoryInventoryStore::new();
        let flight = store.add_flight(10);

        store.insert_booking(new_booking(flight, "ABC12345")).await.unwrap();
        let err = store
            .insert_booking(new_booking(flight, "ABC12345"))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.bookings().len(), 1);
    }

    #[tokio::test]
    async fn injected_faults_fire_once() {
        let store = MemoryInventoryStore::new();
        let flight = store.add_flight(10);
        store.fail_next_booking_insert();

        assert!(store.insert_booking(new_booking(flight, "ONE")).await.is_err());
        assert!(store.insert_booking(new_booking(flight, "TWO")).await.is_ok());
    }

    #[tokio::test]
    async fn find_booking_returns_its_passengers() {
        let store = MemoryInventoryStore::new();
        let flight = store.add_flight(10);
        let booking = store.insert_booking(new_booking(flight, "LOOKUP01")).await.unwrap();
        store
            .insert_passengers(vec![passenger::Model {
                id: Uuid::new_v4(),
                booking_id: booking.id,
                full_name: "Ada Lovelace".to_string(),
                national_id: "X1".to_string(),
                phone: "555-0100".to_string(),
                ticket_price: 300.0,
            }])
            .await
            .unwrap();

        let details = store.find_booking("LOOKUP01").await.unwrap().unwrap();
        assert_eq!(details.booking.id, booking.id);
        assert_eq!(details.passengers.len(), 1);
        assert!(store.find_booking("MISSING").await.unwrap().is_none());
    }
}
