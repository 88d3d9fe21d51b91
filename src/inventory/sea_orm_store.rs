use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};
use uuid::Uuid;

use super::{BookingDetails, Decrement, InventoryStore, NewBooking, StoreError};
use crate::entities::{booking, flight, passenger};

/// Tries before a conditional decrement gives up on a flight whose count
/// keeps moving between the update and the follow-up read.
const DECREMENT_ATTEMPTS: usize = 3;

/// Postgres-backed store over sea-orm.
pub struct SeaOrmInventoryStore {
    db: DatabaseConnection,
}

impl SeaOrmInventoryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn map_insert_error(err: DbErr, reference: &str) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            StoreError::Conflict(format!("Booking reference {} already exists", reference))
        }
        _ => StoreError::Database(err.to_string()),
    }
}

#[async_trait]
impl InventoryStore for SeaOrmInventoryStore {
    async fn remaining_seats(&self, flight_id: Uuid) -> Result<Option<i32>, StoreError> {
        let flight = flight::Entity::find_by_id(flight_id).one(&self.db).await?;
        Ok(flight.map(|f| f.remaining_seats))
    }

    async fn set_remaining_seats(&self, flight_id: Uuid, seats: i32) -> Result<(), StoreError> {
        let result = flight::Entity::update_many()
            .col_expr(flight::Column::RemainingSeats, Expr::value(seats))
            .filter(flight::Column::Id.eq(flight_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::Database(format!(
                "Flight {} disappeared during seat update",
                flight_id
            )));
        }
        Ok(())
    }

    async fn insert_booking(&self, new_booking: NewBooking) -> Result<booking::Model, StoreError> {
        let reference = new_booking.booking_reference.clone();
        let model = booking::ActiveModel {
            id: Set(new_booking.id),
            flight_id: Set(new_booking.flight_id),
            user_id: Set(new_booking.user_id),
            booking_reference: Set(new_booking.booking_reference),
            total_price: Set(new_booking.total_price),
            status: Set(new_booking.status),
            contact_info: Set(new_booking.contact_info),
            ..Default::default()
        };

        model
            .insert(&self.db)
            .await
            .map_err(|e| map_insert_error(e, &reference))
    }

    async fn insert_passengers(&self, passengers: Vec<passenger::Model>) -> Result<(), StoreError> {
        if passengers.is_empty() {
            return Ok(());
        }

        let models = passengers.into_iter().map(|p| passenger::ActiveModel {
            id: Set(p.id),
            booking_id: Set(p.booking_id),
            full_name: Set(p.full_name),
            national_id: Set(p.national_id),
            phone: Set(p.phone),
            ticket_price: Set(p.ticket_price),
        });

        // One multi-row INSERT, so the batch lands whole or not at all
        passenger::Entity::insert_many(models).exec(&self.db).await?;
        Ok(())
    }

    async fn decrement_if_available(&self, flight_id: Uuid, seats: i32) -> Result<Decrement, StoreError> {
        for _ in 0..DECREMENT_ATTEMPTS {
            // RETURNING gives the count this statement wrote, not a later read
            let updated = flight::Entity::update_many()
                .col_expr(
                    flight::Column::RemainingSeats,
                    Expr::col(flight::Column::RemainingSeats).sub(seats),
                )
                .filter(flight::Column::Id.eq(flight_id))
                .filter(flight::Column::RemainingSeats.gte(seats))
                .exec_with_returning(&self.db)
                .await?;

            if let Some(flight) = updated.first() {
                return Ok(Decrement::Applied { remaining: flight.remaining_seats });
            }

            match self.remaining_seats(flight_id).await? {
                None => return Ok(Decrement::NotFound),
                Some(remaining) if remaining < seats => {
                    return Ok(Decrement::Insufficient { remaining });
                }
                // Seats were returned between the update and the read
                Some(_) => continue,
            }
        }

        Err(StoreError::Unavailable(format!(
            "Seat count for flight {} kept changing during decrement",
            flight_id
        )))
    }

    async fn increment_seats(&self, flight_id: Uuid, seats: i32) -> Result<(), StoreError> {
        flight::Entity::update_many()
            .col_expr(
                flight::Column::RemainingSeats,
                Expr::col(flight::Column::RemainingSeats).add(seats),
            )
            .filter(flight::Column::Id.eq(flight_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn find_booking(&self, reference: &str) -> Result<Option<BookingDetails>, StoreError> {
        let Some(booking) = booking::Entity::find()
            .filter(booking::Column::BookingReference.eq(reference))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let passengers = passenger::Entity::find()
            .filter(passenger::Column::BookingId.eq(booking.id))
            .all(&self.db)
            .await?;

        Ok(Some(BookingDetails { booking, passengers }))
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;

    fn flight(id: Uuid, remaining_seats: i32) -> flight::Model {
        flight::Model {
            id,
            flight_number: "FR101".to_string(),
            remaining_seats,
            created_at: chrono::Utc::now().into(),
        }
    }

    fn store(results: Vec<Vec<flight::Model>>) -> SeaOrmInventoryStore {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(results)
            .into_connection();
        SeaOrmInventoryStore::new(db)
    }

    #[tokio::test]
    async fn decrement_reports_count_written_by_the_update() {
        let id = Uuid::new_v4();
        let store = store(vec![vec![flight(id, 3)]]);

        let result = store.decrement_if_available(id, 2).await.unwrap();

        assert_eq!(result, Decrement::Applied { remaining: 3 });
    }

    #[tokio::test]
    async fn insufficient_count_is_below_the_request() {
        let id = Uuid::new_v4();
        let store = store(vec![vec![], vec![flight(id, 1)]]);

        let result = store.decrement_if_available(id, 2).await.unwrap();

        assert_eq!(result, Decrement::Insufficient { remaining: 1 });
    }

    #[tokio::test]
    async fn seats_returned_after_a_miss_are_retried() {
        let id = Uuid::new_v4();
        // Miss, then a read that already shows enough seats again
        let store = store(vec![vec![], vec![flight(id, 4)], vec![flight(id, 2)]]);

        let result = store.decrement_if_available(id, 2).await.unwrap();

        assert_eq!(result, Decrement::Applied { remaining: 2 });
    }

    #[tokio::test]
    async fn missing_flight_is_not_found() {
        let store = store(vec![vec![], vec![]]);

        let result = store.decrement_if_available(Uuid::new_v4(), 1).await.unwrap();

        assert_eq!(result, Decrement::NotFound);
    }
}
