use serde::Serialize;
use uuid::Uuid;

/// Machine-readable failure code carried next to the human message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Invalid,
    Busy,
    NotFound,
    InsufficientInventory,
    Persistence,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReservationError {
    #[error("Invalid reservation request: {0}")]
    Invalid(String),

    /// Another attempt holds the flight lock. Not retried here.
    #[error("System is busy processing other bookings. Please try again.")]
    Busy,

    #[error("Flight {flight_id} not found")]
    NotFound { flight_id: Uuid },

    #[error("Not enough seats available. Only {remaining} left.")]
    InsufficientInventory { remaining: i32, requested: i32 },

    #[error("Booking reference {0} is already in use")]
    DuplicateReference(String),

    #[error("{0}")]
    Persistence(String),

    #[error("Unexpected reservation failure: {0}")]
    Unknown(String),
}

impl ReservationError {
    pub fn reason(&self) -> FailureReason {
        match self {
            ReservationError::Invalid(_) => FailureReason::Invalid,
            ReservationError::Busy => FailureReason::Busy,
            ReservationError::NotFound { .. } => FailureReason::NotFound,
            ReservationError::InsufficientInventory { .. } => FailureReason::InsufficientInventory,
            ReservationError::DuplicateReference(_) | ReservationError::Persistence(_) => {
                FailureReason::Persistence
            }
            ReservationError::Unknown(_) => FailureReason::Unknown,
        }
    }

    /// Seats left on the flight, when the failure knows it.
    pub fn remaining_seats(&self) -> Option<i32> {
        match self {
            ReservationError::InsufficientInventory { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_inventory_reports_remaining() {
        let err = ReservationError::InsufficientInventory { remaining: 1, requested: 3 };

        assert_eq!(err.reason(), FailureReason::InsufficientInventory);
        assert_eq!(err.remaining_seats(), Some(1));
        assert_eq!(err.to_string(), "Not enough seats available. Only 1 left.");
    }

    #[test]
    fn duplicate_reference_is_a_persistence_failure() {
        let err = ReservationError::DuplicateReference("ABCD1234".to_string());

        assert_eq!(err.reason(), FailureReason::Persistence);
        assert_eq!(err.remaining_seats(), None);
    }

    #[test]
    fn reason_serializes_as_snake_case() {
        let value = serde_json::to_value(FailureReason::InsufficientInventory).unwrap();
        assert_eq!(value, serde_json::json!("insufficient_inventory"));
    }
}
