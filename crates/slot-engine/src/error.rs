//! Error types for slot-engine operations.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum SlotError {
    /// Malformed input rejected before any mutation.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    /// The requested slot is already taken for this provider.
    #[error("this time is already booked (doctor {doctor_id}, {at})")]
    AlreadyBooked { doctor_id: u32, at: DateTime<Utc> },

    /// The booking or cancellation falls before the allowed cutoff.
    #[error("{0} time has expired")]
    Expired(&'static str),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u32 },

    /// Failures reported by the persistence collaborator, passed through as-is.
    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SlotError>;
