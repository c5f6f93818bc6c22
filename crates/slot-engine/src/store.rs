//! Persistence collaborator interface and an in-memory implementation.
//!
//! The engine never loads or saves anything itself. [`BookingStore`] is the seam
//! through which the [`crate::guard::ReservationGuard`] reads provider snapshots
//! and writes reservations. Implementations must enforce uniqueness of
//! `(doctorId, date)` atomically and report violations as
//! [`StoreError::Conflict`]; the guard's availability check alone cannot prevent
//! two concurrent requests from both passing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;
use crate::model::{NewReservation, OccupiedSlot, Provider};

#[derive(Error, Debug)]
pub enum StoreError {
    /// A reservation for this provider and time already exists.
    #[error("reservation already exists for doctor {doctor_id} at {at}")]
    Conflict { doctor_id: u32, at: DateTime<Utc> },

    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub trait BookingStore {
    /// Every provider with its schedule rows and bookings.
    fn providers(&self) -> std::result::Result<Vec<Provider>, StoreError>;

    fn provider(&self, doctor_id: u32) -> std::result::Result<Option<Provider>, StoreError>;

    fn reservation(&self, id: u32) -> std::result::Result<Option<OccupiedSlot>, StoreError>;

    /// Persist a reservation and return its id.
    fn insert_reservation(
        &mut self,
        reservation: &NewReservation,
    ) -> std::result::Result<u32, StoreError>;

    fn delete_reservation(&mut self, id: u32) -> std::result::Result<(), StoreError>;
}

/// JSON document holding a full set of providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub doctors: Vec<Provider>,
}

impl Snapshot {
    /// Parse and validate a snapshot document.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| crate::SlotError::Validation(format!("invalid snapshot: {}", e)))?;
        for doctor in &snapshot.doctors {
            doctor.validate()?;
        }
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::SlotError::Validation(format!("cannot serialize snapshot: {}", e)))
    }
}

/// A [`BookingStore`] over an owned [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Snapshot,
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Snapshot::from_json(json).map(Self::new)
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }

    fn next_id(&self) -> u32 {
        self.snapshot
            .doctors
            .iter()
            .flat_map(|d| d.occupied_slots.iter())
            .map(|slot| slot.id)
            .max()
            .unwrap_or(0)
            + 1
    }
}

impl BookingStore for MemoryStore {
    fn providers(&self) -> std::result::Result<Vec<Provider>, StoreError> {
        Ok(self.snapshot.doctors.clone())
    }

    fn provider(&self, doctor_id: u32) -> std::result::Result<Option<Provider>, StoreError> {
        Ok(self
            .snapshot
            .doctors
            .iter()
            .find(|d| d.id == doctor_id)
            .cloned())
    }

    fn reservation(&self, id: u32) -> std::result::Result<Option<OccupiedSlot>, StoreError> {
        Ok(self
            .snapshot
            .doctors
            .iter()
            .flat_map(|d| d.occupied_slots.iter())
            .find(|slot| slot.id == id)
            .cloned())
    }

    fn insert_reservation(
        &mut self,
        reservation: &NewReservation,
    ) -> std::result::Result<u32, StoreError> {
        let id = self.next_id();
        let doctor = self
            .snapshot
            .doctors
            .iter_mut()
            .find(|d| d.id == reservation.doctor_id)
            .ok_or_else(|| {
                StoreError::Backend(format!("doctor {} does not exist", reservation.doctor_id).into())
            })?;

        if doctor
            .occupied_slots
            .iter()
            .any(|slot| slot.date == reservation.date)
        {
            return Err(StoreError::Conflict {
                doctor_id: reservation.doctor_id,
                at: reservation.date,
            });
        }

        doctor.occupied_slots.push(OccupiedSlot {
            id,
            doctor_id: reservation.doctor_id,
            date: reservation.date,
            client_name: reservation.form.name.clone(),
            client_email: reservation.form.email.clone(),
            client_details: reservation.form.details.clone(),
        });
        Ok(id)
    }

    fn delete_reservation(&mut self, id: u32) -> std::result::Result<(), StoreError> {
        for doctor in &mut self.snapshot.doctors {
            if let Some(pos) = doctor.occupied_slots.iter().position(|slot| slot.id == id) {
                doctor.occupied_slots.remove(pos);
                return Ok(());
            }
        }
        Err(StoreError::Backend(
            format!("reservation {} does not exist", id).into(),
        ))
    }
}
