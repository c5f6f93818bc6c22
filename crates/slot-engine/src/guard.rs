//! Booking admission: availability and cutoff checks in front of the store.
//!
//! The guard never locks. Its checks catch ordinary conflicts early; a
//! concurrent duplicate that slips past them is rejected by the store's
//! `(doctorId, date)` uniqueness and surfaces as [`SlotError::AlreadyBooked`].

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::engine::render_unit;
use crate::error::{Result, SlotError};
use crate::model::{NewReservation, OccupiedSlot, Provider};
use crate::quantizer::OccupancyMode;
use crate::store::{BookingStore, StoreError};

/// Cutoff settings for bookings and cancellations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardConfig {
    /// How far in the past a timestamp may lie and still be booked or cancelled.
    pub grace: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            grace: Duration::zero(),
        }
    }
}

impl GuardConfig {
    pub fn with_grace_minutes(minutes: i64) -> Self {
        Self {
            grace: Duration::minutes(minutes),
        }
    }
}

pub struct ReservationGuard<S, C> {
    store: S,
    clock: C,
    config: GuardConfig,
}

impl<S: BookingStore, C: Clock> ReservationGuard<S, C> {
    pub fn new(store: S, clock: C, config: GuardConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn cutoff(&self) -> DateTime<Utc> {
        self.clock.now() - self.config.grace
    }

    fn provider(&self, doctor_id: u32) -> Result<Provider> {
        self.store
            .provider(doctor_id)?
            .ok_or(SlotError::NotFound {
                kind: "doctor",
                id: doctor_id,
            })
    }

    /// Verify that `at` can be booked with provider `doctor_id`.
    ///
    /// Fails with `AlreadyBooked` when a booking starts at `at` or the slot at
    /// `at` is shown as taken, and with `Expired` when `at` is before the cutoff.
    pub fn check_available(&self, doctor_id: u32, at: DateTime<Utc>) -> Result<()> {
        let provider = self.provider(doctor_id)?;

        if provider.occupied_slots.iter().any(|slot| slot.date == at) {
            return Err(SlotError::AlreadyBooked { doctor_id, at });
        }
        let unit = render_unit(&provider, self.clock.today(), OccupancyMode::Snap);
        if unit.used_slots.binary_search(&at).is_ok() {
            return Err(SlotError::AlreadyBooked { doctor_id, at });
        }

        if at < self.cutoff() {
            return Err(SlotError::Expired("booking"));
        }
        Ok(())
    }

    /// Validate and persist a reservation, returning its id.
    pub fn reserve(&mut self, request: &NewReservation) -> Result<u32> {
        request.validate()?;
        self.check_available(request.doctor_id, request.date)?;

        let id = self
            .store
            .insert_reservation(request)
            .map_err(|err| match err {
                StoreError::Conflict { doctor_id, at } => SlotError::AlreadyBooked { doctor_id, at },
                other => SlotError::Storage(other),
            })?;
        info!(
            id,
            doctor = request.doctor_id,
            at = %request.date,
            "reservation created"
        );
        Ok(id)
    }

    /// Delete reservation `id` unless its start is already past the cutoff.
    pub fn cancel_reservation(&mut self, id: u32) -> Result<()> {
        let slot = self
            .store
            .reservation(id)?
            .ok_or(SlotError::NotFound {
                kind: "reservation",
                id,
            })?;
        if slot.date < self.cutoff() {
            return Err(SlotError::Expired("reservation"));
        }

        self.store.delete_reservation(id)?;
        info!(id, doctor = slot.doctor_id, "reservation cancelled");
        Ok(())
    }

    /// Stored bookings that sit exactly on a slot currently offered by their
    /// provider.
    pub fn active_reservations(&self) -> Result<Vec<OccupiedSlot>> {
        let horizon = self.clock.today();
        let mut active = Vec::new();
        for provider in self.store.providers()? {
            let unit = render_unit(&provider, horizon, OccupancyMode::Exact);
            let before = active.len();
            active.extend(
                provider
                    .occupied_slots
                    .into_iter()
                    .filter(|slot| unit.used_slots.binary_search(&slot.date).is_ok()),
            );
            debug!(
                doctor = provider.id,
                count = active.len() - before,
                "active reservations"
            );
        }
        active.sort_by_key(|slot| (slot.date, slot.id));
        Ok(active)
    }
}
