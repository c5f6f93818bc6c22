//! Injected time sources.
//!
//! Nothing in the engine reads the wall clock directly. Callers hand a [`Clock`]
//! to the [`crate::engine::AvailabilityEngine`] and [`crate::guard::ReservationGuard`];
//! tests use [`FixedClock`].

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Source of "now" for horizon and cutoff computations.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Start of the rolling horizon: today at 00:00 UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time shifted by a fixed offset.
///
/// The offset lets a demo deployment pretend to live a few hours in the past so
/// that seeded bookings stay visible. Production uses [`SystemClock::default`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    pub offset: Duration,
}

impl SystemClock {
    pub fn with_offset(offset: Duration) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + self.offset
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
