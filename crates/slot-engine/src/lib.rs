//! # slot-engine
//!
//! Availability resolution for appointment booking.
//!
//! Given a provider's schedule (one-off working windows, weekly recurring rules
//! and their exceptions) and its existing bookings, the engine computes the
//! bookable slot blocks a calendar UI draws, and which slot starts are already
//! taken. Windows may run past midnight; bookings that do not land on the slot
//! grid block both neighbouring slots.
//!
//! ## Modules
//!
//! - [`expander`]: BYDAY lists into weekdays and concrete dates
//! - [`exceptions`]: moved and cancelled instances of recurring rules
//! - [`quantizer`]: midnight splitting and booking-to-slot occupancy
//! - [`engine`]: per-provider orchestration into a [`RenderedUnit`]
//! - [`guard`]: booking and cancellation checks in front of a [`BookingStore`]
//! - [`worktime`]: schedule-editor rows to and from [`ScheduleRule`]
//! - [`store`]: persistence collaborator trait and an in-memory store
//! - [`clock`]: injected time sources
//! - [`error`]: Error types

pub mod clock;
pub mod engine;
pub mod error;
pub mod exceptions;
pub mod expander;
pub mod guard;
pub mod model;
pub mod quantizer;
pub mod render;
pub mod serde_ms;
pub mod store;
pub mod worktime;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{render_unit, AvailabilityEngine};
pub use error::SlotError;
pub use exceptions::{Occurrence, ResolvedRule};
pub use guard::{GuardConfig, ReservationGuard};
pub use model::{
    NewReservation, OccupiedSlot, Provider, RenderedUnit, ReservationForm, ScheduleRule, SlotBlock,
};
pub use quantizer::{OccupancyMode, SlotGrid};
pub use store::{BookingStore, MemoryStore, Snapshot, StoreError};
pub use worktime::{WorktimeRequest, WorktimeRow};
