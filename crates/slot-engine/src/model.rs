//! Provider snapshot types consumed by the engine and the units it renders.
//!
//! Field names follow the booking UI's JSON (`camelCase`, dates as epoch-ms).

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotError};
use crate::quantizer::DAY_MINUTES;
use crate::serde_ms;

/// Aggregated rating shown next to a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub count: u32,
    pub stars: u32,
}

/// A service provider ("doctor") with its schedule and bookings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub review: Review,
    /// Length of one bookable slot, in minutes.
    pub slot_size: u32,
    /// Idle minutes between two consecutive slots.
    #[serde(default)]
    pub gap: u32,
    #[serde(default)]
    pub schedule: Vec<ScheduleRule>,
    #[serde(default)]
    pub occupied_slots: Vec<OccupiedSlot>,
}

impl Provider {
    pub fn validate(&self) -> Result<()> {
        if self.slot_size == 0 {
            return Err(SlotError::Validation(format!(
                "doctor {}: slot size must be positive",
                self.id
            )));
        }
        if self.slot_size.saturating_add(self.gap) > DAY_MINUTES {
            return Err(SlotError::Validation(format!(
                "doctor {}: slot size plus gap must not exceed a day",
                self.id
            )));
        }
        for rule in &self.schedule {
            if rule.from >= rule.to || rule.from >= DAY_MINUTES || rule.to > 2 * DAY_MINUTES {
                return Err(SlotError::Validation(format!(
                    "doctor {}: schedule {} has an invalid time interval",
                    self.id, rule.id
                )));
            }
        }
        Ok(())
    }
}

/// One row of a provider's availability configuration.
///
/// `from`/`to` are minutes of day; `to` may exceed 1440 for windows that run
/// past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRule", into = "RawRule")]
pub struct ScheduleRule {
    pub id: u32,
    pub from: u32,
    pub to: u32,
    pub kind: RuleKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    Single(SingleOccurrence),
    Recurring(RecurringRule),
}

/// A one-off working window, or an exception to a recurring rule when
/// `recurring_event_id` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleOccurrence {
    pub date: NaiveDate,
    pub recurring_event_id: Option<String>,
    /// `YYYY-MM-DD HH:MM` of the recurring instance this row replaces or cancels.
    pub original_start: Option<String>,
    pub deleted: bool,
}

impl SingleOccurrence {
    /// Id of the recurring rule this exception belongs to, if any.
    pub fn parent_id(&self) -> Option<&str> {
        self.recurring_event_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringRule {
    /// First day on which the rule takes effect.
    pub effective: NaiveDate,
    pub rrule: String,
    pub duration_seconds: u32,
}

impl ScheduleRule {
    pub fn single(id: u32, from: u32, to: u32, date: NaiveDate) -> Self {
        Self {
            id,
            from,
            to,
            kind: RuleKind::Single(SingleOccurrence {
                date,
                recurring_event_id: None,
                original_start: None,
                deleted: false,
            }),
        }
    }

    pub fn recurring(id: u32, from: u32, to: u32, effective: NaiveDate, rrule: &str) -> Self {
        Self {
            id,
            from,
            to,
            kind: RuleKind::Recurring(RecurringRule {
                effective,
                rrule: rrule.to_string(),
                duration_seconds: to.saturating_sub(from).saturating_mul(60),
            }),
        }
    }

    /// An exception row tied to recurring rule `parent`.
    pub fn exception(
        id: u32,
        parent: u32,
        from: u32,
        to: u32,
        date: NaiveDate,
        original_start: &str,
        deleted: bool,
    ) -> Self {
        Self {
            id,
            from,
            to,
            kind: RuleKind::Single(SingleOccurrence {
                date,
                recurring_event_id: Some(parent.to_string()),
                original_start: Some(original_start.to_string()),
                deleted,
            }),
        }
    }

    pub fn as_single(&self) -> Option<&SingleOccurrence> {
        match &self.kind {
            RuleKind::Single(single) => Some(single),
            RuleKind::Recurring(_) => None,
        }
    }

    pub fn as_recurring(&self) -> Option<&RecurringRule> {
        match &self.kind {
            RuleKind::Recurring(rec) => Some(rec),
            RuleKind::Single(_) => None,
        }
    }
}

/// Flat wire shape of a schedule row. A non-empty `rrule` selects the recurring
/// variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRule {
    id: u32,
    from: u32,
    to: u32,
    #[serde(with = "serde_ms::date")]
    date: NaiveDate,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    rrule: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    duration_seconds: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recurring_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    original_start: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    deleted: bool,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl From<RawRule> for ScheduleRule {
    fn from(raw: RawRule) -> Self {
        let kind = if raw.rrule.trim().is_empty() {
            RuleKind::Single(SingleOccurrence {
                date: raw.date,
                recurring_event_id: raw.recurring_event_id,
                original_start: raw.original_start,
                deleted: raw.deleted,
            })
        } else {
            RuleKind::Recurring(RecurringRule {
                effective: raw.date,
                rrule: raw.rrule,
                duration_seconds: raw.duration_seconds,
            })
        };
        Self {
            id: raw.id,
            from: raw.from,
            to: raw.to,
            kind,
        }
    }
}

impl From<ScheduleRule> for RawRule {
    fn from(rule: ScheduleRule) -> Self {
        let mut raw = RawRule {
            id: rule.id,
            from: rule.from,
            to: rule.to,
            date: NaiveDate::MIN,
            rrule: String::new(),
            duration_seconds: 0,
            recurring_event_id: None,
            original_start: None,
            deleted: false,
        };
        match rule.kind {
            RuleKind::Single(single) => {
                raw.date = single.date;
                raw.recurring_event_id = single.recurring_event_id;
                raw.original_start = single.original_start;
                raw.deleted = single.deleted;
            }
            RuleKind::Recurring(rec) => {
                raw.date = rec.effective;
                raw.rrule = rec.rrule;
                raw.duration_seconds = rec.duration_seconds;
            }
        }
        raw
    }
}

/// A confirmed booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupiedSlot {
    pub id: u32,
    pub doctor_id: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub client_details: String,
}

/// Client contact fields of a reservation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub details: String,
}

/// Body of a booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
    #[serde(alias = "doctor")]
    pub doctor_id: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    pub form: ReservationForm,
}

impl NewReservation {
    pub fn validate(&self) -> Result<()> {
        if self.form.name.trim().is_empty() {
            return Err(SlotError::Validation("client name is required".to_string()));
        }
        if !self.form.email.contains('@') {
            return Err(SlotError::Validation(format!(
                "invalid client email '{}'",
                self.form.email
            )));
        }
        Ok(())
    }
}

/// One displayable availability window.
///
/// Recurring patterns carry `days` (and the concrete dates they also cover);
/// one-off windows carry only `dates`. A block with `from == to` marks
/// cancelled occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotBlock {
    #[serde(with = "serde_ms::hhmm")]
    pub from: u32,
    #[serde(with = "serde_ms::hhmm")]
    pub to: u32,
    pub size: u32,
    pub gap: u32,
    #[serde(with = "serde_ms::weekdays", default, skip_serializing_if = "Vec::is_empty")]
    pub days: Vec<Weekday>,
    #[serde(with = "serde_ms::dates", default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<NaiveDate>,
}

impl SlotBlock {
    pub fn is_cancelled_marker(&self) -> bool {
        self.from == self.to
    }
}

/// The engine's output for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedUnit {
    pub id: u32,
    pub title: String,
    pub category: String,
    pub subtitle: String,
    pub details: String,
    pub preview: String,
    pub price: String,
    pub review: Review,
    pub slots: Vec<SlotBlock>,
    /// Start times of slots already taken, ascending.
    #[serde(with = "serde_ms::instants")]
    pub used_slots: Vec<DateTime<Utc>>,
}

impl RenderedUnit {
    /// Display fields only; no blocks, no occupancy.
    pub fn display(provider: &Provider) -> Self {
        Self {
            id: provider.id,
            title: provider.name.clone(),
            category: provider.category.clone(),
            subtitle: provider.subtitle.clone(),
            details: provider.details.clone(),
            preview: provider.image_url.clone(),
            price: provider.price.clone(),
            review: provider.review,
            slots: Vec::new(),
            used_slots: Vec::new(),
        }
    }
}
