//! Schedule-management shaping: provider-entered work times to and from
//! [`ScheduleRule`] rows.
//!
//! The engine itself only reads schedule snapshots. This module is what a
//! schedule editor uses to validate a new row before handing it to storage, and
//! to display stored rows again.

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SlotError};
use crate::exceptions::parse_original_start;
use crate::model::{RecurringRule, RuleKind, ScheduleRule, SingleOccurrence};
use crate::quantizer::DAY_MINUTES;
use crate::serde_ms::day_start;

/// End date shown for recurring rules, which never end.
pub const OPEN_END: &str = "9999-02-01 00:00:00";

const ROW_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A work time as entered in the schedule editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktimeRequest {
    #[serde(alias = "doctor")]
    pub doctor_id: u32,
    /// `YYYY-MM-DD HH:MM[:SS]`, UTC.
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub rrule: String,
    /// Length of each recurring window, in seconds.
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub recurring_event_id: Option<String>,
    #[serde(default)]
    pub original_start: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

fn parse_timestamp(field: &str, raw: &str) -> Result<NaiveDateTime> {
    parse_original_start(raw)
        .ok_or_else(|| SlotError::Validation(format!("invalid {} '{}'", field, raw)))
}

/// Check that `rrule` is a weekly rule the `rrule` crate accepts when anchored
/// at `start`.
pub fn validate_rrule(rrule: &str, start: NaiveDateTime) -> Result<()> {
    let body = rrule.trim();
    let body = body
        .get(..6)
        .filter(|prefix| prefix.eq_ignore_ascii_case("RRULE:"))
        .map_or(body, |_| &body[6..]);

    if !body.to_ascii_uppercase().contains("FREQ=WEEKLY") {
        return Err(SlotError::InvalidRule(format!(
            "only weekly rules are supported: {}",
            rrule
        )));
    }

    let text = format!("DTSTART:{}Z\nRRULE:{}", start.format("%Y%m%dT%H%M%S"), body);
    text.parse::<RRuleSet>()
        .map(|_| ())
        .map_err(|e| SlotError::InvalidRule(format!("{}", e)))
}

impl WorktimeRequest {
    pub fn is_recurring(&self) -> bool {
        !self.rrule.trim().is_empty()
    }

    /// Validate the request against `now` and build schedule row `id`.
    pub fn to_rule(&self, id: u32, now: DateTime<Utc>) -> Result<ScheduleRule> {
        let start = parse_timestamp("startDate", &self.start_date)?;
        let end = parse_timestamp("endDate", &self.end_date)?;

        if start.and_utc() < now {
            return Err(SlotError::Validation(
                "cannot set work time in the past".to_string(),
            ));
        }
        if start >= end {
            return Err(SlotError::Validation("invalid time interval".to_string()));
        }

        let from = start.hour() * 60 + start.minute();
        let length = if self.duration > 0 {
            i64::from(self.duration / 60)
        } else {
            (end - start).num_minutes()
        };
        if length <= 0 || length > i64::from(DAY_MINUTES) {
            return Err(SlotError::Validation("invalid time interval".to_string()));
        }
        let to = from + length as u32;
        let date = start.date();

        let kind = if self.is_recurring() {
            validate_rrule(&self.rrule, start)?;
            RuleKind::Recurring(RecurringRule {
                effective: date,
                rrule: self.rrule.trim().to_string(),
                duration_seconds: (to - from) * 60,
            })
        } else {
            let parent = self
                .recurring_event_id
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty());
            let original_start = match (parent, self.original_start.as_deref()) {
                (Some(_), None) => {
                    return Err(SlotError::Validation(
                        "originalStart is required for an exception".to_string(),
                    ))
                }
                (Some(_), Some(raw)) => {
                    parse_timestamp("originalStart", raw)?;
                    Some(raw.trim().to_string())
                }
                (None, _) => None,
            };
            RuleKind::Single(SingleOccurrence {
                date,
                recurring_event_id: parent.map(str::to_string),
                original_start,
                deleted: self.deleted,
            })
        };

        debug!(id, doctor = self.doctor_id, from, to, "work time accepted");
        Ok(ScheduleRule { id, from, to, kind })
    }
}

/// A stored schedule row as shown in the schedule editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktimeRow {
    pub id: u32,
    pub doctor_id: u32,
    pub start_date: String,
    pub end_date: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub rrule: String,
    pub duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_start: Option<String>,
    pub deleted: bool,
}

impl WorktimeRow {
    pub fn from_rule(doctor_id: u32, rule: &ScheduleRule) -> Self {
        let at = |date, minutes: u32| {
            (day_start(date) + Duration::minutes(i64::from(minutes)))
                .format(ROW_FORMAT)
                .to_string()
        };

        match &rule.kind {
            RuleKind::Recurring(rec) => Self {
                id: rule.id,
                doctor_id,
                start_date: at(rec.effective, rule.from),
                end_date: OPEN_END.to_string(),
                rrule: rec.rrule.clone(),
                duration: rec.duration_seconds,
                recurring_event_id: None,
                original_start: None,
                deleted: false,
            },
            RuleKind::Single(single) => Self {
                id: rule.id,
                doctor_id,
                start_date: at(single.date, rule.from),
                end_date: at(single.date, rule.to),
                rrule: String::new(),
                duration: rule.to.saturating_sub(rule.from).saturating_mul(60),
                recurring_event_id: single.recurring_event_id.clone(),
                original_start: single.original_start.clone(),
                deleted: single.deleted,
            },
        }
    }
}
