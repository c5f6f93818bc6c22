//! Exception reconciliation for recurring rules.
//!
//! An exception row points at one instance of a recurring rule through
//! `recurringEventId` + `originalStart`. It either moves that instance to a new
//! date/window or deletes it. [`resolve`] turns a rule and its exceptions into a
//! flat list of [`Occurrence`]s, one entry per affected original instance.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use tracing::{debug, warn};

use crate::expander;
use crate::model::{RecurringRule, ScheduleRule};

/// A concrete working window on one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneOff {
    pub date: NaiveDate,
    pub from: u32,
    pub to: u32,
    /// Recurring rule this instance was moved from, if any.
    pub parent: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Removed by an exception row with `deleted = true`.
    Deleted,
    /// Falls between the horizon start and the rule's effective date.
    BeforeEffective,
}

/// Resolved state of one instance of a recurring rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    Scheduled { date: NaiveDate },
    Moved { original: NaiveDate, to: OneOff },
    Cancelled { date: NaiveDate, reason: CancelReason },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExceptionIssue {
    /// `originalStart` is not a `YYYY-MM-DD HH:MM` timestamp.
    Unparseable(String),
    /// The original instance is not one the rule produces (wrong weekday or start).
    NotLinked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedException {
    pub id: u32,
    pub issue: ExceptionIssue,
}

/// A recurring rule with its exceptions applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRule {
    pub id: u32,
    pub from: u32,
    pub to: u32,
    pub weekdays: Vec<Weekday>,
    pub effective: NaiveDate,
    /// Moved and cancelled instances, in exception order. Instances not listed
    /// here are scheduled.
    pub occurrences: Vec<Occurrence>,
    pub rejected: Vec<RejectedException>,
}

impl ResolvedRule {
    /// Instances that were moved elsewhere.
    pub fn moved(&self) -> impl Iterator<Item = &OneOff> + '_ {
        self.occurrences.iter().filter_map(|occ| match occ {
            Occurrence::Moved { to, .. } => Some(to),
            _ => None,
        })
    }

    /// Dates on which the rule's own instance does not take place.
    pub fn removed_dates(&self) -> BTreeSet<NaiveDate> {
        self.occurrences
            .iter()
            .filter_map(|occ| match occ {
                Occurrence::Moved { original, .. } => Some(*original),
                Occurrence::Cancelled { date, .. } => Some(*date),
                Occurrence::Scheduled { .. } => None,
            })
            .collect()
    }

    /// True when an explicit cancellation covers `one_off`'s start.
    ///
    /// A moved instance is not hidden by the removal of the original it replaces.
    pub fn cancels(&self, one_off: &OneOff) -> bool {
        one_off.from == self.from
            && self.occurrences.iter().any(|occ| {
                matches!(occ, Occurrence::Cancelled { date, .. } if *date == one_off.date)
            })
    }

    /// State of the rule's instance on `date`, or `None` if the rule does not
    /// occur on that weekday.
    pub fn state_on(&self, date: NaiveDate) -> Option<Occurrence> {
        if !self.weekdays.contains(&date.weekday()) {
            return None;
        }
        let moved = self.occurrences.iter().find(
            |occ| matches!(occ, Occurrence::Moved { original, .. } if *original == date),
        );
        let cancelled = self.occurrences.iter().find(
            |occ| matches!(occ, Occurrence::Cancelled { date: d, .. } if *d == date),
        );
        if let Some(occ) = moved.or(cancelled) {
            return Some(*occ);
        }
        if date < self.effective {
            return Some(Occurrence::Cancelled {
                date,
                reason: CancelReason::BeforeEffective,
            });
        }
        Some(Occurrence::Scheduled { date })
    }

    /// Cancel every instance between `horizon` and the effective date.
    pub fn seed_pre_effective(&mut self, horizon: NaiveDate) {
        for date in expander::pre_effective_dates(&self.weekdays, horizon, self.effective) {
            self.occurrences.push(Occurrence::Cancelled {
                date,
                reason: CancelReason::BeforeEffective,
            });
        }
    }
}

/// Parse an `originalStart` value. Seconds are tolerated.
pub fn parse_original_start(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Apply `exceptions` to the recurring rule `rule`.
///
/// `weekdays` is the rule's expanded BYDAY list. Exceptions whose original
/// instance does not match one of `(weekday, rule.from)` are inert; malformed
/// ones are logged and dropped. Neither aborts the resolution.
pub fn resolve(
    rule: &ScheduleRule,
    recurring: &RecurringRule,
    weekdays: Vec<Weekday>,
    exceptions: &[&ScheduleRule],
) -> ResolvedRule {
    let mut resolved = ResolvedRule {
        id: rule.id,
        from: rule.from,
        to: rule.to,
        weekdays,
        effective: recurring.effective,
        occurrences: Vec::new(),
        rejected: Vec::new(),
    };

    for exception in exceptions {
        let Some(single) = exception.as_single() else {
            continue;
        };
        let raw = single.original_start.as_deref().unwrap_or_default();

        let Some(original) = parse_original_start(raw) else {
            warn!(
                rule = rule.id,
                exception = exception.id,
                original_start = raw,
                "cannot parse originalStart, exception dropped"
            );
            resolved.rejected.push(RejectedException {
                id: exception.id,
                issue: ExceptionIssue::Unparseable(raw.to_string()),
            });
            continue;
        };

        let original_from = original.hour() * 60 + original.minute();
        let original_day = original.date();
        if original_from != rule.from || !resolved.weekdays.contains(&original_day.weekday()) {
            debug!(
                rule = rule.id,
                exception = exception.id,
                "exception does not match any instance of its rule"
            );
            resolved.rejected.push(RejectedException {
                id: exception.id,
                issue: ExceptionIssue::NotLinked,
            });
            continue;
        }

        let occurrence = if single.deleted {
            Occurrence::Cancelled {
                date: original_day,
                reason: CancelReason::Deleted,
            }
        } else {
            Occurrence::Moved {
                original: original_day,
                to: OneOff {
                    date: single.date,
                    from: exception.from,
                    to: exception.to,
                    parent: Some(rule.id),
                },
            }
        };
        resolved.occurrences.push(occurrence);
    }

    resolved
}
