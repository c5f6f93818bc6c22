//! Weekly recurrence expansion -- BYDAY lists into weekdays and concrete dates.
//!
//! Only `FREQ=WEEKLY` rules with a `BYDAY` list are meaningful here; every other
//! RRULE part is ignored. All dates are UTC calendar days.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use tracing::warn;

const WEEK: [(&str, Weekday); 7] = [
    ("SU", Weekday::Sun),
    ("MO", Weekday::Mon),
    ("TU", Weekday::Tue),
    ("WE", Weekday::Wed),
    ("TH", Weekday::Thu),
    ("FR", Weekday::Fri),
    ("SA", Weekday::Sat),
];

/// Map a two-letter iCalendar weekday code (any case) to a [`Weekday`].
pub fn weekday_from_code(code: &str) -> Option<Weekday> {
    let code = code.trim();
    WEEK.iter()
        .find(|(abbr, _)| abbr.eq_ignore_ascii_case(code))
        .map(|(_, day)| *day)
}

/// Extract the weekdays named by the `BYDAY=` part of an RRULE string.
///
/// The result keeps the order of first appearance and contains no duplicates.
/// Unknown codes are skipped with a warning; a missing or empty `BYDAY` yields
/// an empty list.
///
/// ```
/// use chrono::Weekday;
/// use slot_engine::expander::weekdays_from_rrule;
///
/// let days = weekdays_from_rrule("FREQ=WEEKLY;INTERVAL=1;BYDAY=fr,WE,MO,FR");
/// assert_eq!(days, vec![Weekday::Fri, Weekday::Wed, Weekday::Mon]);
/// ```
pub fn weekdays_from_rrule(rrule: &str) -> Vec<Weekday> {
    let Some(list) = byday_list(rrule) else {
        return Vec::new();
    };

    let mut days = Vec::with_capacity(7);
    for code in list.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        match weekday_from_code(code) {
            Some(day) if !days.contains(&day) => days.push(day),
            Some(_) => {}
            None => warn!(code, rrule, "invalid day abbreviation in BYDAY"),
        }
    }
    days
}

fn byday_list(rrule: &str) -> Option<&str> {
    let rrule = rrule.trim();
    let rrule = rrule
        .get(..6)
        .filter(|prefix| prefix.eq_ignore_ascii_case("RRULE:"))
        .map_or(rrule, |_| &rrule[6..]);

    rrule.split(';').find_map(|part| {
        let (key, value) = part.split_once('=')?;
        key.trim().eq_ignore_ascii_case("BYDAY").then_some(value)
    })
}

/// First date on or after `start` that falls on `day`.
pub fn next_on_or_after(start: NaiveDate, day: Weekday) -> NaiveDate {
    let offset = (7 + day.num_days_from_sunday() - start.weekday().num_days_from_sunday()) % 7;
    start + Duration::days(offset as i64)
}

/// How far past the horizon start pre-effective dates are listed.
pub const PRE_EFFECTIVE_WEEKS: i64 = 53;

/// Dates the rule would have produced between the horizon start and the day it
/// takes effect.
///
/// For every weekday, walks forward in 7-day steps from its first occurrence on
/// or after `horizon` while the date is strictly before `effective`. These are
/// the occurrences the calendar must not show. The walk stops after
/// [`PRE_EFFECTIVE_WEEKS`] weeks. Results are grouped by weekday in the order
/// of `days`.
pub fn pre_effective_dates(days: &[Weekday], horizon: NaiveDate, effective: NaiveDate) -> Vec<NaiveDate> {
    let limit = horizon
        .checked_add_signed(Duration::weeks(PRE_EFFECTIVE_WEEKS))
        .map_or(effective, |limit| limit.min(effective));
    let mut dates = Vec::new();
    for &day in days {
        let first = next_on_or_after(horizon, day);
        let weekly = std::iter::successors(Some(first), |d| d.checked_add_signed(Duration::weeks(1)));
        dates.extend(weekly.take_while(|d| *d < limit));
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_rrule_prefix() {
        assert_eq!(
            weekdays_from_rrule("RRULE:FREQ=WEEKLY;BYDAY=TU"),
            vec![Weekday::Tue]
        );
    }

    #[test]
    fn next_on_or_after_same_day_is_zero_offset() {
        let monday = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        assert_eq!(next_on_or_after(monday, Weekday::Mon), monday);
        assert_eq!(
            next_on_or_after(monday, Weekday::Sun),
            NaiveDate::from_ymd_opt(2026, 3, 22).unwrap()
        );
    }
}
