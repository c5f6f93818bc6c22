//! Tests for resolving recurring-rule exceptions into occurrences.

use chrono::{NaiveDate, Weekday};
use slot_engine::exceptions::{
    parse_original_start, resolve, CancelReason, ExceptionIssue, OneOff, Occurrence, ResolvedRule,
};
use slot_engine::model::ScheduleRule;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Weekly rule 10: Monday and Wednesday 09:00-12:00 from 2026-03-02.
fn rule() -> ScheduleRule {
    ScheduleRule::recurring(10, 540, 720, date(2026, 3, 2), "FREQ=WEEKLY;BYDAY=MO,WE")
}

fn resolve_with(exceptions: &[ScheduleRule]) -> ResolvedRule {
    let rule = rule();
    let refs: Vec<&ScheduleRule> = exceptions.iter().collect();
    resolve(
        &rule,
        rule.as_recurring().unwrap(),
        vec![Weekday::Mon, Weekday::Wed],
        &refs,
    )
}

// ── Linking ─────────────────────────────────────────────────────────────────

#[test]
fn deleted_exception_cancels_the_original() {
    let res = resolve_with(&[ScheduleRule::exception(
        11,
        10,
        540,
        720,
        date(2026, 3, 16),
        "2026-03-16 09:00",
        true,
    )]);
    assert_eq!(
        res.occurrences,
        vec![Occurrence::Cancelled {
            date: date(2026, 3, 16),
            reason: CancelReason::Deleted,
        }]
    );
    assert!(res.rejected.is_empty());
    assert_eq!(res.moved().count(), 0);
}

#[test]
fn moved_exception_relocates_the_original() {
    let res = resolve_with(&[ScheduleRule::exception(
        12,
        10,
        600,
        780,
        date(2026, 3, 19),
        "2026-03-18 09:00",
        false,
    )]);
    let moved = OneOff {
        date: date(2026, 3, 19),
        from: 600,
        to: 780,
        parent: Some(10),
    };
    assert_eq!(
        res.occurrences,
        vec![Occurrence::Moved {
            original: date(2026, 3, 18),
            to: moved,
        }]
    );
    assert_eq!(res.moved().collect::<Vec<_>>(), vec![&moved]);
    assert_eq!(
        res.removed_dates().into_iter().collect::<Vec<_>>(),
        vec![date(2026, 3, 18)]
    );
}

#[test]
fn wrong_weekday_is_not_linked() {
    // 2026-03-17 is a Tuesday.
    let res = resolve_with(&[ScheduleRule::exception(
        13,
        10,
        540,
        720,
        date(2026, 3, 17),
        "2026-03-17 09:00",
        true,
    )]);
    assert!(res.occurrences.is_empty());
    assert_eq!(res.rejected[0].id, 13);
    assert_eq!(res.rejected[0].issue, ExceptionIssue::NotLinked);
}

#[test]
fn wrong_start_time_is_not_linked() {
    let res = resolve_with(&[ScheduleRule::exception(
        14,
        10,
        600,
        720,
        date(2026, 3, 16),
        "2026-03-16 10:00",
        true,
    )]);
    assert!(res.occurrences.is_empty());
    assert_eq!(res.rejected[0].issue, ExceptionIssue::NotLinked);
}

#[test]
fn unparseable_original_start_is_dropped_and_others_still_apply() {
    let res = resolve_with(&[
        ScheduleRule::exception(15, 10, 540, 720, date(2026, 3, 16), "16/03/2026 9am", true),
        ScheduleRule::exception(16, 10, 540, 720, date(2026, 3, 23), "2026-03-23 09:00", true),
    ]);
    assert_eq!(
        res.rejected[0].issue,
        ExceptionIssue::Unparseable("16/03/2026 9am".to_string())
    );
    assert_eq!(
        res.occurrences,
        vec![Occurrence::Cancelled {
            date: date(2026, 3, 23),
            reason: CancelReason::Deleted,
        }]
    );
}

#[test]
fn original_start_with_seconds_is_accepted() {
    assert!(parse_original_start("2026-03-16 09:00:00").is_some());
    assert!(parse_original_start(" 2026-03-16 09:00 ").is_some());
    assert!(parse_original_start("2026-03-16T09:00").is_none());
    assert!(parse_original_start("").is_none());
}

// ── Occurrence states ───────────────────────────────────────────────────────

#[test]
fn state_on_reports_each_instance_once() {
    let mut res = resolve_with(&[
        ScheduleRule::exception(17, 10, 540, 720, date(2026, 3, 16), "2026-03-16 09:00", true),
        ScheduleRule::exception(18, 10, 600, 660, date(2026, 3, 20), "2026-03-18 09:00", false),
    ]);
    res.seed_pre_effective(date(2026, 2, 23));

    assert!(matches!(
        res.state_on(date(2026, 3, 16)),
        Some(Occurrence::Cancelled { reason: CancelReason::Deleted, .. })
    ));
    assert!(matches!(
        res.state_on(date(2026, 3, 18)),
        Some(Occurrence::Moved { .. })
    ));
    assert_eq!(
        res.state_on(date(2026, 3, 23)),
        Some(Occurrence::Scheduled { date: date(2026, 3, 23) })
    );
    assert_eq!(
        res.state_on(date(2026, 2, 25)),
        Some(Occurrence::Cancelled {
            date: date(2026, 2, 25),
            reason: CancelReason::BeforeEffective,
        })
    );
    // Tuesday: the rule does not occur.
    assert_eq!(res.state_on(date(2026, 3, 17)), None);
}

#[test]
fn seeding_cancels_instances_before_effective() {
    let mut res = resolve_with(&[]);
    res.seed_pre_effective(date(2026, 2, 23));
    assert_eq!(
        res.removed_dates().into_iter().collect::<Vec<_>>(),
        vec![date(2026, 2, 23), date(2026, 2, 25)]
    );
}

#[test]
fn cancels_only_matches_explicit_cancellations() {
    let res = resolve_with(&[
        ScheduleRule::exception(19, 10, 540, 720, date(2026, 3, 16), "2026-03-16 09:00", true),
        ScheduleRule::exception(20, 10, 540, 720, date(2026, 3, 18), "2026-03-11 09:00", false),
    ]);
    let on = |date, from| OneOff {
        date,
        from,
        to: 720,
        parent: Some(10),
    };
    assert!(res.cancels(&on(date(2026, 3, 16), 540)));
    assert!(!res.cancels(&on(date(2026, 3, 16), 600)));
    assert!(!res.cancels(&on(date(2026, 3, 18), 540)));
}
