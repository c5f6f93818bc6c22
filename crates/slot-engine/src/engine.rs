//! Per-provider availability resolution.
//!
//! Reconciles a provider's one-off windows, recurring weekly rules with their
//! exceptions, and existing bookings into the [`RenderedUnit`] the booking UI
//! draws its calendar from.
//!
//! The computation is pure: the only input besides the provider snapshot is the
//! horizon start (today, UTC), taken from an injected [`Clock`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::exceptions::{self, Occurrence, OneOff, ResolvedRule};
use crate::expander;
use crate::model::{Provider, RenderedUnit, RuleKind, ScheduleRule, SlotBlock};
use crate::quantizer::{self, OccupancyMode, SlotGrid};
use crate::serde_ms::day_start;

/// Renders providers against a clock.
#[derive(Debug, Clone)]
pub struct AvailabilityEngine<C> {
    clock: C,
    mode: OccupancyMode,
}

impl<C: Clock> AvailabilityEngine<C> {
    /// An engine in [`OccupancyMode::Snap`], the mode used for display.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            mode: OccupancyMode::Snap,
        }
    }

    pub fn with_mode(mut self, mode: OccupancyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn render(&self, provider: &Provider) -> RenderedUnit {
        render_unit(provider, self.clock.today(), self.mode)
    }

    pub fn render_all(&self, providers: &[Provider]) -> Vec<RenderedUnit> {
        let horizon = self.clock.today();
        providers
            .iter()
            .map(|p| render_unit(p, horizon, self.mode))
            .collect()
    }
}

/// Dates seen on each weekday, indexed Sunday = 0.
#[derive(Debug, Default)]
struct WeekDates([Vec<NaiveDate>; 7]);

impl WeekDates {
    fn record(&mut self, date: NaiveDate) {
        self.0[date.weekday().num_days_from_sunday() as usize].push(date);
    }

    fn on(&self, day: chrono::Weekday) -> &[NaiveDate] {
        &self.0[day.num_days_from_sunday() as usize]
    }
}

/// Compute the rendered availability of `provider` from `horizon` onwards.
///
/// Bookings, one-off windows and exception rows dated before `horizon` are
/// ignored.
pub fn render_unit(provider: &Provider, horizon: NaiveDate, mode: OccupancyMode) -> RenderedUnit {
    let mut unit = RenderedUnit::display(provider);
    if provider.slot_size == 0 {
        warn!(doctor = provider.id, "slot size is zero, no availability rendered");
        return unit;
    }

    let horizon_start = day_start(horizon);
    let bookings: Vec<DateTime<Utc>> = provider
        .occupied_slots
        .iter()
        .map(|slot| slot.date)
        .filter(|date| *date >= horizon_start)
        .collect();
    let grid = |from: u32, to: u32| SlotGrid::new(from, to, provider.slot_size, provider.gap);

    // Partition rows.
    let mut plain: Vec<OneOff> = Vec::new();
    let mut recurring = Vec::new();
    let mut exceptions_by_parent: BTreeMap<&str, Vec<&ScheduleRule>> = BTreeMap::new();
    for rule in &provider.schedule {
        match &rule.kind {
            RuleKind::Single(single) => {
                if single.date < horizon {
                    continue;
                }
                if let Some(parent) = single.parent_id() {
                    exceptions_by_parent.entry(parent).or_default().push(rule);
                } else if !single.deleted {
                    plain.push(OneOff {
                        date: single.date,
                        from: rule.from,
                        to: rule.to,
                        parent: None,
                    });
                }
            }
            RuleKind::Recurring(rec) => recurring.push((rule, rec)),
        }
    }

    // Resolve recurring rules against their exceptions.
    let resolved: Vec<ResolvedRule> = recurring
        .into_iter()
        .map(|(rule, rec)| {
            let weekdays = expander::weekdays_from_rrule(&rec.rrule);
            let key = rule.id.to_string();
            let exceptions = exceptions_by_parent
                .get(key.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            let mut res = exceptions::resolve(rule, rec, weekdays, exceptions);
            res.seed_pre_effective(horizon);
            res
        })
        .collect();
    let by_id: BTreeMap<u32, &ResolvedRule> = resolved.iter().map(|r| (r.id, r)).collect();

    plain.extend(
        resolved
            .iter()
            .flat_map(|res| res.moved())
            .filter(|moved| moved.date >= horizon)
            .copied(),
    );

    let mut used: BTreeSet<DateTime<Utc>> = BTreeSet::new();
    let mut week_dates = WeekDates::default();
    let mut active: BTreeSet<NaiveDate> = BTreeSet::new();

    // Concrete-date windows.
    for one_off in &plain {
        let cancelled = one_off
            .parent
            .and_then(|id| by_id.get(&id))
            .is_some_and(|parent| parent.cancels(one_off));
        if cancelled {
            continue;
        }

        let window = grid(one_off.from, one_off.to);
        used.extend(quantizer::booked_slots(&bookings, one_off.date, &window, mode));
        for block in quantizer::split(window, &[], &[one_off.date]) {
            for date in &block.dates {
                week_dates.record(*date);
                active.insert(*date);
            }
            unit.slots.push(block);
        }
    }

    // Removed instances still count as dates seen on their weekday.
    for res in &resolved {
        for date in res.removed_dates().into_iter().filter(|d| *d >= horizon) {
            for block in quantizer::split(grid(res.from, res.to), &[], &[date]) {
                block.dates.iter().for_each(|d| week_dates.record(*d));
            }
        }
    }

    // Weekly patterns.
    for res in &resolved {
        if res.weekdays.is_empty() {
            debug!(doctor = provider.id, rule = res.id, "rule has no weekdays, skipped");
            continue;
        }

        let mut removed = res.removed_dates();
        let window = grid(res.from, res.to);
        used.extend(quantizer::booked_weekly_slots(
            &bookings,
            &res.weekdays,
            res.effective,
            &removed,
            &window,
            mode,
        ));
        removed.retain(|date| *date >= horizon);

        for (shift, mut block) in quantizer::split(window, &res.weekdays, &[])
            .into_iter()
            .enumerate()
        {
            let shift = Duration::days(shift as i64);

            let dates: BTreeSet<NaiveDate> = block
                .days
                .iter()
                .flat_map(|day| week_dates.on(*day))
                .filter(|date| {
                    matches!(
                        res.state_on(**date - shift),
                        Some(Occurrence::Scheduled { .. })
                    )
                })
                .copied()
                .collect();
            block.dates = dates.into_iter().collect();

            let markers: Vec<NaiveDate> = removed
                .iter()
                .map(|date| *date + shift)
                .filter(|date| !active.contains(date))
                .collect();
            let marker = SlotBlock {
                from: block.from,
                to: block.from,
                size: block.size,
                gap: block.gap,
                days: Vec::new(),
                dates: markers,
            };

            unit.slots.push(block);
            if !marker.dates.is_empty() {
                unit.slots.push(marker);
            }
        }
    }

    unit.used_slots = used.into_iter().collect();
    debug!(
        doctor = provider.id,
        blocks = unit.slots.len(),
        used = unit.used_slots.len(),
        "rendered availability"
    );
    unit
}
