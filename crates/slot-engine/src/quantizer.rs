//! Slot grids: splitting working windows at midnight and mapping bookings onto
//! slot starts.
//!
//! A window `[from, to)` in minutes of day is cut into slots of `size` minutes
//! spaced `size + gap` apart, starting at `from`. Windows may extend past 1440
//! to continue into the next day.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};

use crate::model::SlotBlock;
use crate::serde_ms::day_start;

/// Minutes in one calendar day.
pub const DAY_MINUTES: u32 = 24 * 60;

/// How bookings are matched against the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OccupancyMode {
    /// A booking occupies a slot only if it starts exactly on that slot.
    Exact,
    /// A booking off the grid occupies both slots that straddle it.
    #[default]
    Snap,
}

/// A working window together with its slot geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotGrid {
    pub from: u32,
    pub to: u32,
    pub size: u32,
    pub gap: u32,
}

impl SlotGrid {
    pub fn new(from: u32, to: u32, size: u32, gap: u32) -> Self {
        Self { from, to, size, gap }
    }

    /// Distance between two consecutive slot starts.
    pub fn segment(&self) -> u32 {
        self.size.saturating_add(self.gap)
    }

    /// True if at least one slot fits in the window.
    pub fn has_capacity(&self) -> bool {
        self.size > 0 && self.from.saturating_add(self.size) <= self.to
    }

    fn fits(&self, start: i64) -> bool {
        start >= i64::from(self.from) && start + i64::from(self.size) <= i64::from(self.to)
    }
}

/// Split a window that may run past midnight into same-day and next-day blocks.
///
/// A window ending before `1440 + size` stays one block `[from, to)`. Otherwise
/// the first block is extended to `median`, the first slot boundary at or after
/// midnight, and the rest becomes `[median - 1440, to - 1440)` on the following
/// day (weekdays and dates advanced by one) provided a slot still fits there.
///
/// ```
/// use chrono::Weekday;
/// use slot_engine::quantizer::{split, SlotGrid};
///
/// let blocks = split(SlotGrid::new(1320, 1560, 40, 20), &[Weekday::Mon], &[]);
/// assert_eq!((blocks[0].from, blocks[0].to), (1320, 1440));
/// assert_eq!((blocks[1].from, blocks[1].to), (0, 120));
/// assert_eq!(blocks[1].days, vec![Weekday::Tue]);
/// ```
pub fn split(grid: SlotGrid, days: &[Weekday], dates: &[NaiveDate]) -> Vec<SlotBlock> {
    let block = |from: u32, to: u32, days: Vec<Weekday>, dates: Vec<NaiveDate>| SlotBlock {
        from,
        to,
        size: grid.size,
        gap: grid.gap,
        days,
        dates,
    };

    let segment = grid.segment();
    if grid.to < DAY_MINUTES.saturating_add(grid.size) || segment == 0 || grid.from >= DAY_MINUTES {
        return vec![block(grid.from, grid.to, days.to_vec(), dates.to_vec())];
    }

    let rem = (DAY_MINUTES - grid.from) % segment;
    let median = DAY_MINUTES.saturating_add((segment - rem) % segment);
    let first_end = median.min(grid.to);

    let mut blocks = Vec::with_capacity(2);
    if grid.from.saturating_add(grid.size) <= first_end {
        blocks.push(block(grid.from, first_end, days.to_vec(), dates.to_vec()));
    }
    if median.saturating_add(grid.size) <= grid.to {
        blocks.push(block(
            median - DAY_MINUTES,
            grid.to - DAY_MINUTES,
            days.iter().map(|d| d.succ()).collect(),
            dates.iter().map(|d| *d + Duration::days(1)).collect(),
        ));
    }
    blocks
}

/// Slot starts (minutes from `window_date` 00:00) occupied by a booking
/// `offset_seconds` after that midnight.
fn occupied_offsets(grid: &SlotGrid, offset_seconds: i64, mode: OccupancyMode) -> Vec<i64> {
    let segment = i64::from(grid.segment()) * 60;
    if segment == 0 {
        return Vec::new();
    }
    let rem = (offset_seconds - i64::from(grid.from) * 60).rem_euclid(segment);
    let before = (offset_seconds - rem) / 60;

    match mode {
        OccupancyMode::Exact => {
            if rem == 0 && grid.fits(before) {
                vec![before]
            } else {
                Vec::new()
            }
        }
        OccupancyMode::Snap => {
            let mut starts = Vec::with_capacity(2);
            if grid.fits(before) {
                starts.push(before);
            }
            if rem != 0 {
                let after = before + segment / 60;
                if grid.fits(after) {
                    starts.push(after);
                }
            }
            starts
        }
    }
}

fn occupy_on(
    out: &mut BTreeSet<DateTime<Utc>>,
    booking: DateTime<Utc>,
    window_date: NaiveDate,
    grid: &SlotGrid,
    mode: OccupancyMode,
) {
    let midnight = day_start(window_date);
    let offset = (booking - midnight).num_seconds();
    for start in occupied_offsets(grid, offset, mode) {
        out.insert(midnight + Duration::minutes(start));
    }
}

fn within_a_day(booking: DateTime<Utc>, date: NaiveDate) -> bool {
    (booking.date_naive() - date).num_days().abs() <= 1
}

/// Slots of the window on `window_date` that existing bookings occupy.
///
/// Only bookings dated the day before, the day of, or the day after
/// `window_date` are considered, so a booking just past midnight can still
/// land in a window that started the previous evening.
pub fn booked_slots(
    bookings: &[DateTime<Utc>],
    window_date: NaiveDate,
    grid: &SlotGrid,
    mode: OccupancyMode,
) -> BTreeSet<DateTime<Utc>> {
    let mut occupied = BTreeSet::new();
    if !grid.has_capacity() {
        return occupied;
    }
    for &booking in bookings.iter().filter(|b| within_a_day(**b, window_date)) {
        occupy_on(&mut occupied, booking, window_date, grid, mode);
    }
    occupied
}

/// Weekday-indexed variant of [`booked_slots`] for recurring rules.
///
/// Each booking is matched against every instance of the rule dated within a
/// day of it: instances on `days`, on or after `effective`, and not listed in
/// `removed`.
pub fn booked_weekly_slots(
    bookings: &[DateTime<Utc>],
    days: &[Weekday],
    effective: NaiveDate,
    removed: &BTreeSet<NaiveDate>,
    grid: &SlotGrid,
    mode: OccupancyMode,
) -> BTreeSet<DateTime<Utc>> {
    let mut occupied = BTreeSet::new();
    if !grid.has_capacity() || days.is_empty() {
        return occupied;
    }
    for &booking in bookings {
        let booked_day = booking.date_naive();
        for delta in -1..=1 {
            let instance = booked_day + Duration::days(delta);
            if instance < effective
                || !days.contains(&instance.weekday())
                || removed.contains(&instance)
            {
                continue;
            }
            occupy_on(&mut occupied, booking, instance, grid, mode);
        }
    }
    occupied
}
