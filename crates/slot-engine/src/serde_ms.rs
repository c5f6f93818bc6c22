//! Epoch-millisecond conversions and serde adapters.
//!
//! The wire format carries every date and timestamp as milliseconds since the
//! Unix epoch (UTC). Internally dates are [`NaiveDate`] and instants are
//! [`DateTime<Utc>`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 00:00 UTC on `date`.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub fn date_to_ms(date: NaiveDate) -> i64 {
    day_start(date).timestamp_millis()
}

/// Interpret `ms` as an instant and keep only its UTC calendar day.
pub fn ms_to_date(ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.date_naive())
}

/// Weekday index with Sunday = 0, as used on the wire.
pub fn weekday_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// `NaiveDate` as epoch-ms of its midnight. Deserialization truncates to the day.
pub mod date {
    use super::*;

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        date_to_ms(*date).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let ms = i64::deserialize(d)?;
        ms_to_date(ms).ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", ms)))
    }
}

pub mod dates {
    use super::*;

    pub fn serialize<S: Serializer>(dates: &[NaiveDate], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(dates.iter().map(|d| date_to_ms(*d)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<NaiveDate>, D::Error> {
        Vec::<i64>::deserialize(d)?
            .into_iter()
            .map(|ms| {
                ms_to_date(ms)
                    .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", ms)))
            })
            .collect()
    }
}

pub mod instants {
    use super::*;

    pub fn serialize<S: Serializer>(instants: &[DateTime<Utc>], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(instants.iter().map(|t| t.timestamp_millis()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<DateTime<Utc>>, D::Error> {
        Vec::<i64>::deserialize(d)?
            .into_iter()
            .map(|ms| {
                DateTime::from_timestamp_millis(ms)
                    .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", ms)))
            })
            .collect()
    }
}

/// Weekdays as Sunday-based indices `0..=6`.
pub mod weekdays {
    use super::*;

    pub fn serialize<S: Serializer>(days: &[Weekday], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(days.iter().map(|d| weekday_index(*d)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Weekday>, D::Error> {
        Vec::<u8>::deserialize(d)?
            .into_iter()
            .map(|i| {
                weekday_from_index(i).ok_or_else(|| D::Error::custom(format!("invalid weekday {}", i)))
            })
            .collect()
    }
}

/// Minutes of day as an `HH:MM` string.
pub mod hhmm {
    use super::*;
    use crate::render::{hhmm_to_minutes, minutes_to_hhmm};

    pub fn serialize<S: Serializer>(minutes: &u32, s: S) -> Result<S::Ok, S::Error> {
        minutes_to_hhmm(*minutes).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        let raw = String::deserialize(d)?;
        hhmm_to_minutes(&raw).map_err(D::Error::custom)
    }
}
