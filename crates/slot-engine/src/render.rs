//! Time-of-day rendering for schedule blocks.
//!
//! Minutes of day are rendered zero-padded as `HH:MM`. Hours are not wrapped at
//! 24: the first half of a window that crosses midnight ends at e.g. `24:40`,
//! which the booking UI reads as 00:40 on the following day.

use crate::error::{Result, SlotError};

/// Render a minute-of-day offset as `HH:MM`.
///
/// ```
/// use slot_engine::render::minutes_to_hhmm;
/// assert_eq!(minutes_to_hhmm(545), "09:05");
/// assert_eq!(minutes_to_hhmm(1480), "24:40");
/// ```
pub fn minutes_to_hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Parse `H:MM` or `HH:MM` (hours may exceed 23) back into minutes.
pub fn hhmm_to_minutes(s: &str) -> Result<u32> {
    let invalid = || SlotError::Validation(format!("invalid time of day '{}'", s));

    let (hours, minutes) = s.trim().split_once(':').ok_or_else(invalid)?;
    if hours.is_empty() || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if minutes >= 60 {
        return Err(invalid());
    }
    hours
        .checked_mul(60)
        .and_then(|m| m.checked_add(minutes))
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_zero_padded() {
        let cases = [
            (15, "00:15"),
            (60, "01:00"),
            (135, "02:15"),
            (875, "14:35"),
            (1020, "17:00"),
            (1440, "24:00"),
            (1480, "24:40"),
        ];
        for (minutes, expected) in cases {
            assert_eq!(minutes_to_hhmm(minutes), expected);
        }
    }

    #[test]
    fn parses_both_widths() {
        assert_eq!(hhmm_to_minutes("9:05").unwrap(), 545);
        assert_eq!(hhmm_to_minutes("09:05").unwrap(), 545);
        assert_eq!(hhmm_to_minutes("24:40").unwrap(), 1480);
        assert!(hhmm_to_minutes("9:5").is_err());
        assert!(hhmm_to_minutes("10:75").is_err());
        assert!(hhmm_to_minutes("noon").is_err());
        assert!(hhmm_to_minutes("99999999:00").is_err());
    }
}
