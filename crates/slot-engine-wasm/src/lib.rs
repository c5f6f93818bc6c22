//! WASM bindings for slot-engine.
//!
//! Exposes availability rendering and booking admission to the booking page via
//! `wasm-bindgen`. Provider snapshots cross the boundary as JSON strings in the
//! same shape the `slots` CLI reads; instants are epoch milliseconds.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p slot-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir web/pkg/ \
//!   target/wasm32-unknown-unknown/release/slot_engine_wasm.wasm
//! ```

use chrono::{DateTime, Utc};
use slot_engine::render::minutes_to_hhmm;
use slot_engine::{AvailabilityEngine, FixedClock, GuardConfig, MemoryStore, ReservationGuard};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Boundary-free implementations (unit-testable on native targets)
// ---------------------------------------------------------------------------

fn instant(ms: f64, what: &str) -> Result<DateTime<Utc>, String> {
    if !ms.is_finite() {
        return Err(format!("Invalid {}: {}", what, ms));
    }
    DateTime::from_timestamp_millis(ms as i64).ok_or_else(|| format!("Invalid {}: {}", what, ms))
}

fn load_store(snapshot_json: &str) -> Result<MemoryStore, String> {
    MemoryStore::from_json(snapshot_json).map_err(|e| e.to_string())
}

fn render_units_impl(snapshot_json: &str, now_ms: f64) -> Result<String, String> {
    let store = load_store(snapshot_json)?;
    let engine = AvailabilityEngine::new(FixedClock(instant(now_ms, "now")?));
    let units = engine.render_all(&store.snapshot().doctors);
    serde_json::to_string(&units).map_err(|e| format!("Serialization error: {}", e))
}

fn check_reservation_impl(
    snapshot_json: &str,
    doctor_id: u32,
    at_ms: f64,
    now_ms: f64,
    grace_minutes: i32,
) -> Result<(), String> {
    let store = load_store(snapshot_json)?;
    let at = instant(at_ms, "slot time")?;
    let clock = FixedClock(instant(now_ms, "now")?);
    let guard = ReservationGuard::new(
        store,
        clock,
        GuardConfig::with_grace_minutes(i64::from(grace_minutes)),
    );
    guard
        .check_available(doctor_id, at)
        .map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Render every provider in a snapshot.
///
/// Returns a JSON array of rendered units (`slots`, `usedSlots`, display
/// fields), using snap-mode occupancy and today's date derived from `now_ms`.
#[wasm_bindgen(js_name = "renderUnits")]
pub fn render_units(snapshot_json: &str, now_ms: f64) -> Result<String, JsValue> {
    render_units_impl(snapshot_json, now_ms).map_err(|e| JsValue::from_str(&e))
}

/// Check whether `at_ms` can be booked with `doctor_id`.
///
/// Resolves to `undefined` when the slot is free and throws the rejection
/// message otherwise ("this time is already booked ...", "booking time has
/// expired", "doctor ... not found").
#[wasm_bindgen(js_name = "checkReservation")]
pub fn check_reservation(
    snapshot_json: &str,
    doctor_id: u32,
    at_ms: f64,
    now_ms: f64,
    grace_minutes: i32,
) -> Result<(), JsValue> {
    check_reservation_impl(snapshot_json, doctor_id, at_ms, now_ms, grace_minutes)
        .map_err(|e| JsValue::from_str(&e))
}

/// Format minutes since midnight as `HH:MM`; values past 24 hours keep counting.
#[wasm_bindgen(js_name = "formatMinutes")]
pub fn format_minutes(minutes: u32) -> String {
    minutes_to_hhmm(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Doctor 1: Mondays 09:00-12:00, 30-minute slots, 10-minute gaps,
    // one booking at Monday 2026-03-16 09:50 UTC.
    const SNAPSHOT: &str = r#"{
        "doctors": [{
            "id": 1,
            "name": "Dr. Ada Moreau",
            "slotSize": 30,
            "gap": 10,
            "schedule": [{
                "id": 10,
                "from": 540,
                "to": 720,
                "date": 1772409600000,
                "rrule": "FREQ=WEEKLY;BYDAY=MO",
                "durationSeconds": 10800
            }],
            "occupiedSlots": [{
                "id": 1,
                "doctorId": 1,
                "date": 1773654600000,
                "clientName": "Lee Chen",
                "clientEmail": "lee@example.org"
            }]
        }]
    }"#;

    /// 2026-03-16 08:00 UTC.
    const NOW: f64 = 1773648000000.0;
    /// 2026-03-16 09:40 UTC.
    const STRADDLED: f64 = 1773654000000.0;
    /// 2026-03-16 11:00 UTC.
    const FREE: f64 = 1773658800000.0;

    #[test]
    fn renders_units_as_json() {
        let out = render_units_impl(SNAPSHOT, NOW).unwrap();
        let units: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(units[0]["title"], "Dr. Ada Moreau");
        assert_eq!(units[0]["slots"][0]["from"], "09:00");
        assert_eq!(units[0]["usedSlots"][0], 1773654000000i64);
    }

    #[test]
    fn free_slot_passes_the_check() {
        assert!(check_reservation_impl(SNAPSHOT, 1, FREE, NOW, 0).is_ok());
    }

    #[test]
    fn straddled_slot_is_rejected() {
        let err = check_reservation_impl(SNAPSHOT, 1, STRADDLED, NOW, 0).unwrap_err();
        assert!(err.contains("already booked"), "{}", err);
    }

    #[test]
    fn past_slot_is_rejected_unless_within_grace() {
        let err = check_reservation_impl(SNAPSHOT, 1, NOW - 3_600_000.0, NOW, 0).unwrap_err();
        assert_eq!(err, "booking time has expired");
        assert!(check_reservation_impl(SNAPSHOT, 1, NOW - 3_600_000.0, NOW, 90).is_ok());
    }

    #[test]
    fn unknown_doctor_and_bad_snapshot_are_errors() {
        assert!(check_reservation_impl(SNAPSHOT, 9, FREE, NOW, 0).is_err());
        assert!(render_units_impl("{not json", NOW).is_err());
        assert!(render_units_impl(SNAPSHOT, f64::NAN).is_err());
    }

    #[test]
    fn oversized_gap_is_rejected_instead_of_rendered() {
        let snapshot = SNAPSHOT.replace("\"gap\": 10", "\"gap\": 4294967295");
        let err = render_units_impl(&snapshot, NOW).unwrap_err();
        assert!(err.contains("slot size plus gap"), "{}", err);
    }

    #[test]
    fn formats_minutes() {
        assert_eq!(format_minutes(540), "09:00");
        assert_eq!(format_minutes(1560), "26:00");
    }
}
