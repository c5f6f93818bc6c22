//! `slots` CLI: render availability and manage reservations over a JSON
//! snapshot of providers.
//!
//! ## Usage
//!
//! ```sh
//! # Render every provider's slot blocks (stdin → stdout)
//! cat snapshot.json | slots units
//!
//! # Exact-match occupancy instead of straddle blocking
//! slots units -i snapshot.json --exact
//!
//! # Book a slot and save the updated snapshot
//! slots reserve -i snapshot.json -o snapshot.json \
//!     --doctor 1 --at 2026-03-16T09:40:00Z --name "Sam" --email sam@example.org
//!
//! # Cancel reservation 5
//! slots cancel -i snapshot.json -o snapshot.json --id 5
//!
//! # List reservations that sit on an offered slot
//! slots reservations -i snapshot.json
//!
//! # Validate a schedule-editor work time
//! slots worktime -i request.json --id 12
//!
//! # Pin "now" for reproducible output
//! SLOTS_NOW=2026-03-16T08:00:00Z slots units -i snapshot.json
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use slot_engine::worktime::{WorktimeRequest, WorktimeRow};
use slot_engine::{
    AvailabilityEngine, Clock, FixedClock, GuardConfig, MemoryStore, NewReservation,
    OccupancyMode, ReservationForm, ReservationGuard, ScheduleRule, SystemClock,
};
use std::io::{self, Read};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Availability and reservation tool for provider schedules"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Current time (RFC 3339 or epoch milliseconds); defaults to the system clock
    #[arg(long, global = true, env = "SLOTS_NOW")]
    now: Option<String>,

    /// Minutes in the past a booking or cancellation is still accepted
    #[arg(long, global = true, env = "SLOTS_GRACE_MINUTES", default_value_t = 0)]
    grace_minutes: i64,

    /// Shift applied to the system clock, in minutes (negative moves it back)
    #[arg(
        long,
        global = true,
        env = "SLOTS_DEMO_OFFSET_MINUTES",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    demo_offset_minutes: i64,
}

#[derive(Subcommand)]
enum Commands {
    /// Render every provider's availability as JSON
    Units {
        /// Snapshot file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Only bookings exactly on a slot start occupy it
        #[arg(long)]
        exact: bool,
    },
    /// Book a slot with a provider
    Reserve {
        /// Snapshot file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Write the updated snapshot here
        #[arg(short, long)]
        output: Option<String>,
        /// Provider id
        #[arg(long)]
        doctor: u32,
        /// Slot start (RFC 3339 or epoch milliseconds)
        #[arg(long)]
        at: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        details: String,
    },
    /// Cancel a reservation
    Cancel {
        /// Snapshot file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Write the updated snapshot here
        #[arg(short, long)]
        output: Option<String>,
        /// Reservation id
        #[arg(long)]
        id: u32,
    },
    /// List reservations that sit exactly on an offered slot
    Reservations {
        /// Snapshot file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Validate a work-time request and print the schedule row it becomes
    Worktime {
        /// Request JSON file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Id to assign to the new row
        #[arg(long, default_value_t = 0)]
        id: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let clock = build_clock(cli.now.as_deref(), cli.demo_offset_minutes)?;
    let config = GuardConfig::with_grace_minutes(cli.grace_minutes);
    debug!(now = %clock.now(), grace = cli.grace_minutes, "configured");

    match cli.command {
        Commands::Units { input, exact } => {
            let store = load_store(input.as_deref())?;
            let mode = if exact {
                OccupancyMode::Exact
            } else {
                OccupancyMode::Snap
            };
            let engine = AvailabilityEngine::new(clock.as_ref()).with_mode(mode);
            let units = engine.render_all(&store.snapshot().doctors);
            print_json(&units)?;
        }
        Commands::Reserve {
            input,
            output,
            doctor,
            at,
            name,
            email,
            details,
        } => {
            let store = load_store(input.as_deref())?;
            let request = NewReservation {
                doctor_id: doctor,
                date: parse_instant(&at)?,
                form: ReservationForm {
                    name,
                    email,
                    details,
                },
            };
            let mut guard = ReservationGuard::new(store, clock.as_ref(), config);
            let id = guard
                .reserve(&request)
                .context("Reservation rejected")?;
            info!(id, doctor, "reserved");
            save_store(output.as_deref(), guard.into_store())?;
            print_json(&serde_json::json!({ "id": id }))?;
        }
        Commands::Cancel { input, output, id } => {
            let store = load_store(input.as_deref())?;
            let mut guard = ReservationGuard::new(store, clock.as_ref(), config);
            guard
                .cancel_reservation(id)
                .context("Cancellation rejected")?;
            save_store(output.as_deref(), guard.into_store())?;
            print_json(&serde_json::json!({ "cancelled": id }))?;
        }
        Commands::Reservations { input } => {
            let store = load_store(input.as_deref())?;
            let guard = ReservationGuard::new(store, clock.as_ref(), config);
            print_json(&guard.active_reservations()?)?;
        }
        Commands::Worktime { input, id } => {
            let raw = read_input(input.as_deref())?;
            let request: WorktimeRequest =
                serde_json::from_str(&raw).context("Failed to parse work-time request")?;
            let rule = request
                .to_rule(id, clock.now())
                .context("Work time rejected")?;
            let row = WorktimeRow::from_rule(request.doctor_id, &rule);
            print_json(&WorktimeOutput { rule: &rule, row })?;
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct WorktimeOutput<'a> {
    rule: &'a ScheduleRule,
    row: WorktimeRow,
}

fn build_clock(now: Option<&str>, offset_minutes: i64) -> Result<Box<dyn Clock>> {
    match now {
        Some(raw) => Ok(Box::new(FixedClock(parse_instant(raw)?))),
        None => Ok(Box::new(SystemClock::with_offset(Duration::minutes(
            offset_minutes,
        )))),
    }
}

/// Parse an RFC 3339 timestamp or a count of epoch milliseconds.
fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms)
            .with_context(|| format!("Timestamp out of range: {}", ms));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid timestamp: {}", raw))
}

fn load_store(path: Option<&str>) -> Result<MemoryStore> {
    let json = read_input(path)?;
    MemoryStore::from_json(&json).context("Failed to load snapshot")
}

fn save_store(path: Option<&str>, store: MemoryStore) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let json = store.snapshot().to_json()?;
    std::fs::write(path, json).with_context(|| format!("Failed to write file: {}", path))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}
