//! Race-weekend collection
//!
//! Walks the sessions of a weekend through an injected [`SessionLoader`] and
//! turns each loaded session into long-format records.
//!
//! # Example
//!
//! ```no_run
//! use f1_features::collector::collect_event;
//! use f1_features::data::JsonSessionLoader;
//!
//! let loader = JsonSessionLoader::new("sessions");
//! let collected = collect_event(&loader, 2025, "Abu Dhabi Grand Prix");
//! println!("{} records from {} sessions", collected.records.len(), collected.loaded_sessions());
//! ```

pub mod extractor;

pub use extractor::{extract_session, summarize_laps, try_extract_session, LapSummary};

use tracing::{debug, info, warn};

use crate::data::session_loader::{EventInfo, SessionLoader, WeekendFormat};
use crate::error::LoadError;
use crate::models::{SessionRecord, SessionType};

/// What happened to one session of a weekend
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Loaded and extracted; holds the number of records produced
    Loaded(usize),
    /// Not held or not published
    Unavailable,
    /// Loading failed
    Failed(String),
}

/// Records and per-session outcomes for one event
#[derive(Debug, Clone)]
pub struct CollectedEvent {
    pub year: i32,
    pub event: String,
    pub format: WeekendFormat,
    pub records: Vec<SessionRecord>,
    pub outcomes: Vec<(SessionType, SessionOutcome)>,
}

impl CollectedEvent {
    pub fn loaded_sessions(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SessionOutcome::Loaded(_)))
            .count()
    }
}

/// Collect every session of one event
///
/// Missing sessions are skipped and failed sessions contribute nothing; the
/// remaining sessions are always attempted.
pub fn collect_event<L: SessionLoader + ?Sized>(loader: &L, year: i32, event: &str) -> CollectedEvent {
    let info = match loader.event_info(year, event) {
        Ok(info) => info,
        Err(e) => {
            warn!("No event info for {} {} ({}), assuming conventional weekend", year, event, e);
            EventInfo::conventional(event)
        }
    };

    info!(
        "Collecting {} {} ({:?} weekend)",
        year, event, info.format
    );

    let mut records = Vec::new();
    let mut outcomes = Vec::new();

    for &session_type in info.format.sessions() {
        let outcome = match loader.load(year, event, session_type) {
            Ok(session) => {
                let mut extracted = extract_session(&session, session_type, year, event);
                for record in &mut extracted {
                    record.round = info.round;
                }
                debug!("{} {} {}: {} records", year, event, session_type, extracted.len());
                let count = extracted.len();
                records.extend(extracted);
                SessionOutcome::Loaded(count)
            }
            Err(LoadError::NotAvailable { .. }) => {
                info!("Skipping {}: not available", session_type);
                SessionOutcome::Unavailable
            }
            Err(e) => {
                warn!("Error loading {}: {}", session_type, e);
                SessionOutcome::Failed(e.to_string())
            }
        };
        outcomes.push((session_type, outcome));
    }

    CollectedEvent {
        year,
        event: event.to_string(),
        format: info.format,
        records,
        outcomes,
    }
}
