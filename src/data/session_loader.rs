//! Session loading boundary
//!
//! The pipeline never talks to a timing provider directly. Anything that can
//! hand back a session's results and laps implements [`SessionLoader`]; the
//! crate ships [`JsonSessionLoader`] for sessions exported to disk as
//! `{root}/{year}/{Event_Name}/{Session}.json`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::LoadError;
use crate::models::SessionType;

/// One driver's line in a session's classification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ResultRow {
    pub abbreviation: String,
    pub driver_number: Option<String>,
    pub team_name: Option<String>,
    pub position: Option<f64>,
    pub grid_position: Option<f64>,
    pub points: Option<f64>,
    pub status: Option<String>,
    /// Qualifying segment times in seconds
    pub q1: Option<f64>,
    pub q2: Option<f64>,
    pub q3: Option<f64>,
}

/// A single lap; `lap_time` is absent for in/out laps and deleted laps
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LapRecord {
    pub driver: String,
    pub lap_number: Option<u32>,
    pub lap_time: Option<f64>,
}

/// A loaded session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionData {
    pub results: Vec<ResultRow>,
    pub laps: Vec<LapRecord>,
}

impl SessionData {
    /// Laps driven by one driver
    pub fn laps_for<'a>(&'a self, driver: &'a str) -> impl Iterator<Item = &'a LapRecord> + 'a {
        self.laps.iter().filter(move |lap| lap.driver == driver)
    }
}

/// Race weekend format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeekendFormat {
    #[default]
    Conventional,
    Sprint,
}

impl WeekendFormat {
    /// Sessions held over the weekend, in running order
    pub fn sessions(&self) -> &'static [SessionType] {
        match self {
            WeekendFormat::Conventional => &[
                SessionType::FP1,
                SessionType::FP2,
                SessionType::FP3,
                SessionType::Q,
                SessionType::R,
            ],
            WeekendFormat::Sprint => &[
                SessionType::FP1,
                SessionType::SQ,
                SessionType::S,
                SessionType::Q,
                SessionType::R,
            ],
        }
    }

    /// Interpret a provider format label such as `sprint_qualifying`
    pub fn from_label(label: &str) -> Self {
        if label.to_lowercase().contains("sprint") {
            WeekendFormat::Sprint
        } else {
            WeekendFormat::Conventional
        }
    }
}

/// Calendar metadata for one event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInfo {
    pub name: String,
    pub round: Option<u32>,
    pub format: WeekendFormat,
}

impl EventInfo {
    pub fn conventional(name: &str) -> Self {
        Self {
            name: name.to_string(),
            round: None,
            format: WeekendFormat::Conventional,
        }
    }
}

/// Source of session data
pub trait SessionLoader {
    /// Load one session; `LoadError::NotAvailable` means the session was not held
    fn load(&self, year: i32, event: &str, session: SessionType) -> Result<SessionData, LoadError>;

    /// Describe the event; callers fall back to a conventional weekend on error
    fn event_info(&self, year: i32, event: &str) -> Result<EventInfo, LoadError>;
}

/// `event.json` layout
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EventFile {
    event_name: Option<String>,
    round_number: Option<u32>,
    #[serde(default)]
    event_format: String,
}

/// Reads sessions exported as JSON files
#[derive(Debug, Clone)]
pub struct JsonSessionLoader {
    root: PathBuf,
}

impl JsonSessionLoader {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory holding one event's files
    pub fn event_dir(&self, year: i32, event: &str) -> PathBuf {
        self.root.join(year.to_string()).join(event_slug(event))
    }

    pub fn session_path(&self, year: i32, event: &str, session: SessionType) -> PathBuf {
        self.event_dir(year, event)
            .join(format!("{}.json", session.code()))
    }

    /// List event names exported for a season, sorted by directory name
    pub fn list_events(&self, year: i32) -> Vec<String> {
        let mut events: Vec<String> = fs::read_dir(self.root.join(year.to_string()))
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.path().is_dir())
                    .filter_map(|e| e.file_name().to_str().map(|s| s.replace('_', " ")))
                    .collect()
            })
            .unwrap_or_default();
        events.sort();
        events
    }
}

impl SessionLoader for JsonSessionLoader {
    fn load(&self, year: i32, event: &str, session: SessionType) -> Result<SessionData, LoadError> {
        let path = self.session_path(year, event, session);

        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LoadError::NotAvailable {
                    year,
                    event: event.to_string(),
                    session,
                })
            }
            Err(e) => {
                return Err(LoadError::Fetch {
                    path,
                    message: e.to_string(),
                })
            }
        };

        serde_json::from_str(&content).map_err(|e| LoadError::Fetch {
            path,
            message: e.to_string(),
        })
    }

    fn event_info(&self, year: i32, event: &str) -> Result<EventInfo, LoadError> {
        let path = self.event_dir(year, event).join("event.json");
        let content = fs::read_to_string(&path).map_err(|e| LoadError::Fetch {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let file: EventFile = serde_json::from_str(&content).map_err(|e| LoadError::Fetch {
            path,
            message: e.to_string(),
        })?;

        Ok(EventInfo {
            name: file.event_name.unwrap_or_else(|| event.to_string()),
            round: file.round_number,
            format: WeekendFormat::from_label(&file.event_format),
        })
    }
}

/// Event name as used in directory and column names
pub fn event_slug(event: &str) -> String {
    event.replace(' ', "_")
}
