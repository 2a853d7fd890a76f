//! Core record types shared by the extractor, aggregators and dataset builder

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Session type within a race weekend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SessionType {
    FP1,
    FP2,
    FP3,
    /// Sprint qualifying (sprint shootout)
    SQ,
    /// Sprint race
    S,
    Q,
    R,
}

impl SessionType {
    pub const ALL: [SessionType; 7] = [
        SessionType::FP1,
        SessionType::FP2,
        SessionType::FP3,
        SessionType::SQ,
        SessionType::S,
        SessionType::Q,
        SessionType::R,
    ];

    /// Practice sessions joined into the prediction dataset
    pub const PRACTICE: [SessionType; 3] = [SessionType::FP1, SessionType::FP2, SessionType::FP3];

    pub fn code(&self) -> &'static str {
        match self {
            SessionType::FP1 => "FP1",
            SessionType::FP2 => "FP2",
            SessionType::FP3 => "FP3",
            SessionType::SQ => "SQ",
            SessionType::S => "S",
            SessionType::Q => "Q",
            SessionType::R => "R",
        }
    }

    /// Sessions whose records carry lap-time metrics (free practice and sprint)
    pub fn is_lap_session(&self) -> bool {
        matches!(
            self,
            SessionType::FP1 | SessionType::FP2 | SessionType::FP3 | SessionType::S
        )
    }

    /// Sessions whose records carry Q1-Q3 segment times
    pub fn is_qualifying(&self) -> bool {
        matches!(self, SessionType::Q | SessionType::SQ)
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "FP1" => Ok(SessionType::FP1),
            "FP2" => Ok(SessionType::FP2),
            "FP3" => Ok(SessionType::FP3),
            "SQ" => Ok(SessionType::SQ),
            "S" => Ok(SessionType::S),
            "Q" => Ok(SessionType::Q),
            "R" => Ok(SessionType::R),
            other => Err(format!("unknown session type: {:?}", other)),
        }
    }
}

/// Long-format record: one driver in one session of one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub driver: String,
    pub driver_number: Option<String>,
    pub team: String,
    pub year: i32,
    pub event: String,
    /// Championship round, used to order events within a season when known
    pub round: Option<u32>,
    pub session: SessionType,

    pub best_lap_time: Option<f64>,
    pub avg_lap_time: Option<f64>,
    pub total_laps: Option<u32>,
    pub position: Option<u32>,
    pub q1: Option<f64>,
    pub q2: Option<f64>,
    pub q3: Option<f64>,
    pub grid_position: Option<u32>,
    pub points: Option<f64>,
    pub status: Option<String>,
    pub fastest_lap: Option<f64>,
}

impl SessionRecord {
    /// Create a record with identity columns set and every metric absent
    pub fn new(
        driver: impl Into<String>,
        team: impl Into<String>,
        year: i32,
        event: impl Into<String>,
        session: SessionType,
    ) -> Self {
        Self {
            driver: driver.into(),
            driver_number: None,
            team: team.into(),
            year,
            event: event.into(),
            round: None,
            session,
            best_lap_time: None,
            avg_lap_time: None,
            total_laps: None,
            position: None,
            q1: None,
            q2: None,
            q3: None,
            grid_position: None,
            points: None,
            status: None,
            fastest_lap: None,
        }
    }

    pub fn driver_team_key(&self) -> DriverTeamKey {
        DriverTeamKey::new(&self.driver, &self.team)
    }
}

/// Wide-format row identity: a driver racing for a team
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverTeamKey {
    pub driver: String,
    pub team: String,
}

impl DriverTeamKey {
    pub fn new(driver: &str, team: &str) -> Self {
        Self {
            driver: driver.to_string(),
            team: team.to_string(),
        }
    }

    /// Combined label written to the `Driver_Team` column
    pub fn label(&self) -> String {
        format!("{}_{}", self.driver, self.team)
    }
}

/// Practice-session snapshot joined onto a race entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticeSnapshot {
    pub best_lap: Option<f64>,
    pub avg_lap: Option<f64>,
    pub laps: Option<u32>,
}

/// Backward-looking features computed from earlier events only
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalFeatures {
    pub driver_avg_position_last5: Option<f64>,
    pub driver_avg_quali_last5: Option<f64>,
    pub team_avg_position_last5: Option<f64>,
    pub driver_wins_season: u32,
    pub driver_podiums_season: u32,
}

/// Cross-sectional features derived from the row and its event
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineeredFeatures {
    pub quali_to_grid_diff: Option<i64>,
    pub fp_best_lap: Option<f64>,
    pub fp_best_lap_relative: Option<f64>,
    pub quali_relative: Option<f64>,
}

/// One race entry in the prediction dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub driver: String,
    pub team: String,
    pub year: i32,
    pub event: String,
    pub round: Option<u32>,

    pub race_position: Option<u32>,
    pub grid_position: Option<u32>,

    pub quali_position: Option<u32>,
    pub q1: Option<f64>,
    pub q2: Option<f64>,
    pub q3: Option<f64>,

    /// FP1, FP2, FP3 in order
    pub practice: [PracticeSnapshot; 3],

    pub historical: HistoricalFeatures,
    pub engineered: EngineeredFeatures,
}

impl PredictionRow {
    pub fn fp1(&self) -> &PracticeSnapshot {
        &self.practice[0]
    }

    pub fn fp2(&self) -> &PracticeSnapshot {
        &self.practice[1]
    }

    pub fn fp3(&self) -> &PracticeSnapshot {
        &self.practice[2]
    }
}
