//! Session → long-format record extraction

use tracing::{debug, warn};

use crate::core::stats::{as_whole, mean_present, min_present};
use crate::data::session_loader::{ResultRow, SessionData};
use crate::error::ExtractError;
use crate::models::{SessionRecord, SessionType};

/// Lap-time metrics for one driver in one session
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LapSummary {
    pub best: Option<f64>,
    pub average: Option<f64>,
    /// All laps, timed or not
    pub count: u32,
}

/// Extract records for every classified driver in a session
///
/// A failure on any driver discards the whole session: the result is empty
/// and the failure is logged. Other sessions are unaffected.
pub fn extract_session(
    session: &SessionData,
    session_type: SessionType,
    year: i32,
    event: &str,
) -> Vec<SessionRecord> {
    match try_extract_session(session, session_type, year, event) {
        Ok(records) => records,
        Err(e) => {
            warn!(
                "Discarding {} {} {}: {}",
                year, event, session_type, e
            );
            Vec::new()
        }
    }
}

/// Fallible form of [`extract_session`]
pub fn try_extract_session(
    session: &SessionData,
    session_type: SessionType,
    year: i32,
    event: &str,
) -> Result<Vec<SessionRecord>, ExtractError> {
    let mut records = Vec::with_capacity(session.results.len());

    for row in &session.results {
        let driver = row.abbreviation.trim();
        if driver.is_empty() {
            continue;
        }
        let Some(team) = row
            .team_name
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            debug!("Skipping {} in {} {} {}: no team", driver, year, event, session_type);
            continue;
        };
        records.push(extract_driver(session, row, driver, team, session_type, year, event)?);
    }

    Ok(records)
}

fn extract_driver(
    session: &SessionData,
    row: &ResultRow,
    driver: &str,
    team: &str,
    session_type: SessionType,
    year: i32,
    event: &str,
) -> Result<SessionRecord, ExtractError> {
    let mut record = SessionRecord::new(driver, team, year, event, session_type);
    record.driver_number = row.driver_number.clone();

    match session_type {
        SessionType::FP1 | SessionType::FP2 | SessionType::FP3 | SessionType::S => {
            let laps = summarize_laps(session, driver)?;
            record.best_lap_time = laps.best;
            record.avg_lap_time = laps.average;
            record.total_laps = Some(laps.count);
            record.position = rank(driver, "Position", row.position)?;
        }
        SessionType::Q | SessionType::SQ => {
            record.q1 = segment_time(driver, row.q1)?;
            record.q2 = segment_time(driver, row.q2)?;
            record.q3 = segment_time(driver, row.q3)?;
            record.position = rank(driver, "Position", row.position)?;
        }
        SessionType::R => {
            let laps = summarize_laps(session, driver)?;
            record.position = rank(driver, "Position", row.position)?;
            record.grid_position = rank(driver, "GridPosition", row.grid_position)?;
            record.points = row.points.filter(|p| p.is_finite());
            record.status = row.status.clone();
            record.fastest_lap = laps.best;
            record.total_laps = Some(laps.count);
        }
    }

    Ok(record)
}

/// Fastest and mean lap over timed laps, plus the total lap count
pub fn summarize_laps(session: &SessionData, driver: &str) -> Result<LapSummary, ExtractError> {
    let mut times = Vec::new();
    let mut count = 0u32;

    for lap in session.laps_for(driver) {
        count += 1;
        if let Some(t) = lap.lap_time {
            if !t.is_finite() || t < 0.0 {
                return Err(ExtractError::InvalidLapTime {
                    driver: driver.to_string(),
                    value: t,
                });
            }
            times.push(Some(t));
        }
    }

    Ok(LapSummary {
        best: min_present(times.iter().copied()),
        average: mean_present(times),
        count,
    })
}

fn rank(driver: &str, field: &'static str, value: Option<f64>) -> Result<Option<u32>, ExtractError> {
    match value {
        None => Ok(None),
        Some(v) if v.is_nan() => Ok(None),
        Some(v) => as_whole(Some(v)).map(Some).ok_or(ExtractError::InvalidRank {
            driver: driver.to_string(),
            field,
            value: v,
        }),
    }
}

fn segment_time(driver: &str, value: Option<f64>) -> Result<Option<f64>, ExtractError> {
    match value {
        Some(v) if v.is_nan() => Ok(None),
        Some(v) if !v.is_finite() || v < 0.0 => Err(ExtractError::InvalidLapTime {
            driver: driver.to_string(),
            value: v,
        }),
        other => Ok(other),
    }
}
