//! CSV persistence for long-format session records

use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::core::stats::as_whole;
use crate::error::{PipelineError, Result};
use crate::models::{SessionRecord, SessionType};

/// Header of the raw long-format file
pub const RAW_COLUMNS: [&str; 18] = [
    "Driver",
    "DriverNumber",
    "Team",
    "Year",
    "Event",
    "Session",
    "BestLapTime_seconds",
    "AvgLapTime_seconds",
    "TotalLaps",
    "Position",
    "Q1_seconds",
    "Q2_seconds",
    "Q3_seconds",
    "GridPosition",
    "Points",
    "Status",
    "FastestLap_seconds",
    "RoundNumber",
];

const REQUIRED_COLUMNS: [&str; 5] = ["Driver", "Team", "Year", "Event", "Session"];

/// Load session records from a CSV file
pub fn load_records<P: AsRef<Path>>(csv_path: P) -> Result<Vec<SessionRecord>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(csv_path.as_ref().to_path_buf()))?
        .finish()?;

    dataframe_to_records(&df)
}

/// Convert a DataFrame with the raw header into session records
///
/// Optional columns that are missing read as all-null. Rows without a driver
/// abbreviation, year or recognizable session type are skipped.
pub fn dataframe_to_records(df: &DataFrame) -> Result<Vec<SessionRecord>> {
    for name in REQUIRED_COLUMNS {
        if df.column(name).is_err() {
            return Err(PipelineError::MissingColumn(name.to_string()));
        }
    }

    let drivers = string_values(df, "Driver")?;
    let driver_numbers = string_values(df, "DriverNumber")?;
    let teams = string_values(df, "Team")?;
    let years = int_values(df, "Year")?;
    let events = string_values(df, "Event")?;
    let sessions = string_values(df, "Session")?;
    let best_laps = float_values(df, "BestLapTime_seconds")?;
    let avg_laps = float_values(df, "AvgLapTime_seconds")?;
    let total_laps = float_values(df, "TotalLaps")?;
    let positions = float_values(df, "Position")?;
    let q1 = float_values(df, "Q1_seconds")?;
    let q2 = float_values(df, "Q2_seconds")?;
    let q3 = float_values(df, "Q3_seconds")?;
    let grids = float_values(df, "GridPosition")?;
    let points = float_values(df, "Points")?;
    let statuses = string_values(df, "Status")?;
    let fastest = float_values(df, "FastestLap_seconds")?;
    let rounds = float_values(df, "RoundNumber")?;

    let mut records = Vec::with_capacity(df.height());
    let mut skipped = 0usize;

    for i in 0..df.height() {
        let driver = match drivers[i].as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let (Some(year), Some(session)) = (
            years[i],
            sessions[i].as_deref().and_then(|s| s.parse::<SessionType>().ok()),
        ) else {
            skipped += 1;
            continue;
        };

        records.push(SessionRecord {
            driver: driver.to_string(),
            driver_number: driver_numbers[i].clone(),
            team: teams[i].clone().unwrap_or_default(),
            year: year as i32,
            event: events[i].clone().unwrap_or_default(),
            round: as_whole(rounds[i]),
            session,
            best_lap_time: best_laps[i],
            avg_lap_time: avg_laps[i],
            total_laps: as_whole(total_laps[i]),
            position: as_whole(positions[i]),
            q1: q1[i],
            q2: q2[i],
            q3: q3[i],
            grid_position: as_whole(grids[i]),
            points: points[i],
            status: statuses[i].clone().filter(|s| !s.is_empty()),
            fastest_lap: fastest[i],
        });
    }

    if skipped > 0 {
        warn!("Skipped {} rows without driver, year or valid session", skipped);
    }

    Ok(records)
}

/// Build the raw long-format DataFrame
pub fn records_to_dataframe(records: &[SessionRecord]) -> PolarsResult<DataFrame> {
    fn floats(records: &[SessionRecord], f: impl Fn(&SessionRecord) -> Option<f64>) -> Vec<Option<f64>> {
        records.iter().map(f).collect()
    }
    fn whole(records: &[SessionRecord], f: impl Fn(&SessionRecord) -> Option<u32>) -> Vec<Option<u32>> {
        records.iter().map(f).collect()
    }

    DataFrame::new(vec![
        Column::new(
            "Driver".into(),
            records.iter().map(|r| r.driver.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "DriverNumber".into(),
            records.iter().map(|r| r.driver_number.as_deref()).collect::<Vec<_>>(),
        ),
        Column::new(
            "Team".into(),
            records.iter().map(|r| r.team.as_str()).collect::<Vec<_>>(),
        ),
        Column::new("Year".into(), records.iter().map(|r| r.year).collect::<Vec<_>>()),
        Column::new(
            "Event".into(),
            records.iter().map(|r| r.event.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "Session".into(),
            records.iter().map(|r| r.session.code()).collect::<Vec<_>>(),
        ),
        Column::new("BestLapTime_seconds".into(), floats(records, |r| r.best_lap_time)),
        Column::new("AvgLapTime_seconds".into(), floats(records, |r| r.avg_lap_time)),
        Column::new("TotalLaps".into(), whole(records, |r| r.total_laps)),
        Column::new("Position".into(), whole(records, |r| r.position)),
        Column::new("Q1_seconds".into(), floats(records, |r| r.q1)),
        Column::new("Q2_seconds".into(), floats(records, |r| r.q2)),
        Column::new("Q3_seconds".into(), floats(records, |r| r.q3)),
        Column::new("GridPosition".into(), whole(records, |r| r.grid_position)),
        Column::new("Points".into(), floats(records, |r| r.points)),
        Column::new(
            "Status".into(),
            records.iter().map(|r| r.status.as_deref()).collect::<Vec<_>>(),
        ),
        Column::new("FastestLap_seconds".into(), floats(records, |r| r.fastest_lap)),
        Column::new("RoundNumber".into(), whole(records, |r| r.round)),
    ])
}

/// Write raw records to CSV
pub fn save_records<P: AsRef<Path>>(records: &[SessionRecord], path: P) -> Result<()> {
    let mut df = records_to_dataframe(records)?;
    write_csv(&mut df, path)
}

/// Write a DataFrame to CSV with a header row, creating parent directories
pub fn write_csv<P: AsRef<Path>>(df: &mut DataFrame, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    info!("Wrote {} rows to {:?}", df.height(), path);
    Ok(())
}

/// Result of merging per-season raw files
#[derive(Debug, Clone, Default)]
pub struct CombinedSeasons {
    /// (year, records loaded) for every file found
    pub loaded: Vec<(i32, usize)>,
    /// Years without a file
    pub missing: Vec<i32>,
    pub records: Vec<SessionRecord>,
}

impl CombinedSeasons {
    pub fn counts_by_year(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.year).or_insert(0) += 1;
        }
        counts
    }

    pub fn counts_by_session(&self) -> BTreeMap<SessionType, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.session).or_insert(0) += 1;
        }
        counts
    }
}

/// Merge the per-season raw files that exist
///
/// Missing seasons are reported, not fatal; finding no file at all is
/// `PipelineError::NoRecords`.
pub fn combine_yearly(config: &PipelineConfig, years: &[i32]) -> Result<CombinedSeasons> {
    let mut combined = CombinedSeasons::default();

    for &year in years {
        let path = config.yearly_raw_path(year);
        if !path.exists() {
            warn!("No data for {} ({:?} not found)", year, path);
            combined.missing.push(year);
            continue;
        }

        let records = load_records(&path)?;
        info!("Loaded {}: {} records", year, records.len());
        combined.loaded.push((year, records.len()));
        combined.records.extend(records);
    }

    if combined.loaded.is_empty() {
        return Err(PipelineError::no_records(format!(
            "{} files for years {:?}",
            config.raw_stem, years
        )));
    }

    Ok(combined)
}

fn float_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    match df.column(name) {
        Ok(column) => {
            let cast = column.cast(&DataType::Float64)?;
            Ok(cast
                .as_materialized_series()
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

fn int_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    match df.column(name) {
        Ok(column) => {
            let cast = column.cast(&DataType::Int64)?;
            Ok(cast.as_materialized_series().i64()?.into_iter().collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    match df.column(name) {
        Ok(column) => {
            let cast = column.cast(&DataType::String)?;
            Ok(cast
                .as_materialized_series()
                .str()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("f1_csv_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_records() -> Vec<SessionRecord> {
        let mut fp1 = SessionRecord::new("VER", "Red Bull Racing", 2024, "Bahrain Grand Prix", SessionType::FP1);
        fp1.best_lap_time = Some(91.2);
        fp1.avg_lap_time = Some(95.4);
        fp1.total_laps = Some(24);
        fp1.position = Some(2);

        let mut race = SessionRecord::new("VER", "Red Bull Racing", 2024, "Bahrain Grand Prix", SessionType::R);
        race.position = Some(1);
        race.grid_position = Some(1);
        race.points = Some(26.0);
        race.status = Some("Finished".to_string());
        race.round = Some(1);

        vec![fp1, race]
    }

    #[test]
    fn test_records_to_dataframe_header() {
        let df = records_to_dataframe(&sample_records()).unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, RAW_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_save_and_load_preserves_nulls() {
        let dir = temp_dir("roundtrip");
        let path = dir.join("raw.csv");
        save_records(&sample_records(), &path).unwrap();

        let loaded = load_records(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].session, SessionType::FP1);
        assert_eq!(loaded[0].best_lap_time, Some(91.2));
        assert_eq!(loaded[0].grid_position, None);
        assert_eq!(loaded[0].status, None);
        assert_eq!(loaded[1].points, Some(26.0));
        assert_eq!(loaded[1].round, Some(1));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_minimal_columns() {
        let dir = temp_dir("minimal");
        let path = dir.join("raw.csv");
        fs::write(
            &path,
            "Driver,Team,Year,Event,Session,Position\n\
             NOR,McLaren,2024,Miami Grand Prix,R,1\n\
             ,McLaren,2024,Miami Grand Prix,R,2\n\
             PIA,McLaren,2024,Miami Grand Prix,FP9,3\n\
             PIA,McLaren,2024,Miami Grand Prix,Q,4.0\n",
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].position, Some(1));
        assert_eq!(records[0].best_lap_time, None);
        assert_eq!(records[1].session, SessionType::Q);
        assert_eq!(records[1].position, Some(4));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_required_column() {
        let dir = temp_dir("required");
        let path = dir.join("raw.csv");
        fs::write(&path, "Driver,Team,Year,Session\nNOR,McLaren,2024,R\n").unwrap();

        match load_records(&path) {
            Err(PipelineError::MissingColumn(name)) => assert_eq!(name, "Event"),
            other => panic!("expected missing column, got {:?}", other),
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_combine_yearly() {
        let dir = temp_dir("combine");
        let config = PipelineConfig::with_data_dir(&dir);
        save_records(&sample_records(), config.yearly_raw_path(2024)).unwrap();

        let combined = combine_yearly(&config, &[2023, 2024]).unwrap();
        assert_eq!(combined.missing, vec![2023]);
        assert_eq!(combined.loaded, vec![(2024, 2)]);
        assert_eq!(combined.counts_by_year().get(&2024), Some(&2));
        assert_eq!(combined.counts_by_session().get(&SessionType::R), Some(&1));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_combine_without_files() {
        let dir = temp_dir("combine_empty");
        let config = PipelineConfig::with_data_dir(&dir);

        let err = combine_yearly(&config, &[2023]).unwrap_err();
        assert!(err.is_empty_result());

        fs::remove_dir_all(&dir).unwrap();
    }
}
