//! Prediction dataset
//!
//! One row per race entry, joined with that weekend's qualifying and practice
//! results, plus rolling history and event-relative features. Building is three
//! passes over owned rows:
//!
//! 1. [`builder::join_race_entries`] attaches qualifying and practice data
//! 2. [`history::apply_historical`] walks events in temporal order
//! 3. [`engineered::apply_engineered`] adds per-row and per-event gaps

pub mod builder;
pub mod engineered;
pub mod history;

pub use builder::{build_prediction_rows, join_race_entries, sort_temporal};
pub use engineered::apply_engineered;
pub use history::{apply_historical, RaceHistory, MIN_PRIOR_ENTRIES, ROLLING_WINDOW};

use polars::prelude::*;

use crate::models::PredictionRow;

/// Output header of the prediction dataset
pub const PREDICTION_COLUMNS: [&str; 28] = [
    "Driver",
    "Team",
    "Year",
    "Event",
    "RacePosition",
    "GridPosition",
    "QualiPosition",
    "Q1_seconds",
    "Q2_seconds",
    "Q3_seconds",
    "FP1_BestLap",
    "FP1_AvgLap",
    "FP1_Laps",
    "FP2_BestLap",
    "FP2_AvgLap",
    "FP2_Laps",
    "FP3_BestLap",
    "FP3_AvgLap",
    "FP3_Laps",
    "DriverAvgPosition_Last5",
    "DriverAvgQuali_Last5",
    "TeamAvgPosition_Last5",
    "DriverWins_Season",
    "DriverPodiums_Season",
    "QualiToGridDiff",
    "FP_BestLap",
    "FP_BestLap_Relative",
    "Quali_Relative",
];

fn float_column<F>(name: &str, rows: &[PredictionRow], f: F) -> Column
where
    F: Fn(&PredictionRow) -> Option<f64>,
{
    Column::new(name.into(), rows.iter().map(f).collect::<Vec<_>>())
}

fn count_column<F>(name: &str, rows: &[PredictionRow], f: F) -> Column
where
    F: Fn(&PredictionRow) -> Option<u32>,
{
    Column::new(name.into(), rows.iter().map(f).collect::<Vec<_>>())
}

/// Materialize prediction rows in [`PREDICTION_COLUMNS`] order
pub fn prediction_rows_to_dataframe(rows: &[PredictionRow]) -> PolarsResult<DataFrame> {
    let c = &PREDICTION_COLUMNS;
    let mut columns = vec![
        Column::new(
            c[0].into(),
            rows.iter().map(|r| r.driver.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            c[1].into(),
            rows.iter().map(|r| r.team.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(c[2].into(), rows.iter().map(|r| r.year).collect::<Vec<_>>()),
        Column::new(
            c[3].into(),
            rows.iter().map(|r| r.event.as_str()).collect::<Vec<_>>(),
        ),
        count_column(c[4], rows, |r| r.race_position),
        count_column(c[5], rows, |r| r.grid_position),
        count_column(c[6], rows, |r| r.quali_position),
        float_column(c[7], rows, |r| r.q1),
        float_column(c[8], rows, |r| r.q2),
        float_column(c[9], rows, |r| r.q3),
    ];

    for (i, names) in c[10..19].chunks(3).enumerate() {
        columns.push(float_column(names[0], rows, |r| r.practice[i].best_lap));
        columns.push(float_column(names[1], rows, |r| r.practice[i].avg_lap));
        columns.push(count_column(names[2], rows, |r| r.practice[i].laps));
    }

    columns.extend([
        float_column(c[19], rows, |r| r.historical.driver_avg_position_last5),
        float_column(c[20], rows, |r| r.historical.driver_avg_quali_last5),
        float_column(c[21], rows, |r| r.historical.team_avg_position_last5),
        count_column(c[22], rows, |r| Some(r.historical.driver_wins_season)),
        count_column(c[23], rows, |r| Some(r.historical.driver_podiums_season)),
        Column::new(
            c[24].into(),
            rows.iter()
                .map(|r| r.engineered.quali_to_grid_diff)
                .collect::<Vec<_>>(),
        ),
        float_column(c[25], rows, |r| r.engineered.fp_best_lap),
        float_column(c[26], rows, |r| r.engineered.fp_best_lap_relative),
        float_column(c[27], rows, |r| r.engineered.quali_relative),
    ]);

    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SessionRecord, SessionType};

    #[test]
    fn test_dataframe_layout() {
        let mut fp3 = SessionRecord::new("RUS", "Mercedes", 2024, "Las Vegas", SessionType::FP3);
        fp3.best_lap_time = Some(93.8);
        fp3.total_laps = Some(19);
        let mut race = SessionRecord::new("RUS", "Mercedes", 2024, "Las Vegas", SessionType::R);
        race.position = Some(1);

        let rows = build_prediction_rows(&[fp3, race]);
        let df = prediction_rows_to_dataframe(&rows).unwrap();

        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, PREDICTION_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        assert_eq!(df.height(), 1);

        let laps = df.column("FP3_Laps").unwrap().as_materialized_series().u32().unwrap().clone();
        assert_eq!(laps.get(0), Some(19));
        let fp1 = df.column("FP1_BestLap").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(fp1.get(0), None);
        let best = df.column("FP_BestLap").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(best.get(0), Some(93.8));
    }

    #[test]
    fn test_empty_dataframe_has_header() {
        let df = prediction_rows_to_dataframe(&[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), PREDICTION_COLUMNS.len());
    }
}
