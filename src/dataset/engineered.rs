//! Per-row and per-event engineered features

use std::collections::HashMap;

use crate::core::stats::min_present;
use crate::models::{EngineeredFeatures, PredictionRow};

/// Grid slot minus qualifying position; positive means a grid drop
pub fn quali_to_grid_diff(row: &PredictionRow) -> Option<i64> {
    match (row.grid_position, row.quali_position) {
        (Some(grid), Some(quali)) => Some(i64::from(grid) - i64::from(quali)),
        _ => None,
    }
}

/// Best lap across the three practice sessions
pub fn fp_best_lap(row: &PredictionRow) -> Option<f64> {
    min_present(row.practice.iter().map(|p| p.best_lap))
}

/// Gap of each value to the smallest value within its (year, event) group
fn gap_to_event_best<F>(rows: &[PredictionRow], value: F) -> Vec<Option<f64>>
where
    F: Fn(&PredictionRow) -> Option<f64>,
{
    let mut best: HashMap<(i32, &str), Option<f64>> = HashMap::new();
    for row in rows {
        let entry = best.entry((row.year, row.event.as_str())).or_insert(None);
        *entry = min_present([*entry, value(row)]);
    }

    rows.iter()
        .map(|row| {
            let v = value(row)?;
            let min = best.get(&(row.year, row.event.as_str())).copied().flatten()?;
            Some(v - min)
        })
        .collect()
}

/// Fill engineered features for every row
pub fn apply_engineered(rows: &mut [PredictionRow]) {
    for row in rows.iter_mut() {
        row.engineered = EngineeredFeatures {
            quali_to_grid_diff: quali_to_grid_diff(row),
            fp_best_lap: fp_best_lap(row),
            ..Default::default()
        };
    }

    let fp_relative = gap_to_event_best(rows, |r| r.engineered.fp_best_lap);
    let quali_relative = gap_to_event_best(rows, |r| r.q3);

    for (row, (fp, quali)) in rows.iter_mut().zip(fp_relative.into_iter().zip(quali_relative)) {
        row.engineered.fp_best_lap_relative = fp;
        row.engineered.quali_relative = quali;
    }
}
