//! Leakage-safe historical features
//!
//! History is a running state fed one event at a time. Every row of an event
//! reads the state before any outcome of that event is committed, so a row can
//! never see its own result or a teammate's result from the same race.

use std::collections::HashMap;

use crate::core::stats::TrailingWindow;
use crate::models::{HistoricalFeatures, PredictionRow};

/// Number of prior entries averaged by the rolling features
pub const ROLLING_WINDOW: usize = 5;

/// Prior entries required before a rolling mean is reported
pub const MIN_PRIOR_ENTRIES: usize = 1;

#[derive(Debug, Default, Clone, Copy)]
struct SeasonTally {
    wins: u32,
    podiums: u32,
}

/// Running history of race outcomes, keyed by driver, team and season
#[derive(Debug, Default)]
pub struct RaceHistory {
    driver_positions: HashMap<String, TrailingWindow>,
    driver_qualis: HashMap<String, TrailingWindow>,
    team_positions: HashMap<String, TrailingWindow>,
    seasons: HashMap<(String, i32), SeasonTally>,
}

fn window_mean(windows: &HashMap<String, TrailingWindow>, key: &str) -> Option<f64> {
    windows.get(key).and_then(|w| w.mean())
}

fn push(windows: &mut HashMap<String, TrailingWindow>, key: &str, value: Option<f64>) {
    windows
        .entry(key.to_string())
        .or_insert_with(|| TrailingWindow::new(ROLLING_WINDOW, MIN_PRIOR_ENTRIES))
        .push(value);
}

impl RaceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Features for a row given everything committed so far
    pub fn features_for(&self, row: &PredictionRow) -> HistoricalFeatures {
        let tally = self
            .seasons
            .get(&(row.driver.clone(), row.year))
            .copied()
            .unwrap_or_default();

        HistoricalFeatures {
            driver_avg_position_last5: window_mean(&self.driver_positions, &row.driver),
            driver_avg_quali_last5: window_mean(&self.driver_qualis, &row.driver),
            team_avg_position_last5: window_mean(&self.team_positions, &row.team),
            driver_wins_season: tally.wins,
            driver_podiums_season: tally.podiums,
        }
    }

    /// Add a row's outcomes to the history
    pub fn commit(&mut self, row: &PredictionRow) {
        let position = row.race_position.map(f64::from);

        push(&mut self.driver_positions, &row.driver, position);
        push(
            &mut self.driver_qualis,
            &row.driver,
            row.quali_position.map(f64::from),
        );
        push(&mut self.team_positions, &row.team, position);

        let tally = self
            .seasons
            .entry((row.driver.clone(), row.year))
            .or_default();
        if row.race_position == Some(1) {
            tally.wins += 1;
        }
        if row.race_position.is_some_and(|p| p <= 3) {
            tally.podiums += 1;
        }
    }

    /// Featurize one event block, then commit its outcomes
    pub fn process_event(&mut self, rows: &mut [PredictionRow]) {
        for row in rows.iter_mut() {
            row.historical = self.features_for(row);
        }
        for row in rows.iter() {
            self.commit(row);
        }
    }
}

/// Fill historical features on rows already in temporal order
///
/// Consecutive rows sharing (year, round, event) form one event block.
pub fn apply_historical(rows: &mut [PredictionRow]) {
    let mut history = RaceHistory::new();
    let mut start = 0;

    while start < rows.len() {
        let mut end = start + 1;
        while end < rows.len() && same_event(&rows[start], &rows[end]) {
            end += 1;
        }
        history.process_event(&mut rows[start..end]);
        start = end;
    }
}

fn same_event(a: &PredictionRow, b: &PredictionRow) -> bool {
    a.year == b.year && a.round == b.round && a.event == b.event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EngineeredFeatures, PracticeSnapshot};

    fn row(driver: &str, team: &str, year: i32, event: &str, position: Option<u32>) -> PredictionRow {
        PredictionRow {
            driver: driver.to_string(),
            team: team.to_string(),
            year,
            event: event.to_string(),
            round: None,
            race_position: position,
            grid_position: None,
            quali_position: None,
            q1: None,
            q2: None,
            q3: None,
            practice: [PracticeSnapshot::default(); 3],
            historical: HistoricalFeatures::default(),
            engineered: EngineeredFeatures::default(),
        }
    }

    #[test]
    fn test_first_event_has_no_history() {
        let mut rows = vec![row("VER", "Red Bull", 2024, "Bahrain", Some(1))];
        apply_historical(&mut rows);

        let h = rows[0].historical;
        assert_eq!(h.driver_avg_position_last5, None);
        assert_eq!(h.team_avg_position_last5, None);
        assert_eq!(h.driver_wins_season, 0);
        assert_eq!(h.driver_podiums_season, 0);
    }

    #[test]
    fn test_window_keeps_last_five() {
        let mut rows: Vec<PredictionRow> = (1..=7)
            .map(|i| row("HAM", "Ferrari", 2025, &format!("E{}", i), Some(i)))
            .collect();
        apply_historical(&mut rows);

        // Row 7 sees positions 2..=6
        let mean = rows[6].historical.driver_avg_position_last5.unwrap();
        assert!((mean - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_null_positions_occupy_window() {
        let mut rows = vec![
            row("ALO", "Aston Martin", 2024, "E1", Some(6)),
            row("ALO", "Aston Martin", 2024, "E2", None),
            row("ALO", "Aston Martin", 2024, "E3", Some(8)),
        ];
        apply_historical(&mut rows);

        assert!((rows[1].historical.driver_avg_position_last5.unwrap() - 6.0).abs() < 1e-9);
        assert!((rows[2].historical.driver_avg_position_last5.unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_teammate_same_event_not_visible() {
        let mut rows = vec![
            row("NOR", "McLaren", 2024, "Miami", Some(1)),
            row("PIA", "McLaren", 2024, "Miami", Some(4)),
            row("NOR", "McLaren", 2024, "Imola", Some(2)),
            row("PIA", "McLaren", 2024, "Imola", Some(3)),
        ];
        apply_historical(&mut rows);

        assert_eq!(rows[0].historical.team_avg_position_last5, None);
        assert_eq!(rows[1].historical.team_avg_position_last5, None);
        assert!((rows[2].historical.team_avg_position_last5.unwrap() - 2.5).abs() < 1e-9);
        assert!((rows[3].historical.team_avg_position_last5.unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_season_counts_reset_each_year() {
        let mut rows = vec![
            row("VER", "Red Bull", 2023, "Abu Dhabi", Some(1)),
            row("VER", "Red Bull", 2024, "Bahrain", Some(1)),
            row("VER", "Red Bull", 2024, "Jeddah", Some(3)),
            row("VER", "Red Bull", 2024, "Melbourne", None),
        ];
        apply_historical(&mut rows);

        assert_eq!(rows[1].historical.driver_wins_season, 0);
        assert_eq!(rows[2].historical.driver_wins_season, 1);
        assert_eq!(rows[3].historical.driver_wins_season, 1);
        assert_eq!(rows[3].historical.driver_podiums_season, 2);

        // Rolling windows span seasons
        assert!((rows[1].historical.driver_avg_position_last5.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_own_outcome_never_leaks() {
        let mut a = vec![
            row("LEC", "Ferrari", 2024, "X", Some(2)),
            row("LEC", "Ferrari", 2024, "Y", Some(5)),
        ];
        let mut b = a.clone();
        b[1].race_position = Some(1);

        apply_historical(&mut a);
        apply_historical(&mut b);
        assert_eq!(a[1].historical, b[1].historical);
    }

    #[test]
    fn test_driver_quali_average() {
        let mut rows: Vec<PredictionRow> = [("A", 4), ("B", 2), ("C", 9)]
            .iter()
            .map(|&(event, quali)| {
                let mut r = row("TSU", "RB", 2024, event, Some(10));
                r.quali_position = Some(quali);
                r
            })
            .collect();
        apply_historical(&mut rows);

        let quali: Vec<Option<f64>> = rows
            .iter()
            .map(|r| r.historical.driver_avg_quali_last5)
            .collect();
        assert_eq!(quali[0], None);
        assert!((quali[1].unwrap() - 4.0).abs() < 1e-9);
        assert!((quali[2].unwrap() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_own_quali_never_leaks() {
        let mut a = vec![
            row("ZHO", "Sauber", 2024, "X", Some(15)),
            row("ZHO", "Sauber", 2024, "Y", Some(14)),
        ];
        a[0].quali_position = Some(12);
        a[1].quali_position = Some(18);
        let mut b = a.clone();
        b[1].quali_position = Some(1);

        apply_historical(&mut a);
        apply_historical(&mut b);
        assert_eq!(a[1].historical.driver_avg_quali_last5, Some(12.0));
        assert_eq!(a[1].historical, b[1].historical);
    }
}
