//! Race-entry rows joined with qualifying and practice results

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use super::engineered::apply_engineered;
use super::history::apply_historical;
use crate::models::{
    EngineeredFeatures, HistoricalFeatures, PracticeSnapshot, PredictionRow, SessionRecord,
    SessionType,
};

type EventKey<'a> = (&'a str, i32, &'a str);

fn event_key(record: &SessionRecord) -> EventKey<'_> {
    (record.driver.as_str(), record.year, record.event.as_str())
}

/// First-match lookups from a race entry to its weekend sessions
struct SessionIndex<'a> {
    quali: HashMap<EventKey<'a>, &'a SessionRecord>,
    practice: HashMap<(EventKey<'a>, SessionType), &'a SessionRecord>,
}

impl<'a> SessionIndex<'a> {
    fn build(records: &'a [SessionRecord]) -> Self {
        let mut quali = HashMap::new();
        let mut practice = HashMap::new();

        for record in records {
            match record.session {
                SessionType::Q => {
                    quali.entry(event_key(record)).or_insert(record);
                }
                SessionType::FP1 | SessionType::FP2 | SessionType::FP3 => {
                    practice
                        .entry((event_key(record), record.session))
                        .or_insert(record);
                }
                _ => {}
            }
        }

        Self { quali, practice }
    }

    fn race_entry(&self, race: &SessionRecord) -> PredictionRow {
        let key = event_key(race);
        let quali = self.quali.get(&key);

        let mut practice = [PracticeSnapshot::default(); 3];
        for (snapshot, session) in practice.iter_mut().zip(SessionType::PRACTICE) {
            if let Some(fp) = self.practice.get(&(key, session)) {
                *snapshot = PracticeSnapshot {
                    best_lap: fp.best_lap_time,
                    avg_lap: fp.avg_lap_time,
                    laps: fp.total_laps,
                };
            }
        }

        PredictionRow {
            driver: race.driver.clone(),
            team: race.team.clone(),
            year: race.year,
            event: race.event.clone(),
            round: race.round,
            race_position: race.position,
            grid_position: race.grid_position,
            quali_position: quali.and_then(|q| q.position),
            q1: quali.and_then(|q| q.q1),
            q2: quali.and_then(|q| q.q2),
            q3: quali.and_then(|q| q.q3),
            practice,
            historical: HistoricalFeatures::default(),
            engineered: EngineeredFeatures::default(),
        }
    }
}

/// One joined row per race record, in input order, features not yet computed
pub fn join_race_entries(records: &[SessionRecord]) -> Vec<PredictionRow> {
    let index = SessionIndex::build(records);
    let rows: Vec<PredictionRow> = records
        .iter()
        .filter(|r| r.session == SessionType::R)
        .map(|r| index.race_entry(r))
        .collect();

    debug!(
        "Joined {} race entries ({} qualifying, {} practice records indexed)",
        rows.len(),
        index.quali.len(),
        index.practice.len()
    );
    rows
}

/// Stable temporal order: year, round, event, driver
pub fn sort_temporal(rows: &mut [PredictionRow]) {
    rows.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| a.round.cmp(&b.round))
            .then_with(|| a.event.cmp(&b.event))
            .then_with(|| a.driver.cmp(&b.driver))
    });
}

/// Seasons holding both rows with a round number and rows without one
///
/// Round-less events sort ahead of every numbered round in such a season.
pub fn mixed_round_seasons(rows: &[PredictionRow]) -> Vec<i32> {
    let mut seen: BTreeMap<i32, (bool, bool)> = BTreeMap::new();
    for row in rows {
        let entry = seen.entry(row.year).or_default();
        if row.round.is_some() {
            entry.0 = true;
        } else {
            entry.1 = true;
        }
    }
    seen.into_iter()
        .filter(|(_, (with, without))| *with && *without)
        .map(|(year, _)| year)
        .collect()
}

/// Build the full prediction dataset
///
/// Output rows are in temporal order and there is exactly one per race record.
pub fn build_prediction_rows(records: &[SessionRecord]) -> Vec<PredictionRow> {
    let mut rows = join_race_entries(records);
    for year in mixed_round_seasons(&rows) {
        warn!(
            "{} mixes events with and without round numbers; unnumbered events sort first",
            year
        );
    }
    sort_temporal(&mut rows);
    apply_historical(&mut rows);
    apply_engineered(&mut rows);

    info!(
        "Built {} prediction rows from {} records",
        rows.len(),
        records.len()
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(driver: &str, event: &str, session: SessionType) -> SessionRecord {
        SessionRecord::new(driver, "Ferrari", 2024, event, session)
    }

    fn race(driver: &str, event: &str, position: u32) -> SessionRecord {
        let mut r = record(driver, event, SessionType::R);
        r.position = Some(position);
        r
    }

    #[test]
    fn test_empty_input() {
        assert!(build_prediction_rows(&[]).is_empty());
    }

    #[test]
    fn test_one_row_per_race_record() {
        let mut fp = record("LEC", "Monaco", SessionType::FP1);
        fp.best_lap_time = Some(72.1);
        let records = vec![
            fp,
            record("LEC", "Monaco", SessionType::Q),
            race("LEC", "Monaco", 1),
            race("SAI", "Monaco", 3),
            record("SAI", "Monaco", SessionType::S),
        ];
        assert_eq!(build_prediction_rows(&records).len(), 2);
    }

    #[test]
    fn test_prior_race_only() {
        let mut quali = record("A", "X", SessionType::Q);
        quali.q1 = Some(90.5);
        let records = vec![quali, race("A", "X", 1), race("A", "Y", 3)];

        let rows = build_prediction_rows(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].event, "X");
        assert_eq!(rows[0].historical.driver_avg_position_last5, None);
        assert!((rows[1].historical.driver_avg_position_last5.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(rows[0].q1, Some(90.5));
        assert_eq!(rows[1].q1, None);
    }

    #[test]
    fn test_joins_first_match() {
        let mut q_first = record("NOR", "Silverstone", SessionType::Q);
        q_first.position = Some(2);
        q_first.q3 = Some(86.1);
        let mut q_dup = record("NOR", "Silverstone", SessionType::Q);
        q_dup.position = Some(9);
        let mut sq = record("NOR", "Silverstone", SessionType::SQ);
        sq.position = Some(1);
        let mut fp2 = record("NOR", "Silverstone", SessionType::FP2);
        fp2.best_lap_time = Some(88.0);
        fp2.avg_lap_time = Some(91.4);
        fp2.total_laps = Some(27);

        let records = vec![sq, q_first, q_dup, fp2, race("NOR", "Silverstone", 1)];
        let rows = build_prediction_rows(&records);

        assert_eq!(rows[0].quali_position, Some(2));
        assert_eq!(rows[0].q3, Some(86.1));
        assert_eq!(rows[0].fp1(), &PracticeSnapshot::default());
        assert_eq!(rows[0].fp2().laps, Some(27));
        assert_eq!(rows[0].engineered.fp_best_lap, Some(88.0));
        assert_eq!(rows[0].engineered.fp_best_lap_relative, Some(0.0));
    }

    #[test]
    fn test_missing_practice_is_null() {
        let rows = build_prediction_rows(&[race("BOT", "Baku", 14)]);
        assert_eq!(rows[0].engineered.fp_best_lap, None);
        assert_eq!(rows[0].quali_position, None);
        assert_eq!(rows[0].engineered.quali_to_grid_diff, None);
    }

    #[test]
    fn test_round_orders_events() {
        let mut late = race("PER", "Abu Dhabi", 4);
        late.round = Some(24);
        let mut early = race("PER", "Zandvoort", 9);
        early.round = Some(15);

        let rows = build_prediction_rows(&[late, early]);
        assert_eq!(rows[0].event, "Zandvoort");
        assert!((rows[1].historical.driver_avg_position_last5.unwrap() - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_sort_is_stable_for_duplicates() {
        let mut first = race("HUL", "Jeddah", 10);
        first.grid_position = Some(12);
        let mut second = race("HUL", "Jeddah", 11);
        second.grid_position = Some(15);

        let rows = build_prediction_rows(&[first, second]);
        assert_eq!(rows[0].grid_position, Some(12));
        assert_eq!(rows[1].grid_position, Some(15));
    }

    #[test]
    fn test_mixed_round_seasons() {
        let mut numbered = race("GAS", "Suzuka", 12);
        numbered.round = Some(4);
        let mut other = race("GAS", "Monza", 8);
        other.round = Some(16);
        let unnumbered = race("GAS", "Baku", 10);
        let mut next_year = race("GAS", "Sakhir", 11);
        next_year.year = 2025;

        let rows = join_race_entries(&[numbered.clone(), unnumbered, next_year]);
        assert_eq!(mixed_round_seasons(&rows), vec![2024]);

        let rows = join_race_entries(&[numbered, other]);
        assert!(mixed_round_seasons(&rows).is_empty());
    }
}
