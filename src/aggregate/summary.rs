//! Season summary statistics per driver/team
//!
//! Counting stats from race rows (wins, podiums, retirements) and qualifying
//! rows (poles). A group without race rows carries no race stats at all,
//! rather than zeros.

use polars::prelude::*;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::DEFAULT_DNF_KEYWORDS;
use crate::core::stats::mean_present;
use crate::models::{DriverTeamKey, SessionRecord, SessionType};

/// Output header, race and qualifying groups included
pub const SUMMARY_COLUMNS: [&str; 12] = [
    "Driver",
    "Team",
    "Total_Races",
    "Total_Points",
    "Wins",
    "Podiums",
    "DNFs",
    "Avg_Race_Position",
    "Best_Race_Position",
    "Avg_Quali_Position",
    "Best_Quali_Position",
    "Pole_Positions",
];

/// Classifies free-text finish statuses as retirements
#[derive(Debug, Clone)]
pub struct DnfMatcher {
    pattern: Option<Regex>,
}

impl Default for DnfMatcher {
    fn default() -> Self {
        Self::new(&DEFAULT_DNF_KEYWORDS[..])
            .expect("escaped default keywords form a valid pattern")
    }
}

impl DnfMatcher {
    /// Case-insensitive substring match against any keyword
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    pub fn is_dnf(&self, status: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|p| p.is_match(status))
    }
}

/// Race-derived statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceStats {
    pub total_races: usize,
    pub total_points: f64,
    pub wins: usize,
    pub podiums: usize,
    pub dnfs: usize,
    pub avg_race_position: Option<f64>,
    pub best_race_position: Option<u32>,
}

/// Qualifying-derived statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualiStats {
    pub avg_quali_position: Option<f64>,
    pub best_quali_position: Option<u32>,
    pub pole_positions: usize,
}

/// Summary for one driver/team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSummary {
    pub key: DriverTeamKey,
    pub race: Option<RaceStats>,
    pub quali: Option<QualiStats>,
}

fn race_stats(races: &[&SessionRecord], dnf: &DnfMatcher) -> Option<RaceStats> {
    if races.is_empty() {
        return None;
    }

    let positions: Vec<u32> = races.iter().filter_map(|r| r.position).collect();

    Some(RaceStats {
        total_races: races.len(),
        total_points: races.iter().filter_map(|r| r.points).sum(),
        wins: positions.iter().filter(|&&p| p == 1).count(),
        podiums: positions.iter().filter(|&&p| p <= 3).count(),
        dnfs: races
            .iter()
            .filter_map(|r| r.status.as_deref())
            .filter(|s| dnf.is_dnf(s))
            .count(),
        avg_race_position: mean_present(positions.iter().map(|&p| Some(p as f64))),
        best_race_position: positions.iter().copied().min(),
    })
}

fn quali_stats(qualis: &[&SessionRecord]) -> Option<QualiStats> {
    if qualis.is_empty() {
        return None;
    }

    let positions: Vec<u32> = qualis.iter().filter_map(|r| r.position).collect();

    Some(QualiStats {
        avg_quali_position: mean_present(positions.iter().map(|&p| Some(p as f64))),
        best_quali_position: positions.iter().copied().min(),
        pole_positions: positions.iter().filter(|&&p| p == 1).count(),
    })
}

/// Summarize every driver/team present in the records
///
/// Output is ordered by driver then team.
pub fn summarize(records: &[SessionRecord], dnf: &DnfMatcher) -> Vec<DriverSummary> {
    let mut grouped: BTreeMap<DriverTeamKey, Vec<&SessionRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.driver_team_key()).or_default().push(record);
    }

    grouped
        .into_iter()
        .map(|(key, group)| {
            let races: Vec<&SessionRecord> = group
                .iter()
                .copied()
                .filter(|r| r.session == SessionType::R)
                .collect();
            let qualis: Vec<&SessionRecord> = group
                .iter()
                .copied()
                .filter(|r| r.session == SessionType::Q)
                .collect();

            DriverSummary {
                key,
                race: race_stats(&races, dnf),
                quali: quali_stats(&qualis),
            }
        })
        .collect()
}

fn race_counts<F>(summaries: &[DriverSummary], f: F) -> Vec<Option<u32>>
where
    F: Fn(&RaceStats) -> Option<u32>,
{
    summaries
        .iter()
        .map(|s| s.race.as_ref().and_then(&f))
        .collect()
}

/// Materialize summaries as a DataFrame
///
/// The race and qualifying column groups are only emitted when at least one
/// summary has the corresponding source rows.
pub fn summaries_to_dataframe(summaries: &[DriverSummary]) -> PolarsResult<DataFrame> {
    let mut columns = vec![
        Column::new(
            SUMMARY_COLUMNS[0].into(),
            summaries.iter().map(|s| s.key.driver.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            SUMMARY_COLUMNS[1].into(),
            summaries.iter().map(|s| s.key.team.as_str()).collect::<Vec<_>>(),
        ),
    ];

    if summaries.iter().any(|s| s.race.is_some()) {
        columns.push(Column::new(
            SUMMARY_COLUMNS[2].into(),
            race_counts(summaries, |r| Some(r.total_races as u32)),
        ));
        columns.push(Column::new(
            SUMMARY_COLUMNS[3].into(),
            summaries
                .iter()
                .map(|s| s.race.as_ref().map(|r| r.total_points))
                .collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            SUMMARY_COLUMNS[4].into(),
            race_counts(summaries, |r| Some(r.wins as u32)),
        ));
        columns.push(Column::new(
            SUMMARY_COLUMNS[5].into(),
            race_counts(summaries, |r| Some(r.podiums as u32)),
        ));
        columns.push(Column::new(
            SUMMARY_COLUMNS[6].into(),
            race_counts(summaries, |r| Some(r.dnfs as u32)),
        ));
        columns.push(Column::new(
            SUMMARY_COLUMNS[7].into(),
            summaries
                .iter()
                .map(|s| s.race.as_ref().and_then(|r| r.avg_race_position))
                .collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            SUMMARY_COLUMNS[8].into(),
            race_counts(summaries, |r| r.best_race_position),
        ));
    }

    if summaries.iter().any(|s| s.quali.is_some()) {
        columns.push(Column::new(
            SUMMARY_COLUMNS[9].into(),
            summaries
                .iter()
                .map(|s| s.quali.as_ref().and_then(|q| q.avg_quali_position))
                .collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            SUMMARY_COLUMNS[10].into(),
            summaries
                .iter()
                .map(|s| s.quali.as_ref().and_then(|q| q.best_quali_position))
                .collect::<Vec<_>>(),
        ));
        columns.push(Column::new(
            SUMMARY_COLUMNS[11].into(),
            summaries
                .iter()
                .map(|s| s.quali.as_ref().map(|q| q.pole_positions as u32))
                .collect::<Vec<_>>(),
        ));
    }

    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race(driver: &str, event: &str, position: Option<u32>, status: &str, points: Option<f64>) -> SessionRecord {
        let mut r = SessionRecord::new(driver, "Ferrari", 2024, event, SessionType::R);
        r.position = position;
        r.status = Some(status.to_string());
        r.points = points;
        r
    }

    fn quali(driver: &str, event: &str, position: u32) -> SessionRecord {
        let mut r = SessionRecord::new(driver, "Ferrari", 2024, event, SessionType::Q);
        r.position = Some(position);
        r
    }

    #[test]
    fn test_dnf_matcher() {
        let matcher = DnfMatcher::default();
        assert!(matcher.is_dnf("Retired"));
        assert!(matcher.is_dnf("ENGINE"));
        assert!(matcher.is_dnf("Collision damage"));
        assert!(!matcher.is_dnf("Finished"));
        assert!(!matcher.is_dnf("+1 Lap"));

        let empty = DnfMatcher::new::<&str>(&[]).unwrap();
        assert!(!empty.is_dnf("Retired"));
    }

    #[test]
    fn test_one_retirement() {
        let records = vec![
            race("LEC", "Bahrain", Some(4), "Finished", Some(12.0)),
            race("LEC", "Jeddah", None, "Retired", None),
            race("LEC", "Melbourne", Some(2), "Finished", Some(18.0)),
        ];

        let summaries = summarize(&records, &DnfMatcher::default());
        assert_eq!(summaries.len(), 1);

        let stats = summaries[0].race.as_ref().unwrap();
        assert_eq!(stats.total_races, 3);
        assert_eq!(stats.dnfs, 1);
        assert_eq!(stats.wins, 0);
        assert_eq!(stats.podiums, 1);
        assert!((stats.total_points - 30.0).abs() < 1e-9);
        assert!((stats.avg_race_position.unwrap() - 3.0).abs() < 1e-9);
        assert_eq!(stats.best_race_position, Some(2));
        assert!(summaries[0].quali.is_none());
    }

    #[test]
    fn test_points_default_to_zero() {
        let records = vec![race("SAI", "Monaco", Some(1), "Finished", None)];
        let stats = summarize(&records, &DnfMatcher::default())[0].race.clone().unwrap();
        assert_eq!(stats.total_points, 0.0);
        assert_eq!(stats.wins, 1);
    }

    #[test]
    fn test_quali_only_group_has_no_race_stats() {
        let records = vec![quali("BEA", "Jeddah", 1), quali("BEA", "Baku", 3)];
        let summaries = summarize(&records, &DnfMatcher::default());

        assert!(summaries[0].race.is_none());
        let q = summaries[0].quali.as_ref().unwrap();
        assert_eq!(q.pole_positions, 1);
        assert_eq!(q.best_quali_position, Some(1));
        assert!((q.avg_quali_position.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_practice_only_group_is_listed() {
        let fp = SessionRecord::new("ANT", "Mercedes", 2024, "Monza", SessionType::FP1);
        let summaries = summarize(&[fp], &DnfMatcher::default());
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].race.is_none());
        assert!(summaries[0].quali.is_none());
    }

    #[test]
    fn test_summaries_to_dataframe() {
        let records = vec![
            race("LEC", "Bahrain", Some(1), "Finished", Some(25.0)),
            quali("LEC", "Bahrain", 2),
            quali("SAI", "Bahrain", 1),
        ];
        let summaries = summarize(&records, &DnfMatcher::default());
        let df = summaries_to_dataframe(&summaries).unwrap();

        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(names, SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        assert_eq!(df.height(), 2);

        let wins = df.column("Wins").unwrap().as_materialized_series().u32().unwrap().clone();
        assert_eq!(wins.get(0), Some(1));
        assert_eq!(wins.get(1), None);
    }

    #[test]
    fn test_dataframe_omits_absent_groups() {
        let summaries = summarize(&[quali("SAI", "Bahrain", 1)], &DnfMatcher::default());
        let df = summaries_to_dataframe(&summaries).unwrap();
        assert!(df.column("Total_Races").is_err());
        assert!(df.column("Pole_Positions").is_ok());
    }
}
