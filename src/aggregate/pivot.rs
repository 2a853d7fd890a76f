//! Long → wide pivot
//!
//! Every metric of every record lands under a structured
//! `(year, event, session, metric)` key on its driver/team row. Column names
//! such as `2024_Bahrain_Grand_Prix_FP1_BestLapTime_seconds` are only built
//! when the table is materialized.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::data::session_loader::event_slug;
use crate::models::{DriverTeamKey, SessionRecord, SessionType};

/// Identity columns leading every wide row
pub const WIDE_ID_COLUMNS: [&str; 3] = ["Driver_Team", "Driver", "Team"];

/// A pivotable metric column of the long-format table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    BestLapTime,
    AvgLapTime,
    TotalLaps,
    Position,
    Q1,
    Q2,
    Q3,
    GridPosition,
    Points,
    Status,
    FastestLap,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::BestLapTime,
        Metric::AvgLapTime,
        Metric::TotalLaps,
        Metric::Position,
        Metric::Q1,
        Metric::Q2,
        Metric::Q3,
        Metric::GridPosition,
        Metric::Points,
        Metric::Status,
        Metric::FastestLap,
    ];

    /// Column name in the long-format table
    pub fn column(&self) -> &'static str {
        match self {
            Metric::BestLapTime => "BestLapTime_seconds",
            Metric::AvgLapTime => "AvgLapTime_seconds",
            Metric::TotalLaps => "TotalLaps",
            Metric::Position => "Position",
            Metric::Q1 => "Q1_seconds",
            Metric::Q2 => "Q2_seconds",
            Metric::Q3 => "Q3_seconds",
            Metric::GridPosition => "GridPosition",
            Metric::Points => "Points",
            Metric::Status => "Status",
            Metric::FastestLap => "FastestLap_seconds",
        }
    }

    pub fn value(&self, record: &SessionRecord) -> Option<MetricValue> {
        match self {
            Metric::BestLapTime => record.best_lap_time.map(MetricValue::Float),
            Metric::AvgLapTime => record.avg_lap_time.map(MetricValue::Float),
            Metric::TotalLaps => record.total_laps.map(MetricValue::Count),
            Metric::Position => record.position.map(MetricValue::Count),
            Metric::Q1 => record.q1.map(MetricValue::Float),
            Metric::Q2 => record.q2.map(MetricValue::Float),
            Metric::Q3 => record.q3.map(MetricValue::Float),
            Metric::GridPosition => record.grid_position.map(MetricValue::Count),
            Metric::Points => record.points.map(MetricValue::Float),
            Metric::Status => record.status.clone().map(MetricValue::Text),
            Metric::FastestLap => record.fastest_lap.map(MetricValue::Float),
        }
    }
}

/// A present metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    Float(f64),
    Count(u32),
    Text(String),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Float(v) => Some(*v),
            MetricValue::Count(v) => Some(*v as f64),
            MetricValue::Text(_) => None,
        }
    }
}

/// Structured wide-column key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PivotKey {
    pub year: i32,
    pub event: String,
    pub session: SessionType,
    pub metric: Metric,
}

impl PivotKey {
    pub fn new(record: &SessionRecord, metric: Metric) -> Self {
        Self {
            year: record.year,
            event: record.event.clone(),
            session: record.session,
            metric,
        }
    }

    /// `{Year}_{Event}_{Session}_{Metric}` with spaces in the event replaced
    pub fn column_name(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.year,
            event_slug(&self.event),
            self.session.code(),
            self.metric.column()
        )
    }
}

/// One driver/team row of the wide table
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub key: DriverTeamKey,
    pub values: BTreeMap<PivotKey, MetricValue>,
}

impl WideRow {
    fn new(key: DriverTeamKey) -> Self {
        Self {
            key,
            values: BTreeMap::new(),
        }
    }

    /// Merge a record's present metrics; absent metrics never erase anything
    pub fn merge(&mut self, record: &SessionRecord) {
        for metric in Metric::ALL {
            if let Some(value) = metric.value(record) {
                self.values.insert(PivotKey::new(record, metric), value);
            }
        }
    }

    pub fn get(&self, key: &PivotKey) -> Option<&MetricValue> {
        self.values.get(key)
    }

    /// Look a value up by its materialized column name
    pub fn get_column(&self, name: &str) -> Option<&MetricValue> {
        self.values
            .iter()
            .find(|(k, _)| k.column_name() == name)
            .map(|(_, v)| v)
    }
}

/// Wide table, rows ordered by driver/team
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WideTable {
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, key: &DriverTeamKey) -> Option<&WideRow> {
        self.rows.iter().find(|r| &r.key == key)
    }

    /// Dynamic column names in alphabetical order
    pub fn metric_columns(&self) -> Vec<String> {
        self.column_metrics().into_keys().collect()
    }

    /// Full header: identity columns then sorted metric columns
    pub fn columns(&self) -> Vec<String> {
        WIDE_ID_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.metric_columns())
            .collect()
    }

    fn column_metrics(&self) -> BTreeMap<String, Metric> {
        self.rows
            .iter()
            .flat_map(|row| row.values.keys())
            .map(|k| (k.column_name(), k.metric))
            .collect()
    }

    /// Materialize as a DataFrame
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let named_rows: Vec<HashMap<String, &MetricValue>> = self
            .rows
            .iter()
            .map(|row| {
                row.values
                    .iter()
                    .map(|(k, v)| (k.column_name(), v))
                    .collect()
            })
            .collect();

        let mut columns = vec![
            Column::new(
                WIDE_ID_COLUMNS[0].into(),
                self.rows.iter().map(|r| r.key.label()).collect::<Vec<_>>(),
            ),
            Column::new(
                WIDE_ID_COLUMNS[1].into(),
                self.rows.iter().map(|r| r.key.driver.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                WIDE_ID_COLUMNS[2].into(),
                self.rows.iter().map(|r| r.key.team.as_str()).collect::<Vec<_>>(),
            ),
        ];

        for (name, metric) in self.column_metrics() {
            let cells = named_rows.iter().map(|row| row.get(&name).copied());
            let column = match metric {
                Metric::TotalLaps | Metric::Position | Metric::GridPosition => Column::new(
                    name.as_str().into(),
                    cells
                        .map(|v| match v {
                            Some(MetricValue::Count(c)) => Some(*c),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                ),
                Metric::Status => Column::new(
                    name.as_str().into(),
                    cells
                        .map(|v| match v {
                            Some(MetricValue::Text(s)) => Some(s.clone()),
                            _ => None,
                        })
                        .collect::<Vec<_>>(),
                ),
                _ => Column::new(
                    name.as_str().into(),
                    cells.map(|v| v.and_then(MetricValue::as_f64)).collect::<Vec<_>>(),
                ),
            };
            columns.push(column);
        }

        DataFrame::new(columns)
    }
}

/// Pivot long-format records into one row per driver/team
///
/// Later records only add columns or replace a value with another present
/// value. Rows come out sorted by driver then team.
pub fn pivot_to_wide(records: &[SessionRecord]) -> WideTable {
    let mut rows: BTreeMap<DriverTeamKey, WideRow> = BTreeMap::new();

    for record in records {
        let key = record.driver_team_key();
        rows.entry(key.clone())
            .or_insert_with(|| WideRow::new(key))
            .merge(record);
    }

    WideTable {
        rows: rows.into_values().collect(),
    }
}
