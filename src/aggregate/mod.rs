//! Long-format aggregations: the wide pivot and per-driver season summaries

pub mod pivot;
pub mod summary;

// Re-export commonly used types
pub use pivot::{pivot_to_wide, Metric, MetricValue, PivotKey, WideRow, WideTable, WIDE_ID_COLUMNS};
pub use summary::{
    summaries_to_dataframe, summarize, DnfMatcher, DriverSummary, QualiStats, RaceStats,
    SUMMARY_COLUMNS,
};
