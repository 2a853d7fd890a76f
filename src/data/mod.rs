//! Data loading and persistence

pub mod csv_loader;
pub mod session_loader;

// Re-export commonly used types
pub use csv_loader::{
    combine_yearly, load_records, records_to_dataframe, save_records, write_csv, CombinedSeasons,
    RAW_COLUMNS,
};
pub use session_loader::{
    event_slug, EventInfo, JsonSessionLoader, LapRecord, ResultRow, SessionData, SessionLoader,
    WeekendFormat,
};
