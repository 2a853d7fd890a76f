//! F1 Features - race outcome feature engineering
//!
//! This library provides:
//! - Extraction of per-driver session records from loaded timing data
//! - A wide pivot and per-driver season summaries of those records
//! - A leakage-safe prediction dataset with rolling history and event-relative gaps
//! - CSV persistence for raw and derived tables
//!
//! # Example
//!
//! ```no_run
//! use f1_features::config::PipelineConfig;
//! use f1_features::pipeline::prepare_dataset;
//!
//! let config = PipelineConfig::with_data_dir("data");
//! let output = prepare_dataset(&config).unwrap();
//! println!("{} race entries written to {:?}", output.rows, output.path);
//! ```

pub mod aggregate;
pub mod collector;
pub mod config;
pub mod core;
pub mod data;
pub mod dataset;
pub mod error;
pub mod models;
pub mod pipeline;

// Re-export commonly used types
pub use aggregate::{pivot_to_wide, summarize, DnfMatcher, DriverSummary, WideTable};
pub use collector::{collect_event, extract_session, CollectedEvent};
pub use config::PipelineConfig;
pub use data::{load_records, save_records, JsonSessionLoader, SessionLoader};
pub use dataset::{build_prediction_rows, PREDICTION_COLUMNS};
pub use error::{ExtractError, LoadError, PipelineError};
pub use models::{DriverTeamKey, PredictionRow, SessionRecord, SessionType};
