use polars::prelude::PolarsError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::SessionType;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Tabular I/O failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No session records found in {source_name}")]
    NoRecords { source_name: String },

    #[error("Required column missing from input: {0}")]
    MissingColumn(String),

    #[error("Invalid status keyword pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl PipelineError {
    pub fn no_records(source_name: impl Into<String>) -> Self {
        PipelineError::NoRecords {
            source_name: source_name.into(),
        }
    }

    /// True for the empty-input condition, as opposed to an I/O failure
    pub fn is_empty_result(&self) -> bool {
        matches!(self, PipelineError::NoRecords { .. })
    }
}

/// Session loader errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// The session was not held or is not published
    #[error("{session} not available for {year} {event}")]
    NotAvailable {
        year: i32,
        event: String,
        session: SessionType,
    },

    /// Anything else: unreadable export, garbled payload, transport failure
    #[error("Failed to load {path:?}: {message}")]
    Fetch { path: PathBuf, message: String },
}

/// Per-driver value errors; any one of these empties the whole session
#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("Driver {driver}: invalid {field} value {value}")]
    InvalidRank {
        driver: String,
        field: &'static str,
        value: f64,
    },

    #[error("Driver {driver}: invalid lap time {value}")]
    InvalidLapTime { driver: String, value: f64 },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::no_records("f1_raw_session_data.csv");
        assert!(err.to_string().contains("No session records"));
        assert!(err.is_empty_result());

        let err = PipelineError::MissingColumn("Driver".to_string());
        assert!(!err.is_empty_result());
    }

    #[test]
    fn test_load_error_display() {
        let err = LoadError::NotAvailable {
            year: 2024,
            event: "Monaco Grand Prix".to_string(),
            session: SessionType::FP3,
        };
        assert_eq!(err.to_string(), "FP3 not available for 2024 Monaco Grand Prix");
    }

    #[test]
    fn test_extract_error_display() {
        let err = ExtractError::InvalidRank {
            driver: "HAM".to_string(),
            field: "Position",
            value: -1.0,
        };
        assert!(err.to_string().contains("HAM"));
        assert!(err.to_string().contains("Position"));
    }
}
