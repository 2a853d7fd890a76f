//! Pipeline configuration

use std::path::{Path, PathBuf};

/// Default working directory for raw and derived CSV files
pub const DEFAULT_DATA_DIR: &str = "data";

/// Status substrings counted as a retirement
pub const DEFAULT_DNF_KEYWORDS: [&str; 8] = [
    "Retired",
    "Accident",
    "Collision",
    "Damage",
    "Engine",
    "Gearbox",
    "Hydraulics",
    "DNF",
];

/// File layout and tunables for a batch run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    /// Stem of the raw long-format file; per-year dumps append `_{year}`
    pub raw_stem: String,
    pub prediction_file: String,
    pub pivot_file: String,
    pub summary_file: String,
    /// Seasons merged by `combine` when none are given
    pub years: Vec<i32>,
    pub dnf_keywords: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            raw_stem: "f1_raw_session_data".to_string(),
            prediction_file: "f1_prediction_dataset.csv".to_string(),
            pivot_file: "f1_wide_session_data.csv".to_string(),
            summary_file: "f1_driver_summary.csv".to_string(),
            years: vec![2023, 2024, 2025],
            dnf_keywords: DEFAULT_DNF_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Combined raw records across all seasons
    pub fn raw_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.csv", self.raw_stem))
    }

    /// Raw records for a single season
    pub fn yearly_raw_path(&self, year: i32) -> PathBuf {
        self.data_dir.join(format!("{}_{}.csv", self.raw_stem, year))
    }

    pub fn prediction_path(&self) -> PathBuf {
        self.data_dir.join(&self.prediction_file)
    }

    pub fn pivot_path(&self) -> PathBuf {
        self.data_dir.join(&self.pivot_file)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.data_dir.join(&self.summary_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = PipelineConfig::with_data_dir("/tmp/f1");
        assert_eq!(config.raw_path(), PathBuf::from("/tmp/f1/f1_raw_session_data.csv"));
        assert_eq!(
            config.yearly_raw_path(2024),
            PathBuf::from("/tmp/f1/f1_raw_session_data_2024.csv")
        );
        assert_eq!(
            config.prediction_path(),
            PathBuf::from("/tmp/f1/f1_prediction_dataset.csv")
        );
    }

    #[test]
    fn test_default_dnf_keywords() {
        let config = PipelineConfig::default();
        assert_eq!(config.dnf_keywords.len(), 8);
        assert!(config.dnf_keywords.iter().any(|k| k == "Hydraulics"));
        assert_eq!(config.years, vec![2023, 2024, 2025]);
    }
}
