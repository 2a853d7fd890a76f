//! File-level stages
//!
//! Each stage reads the combined raw CSV, builds one derived table and writes
//! it next to the input. An empty or missing input is reported as
//! [`PipelineError::NoRecords`] and no output file is written.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::aggregate::{pivot_to_wide, summaries_to_dataframe, summarize, DnfMatcher, DriverSummary};
use crate::config::PipelineConfig;
use crate::data::csv_loader::{combine_yearly, load_records, save_records, write_csv, CombinedSeasons};
use crate::dataset::{build_prediction_rows, prediction_rows_to_dataframe};
use crate::error::{PipelineError, Result};
use crate::models::{PredictionRow, SessionRecord};

/// Derived tables produced from the raw records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prediction,
    Pivot,
    Summary,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Prediction, Stage::Pivot, Stage::Summary];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Prediction => "prediction dataset",
            Stage::Pivot => "wide pivot",
            Stage::Summary => "driver summary",
        }
    }

    pub fn output_path(&self, config: &PipelineConfig) -> PathBuf {
        match self {
            Stage::Prediction => config.prediction_path(),
            Stage::Pivot => config.pivot_path(),
            Stage::Summary => config.summary_path(),
        }
    }
}

/// Shape and location of a written table
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    pub stage: Stage,
    pub rows: usize,
    pub columns: usize,
    pub path: PathBuf,
}

fn non_empty<'a>(records: &'a [SessionRecord], source: &str) -> Result<&'a [SessionRecord]> {
    if records.is_empty() {
        Err(PipelineError::no_records(source))
    } else {
        Ok(records)
    }
}

/// Load the combined raw records, failing on a missing or empty file
pub fn load_raw(config: &PipelineConfig) -> Result<Vec<SessionRecord>> {
    let path = config.raw_path();
    if !path.exists() {
        return Err(PipelineError::no_records(path.display().to_string()));
    }
    let records = load_records(&path)?;
    non_empty(&records, &path.display().to_string())?;
    Ok(records)
}

/// Prediction rows for in-memory records
pub fn prediction_rows(records: &[SessionRecord]) -> Result<Vec<PredictionRow>> {
    let records = non_empty(records, "input records")?;
    Ok(build_prediction_rows(records))
}

/// Prediction dataset table for in-memory records
pub fn prediction_frame(records: &[SessionRecord]) -> Result<DataFrame> {
    let rows = prediction_rows(records)?;
    Ok(prediction_rows_to_dataframe(&rows)?)
}

/// Wide pivot table for in-memory records
pub fn pivot_frame(records: &[SessionRecord]) -> Result<DataFrame> {
    let records = non_empty(records, "input records")?;
    Ok(pivot_to_wide(records).to_dataframe()?)
}

/// Driver summaries for in-memory records
pub fn driver_summaries(records: &[SessionRecord], config: &PipelineConfig) -> Result<Vec<DriverSummary>> {
    let records = non_empty(records, "input records")?;
    let matcher = DnfMatcher::new(config.dnf_keywords.as_slice())?;
    Ok(summarize(records, &matcher))
}

fn write_stage(stage: Stage, mut df: DataFrame, path: &Path) -> Result<StageOutput> {
    write_csv(&mut df, path)?;
    info!(
        "Saved {} ({} rows x {} columns) to {:?}",
        stage.label(),
        df.height(),
        df.width(),
        path
    );
    Ok(StageOutput {
        stage,
        rows: df.height(),
        columns: df.width(),
        path: path.to_path_buf(),
    })
}

/// Build one stage from already-loaded records and write it
pub fn run_stage(stage: Stage, records: &[SessionRecord], config: &PipelineConfig) -> Result<StageOutput> {
    let df = match stage {
        Stage::Prediction => prediction_frame(records)?,
        Stage::Pivot => pivot_frame(records)?,
        Stage::Summary => summaries_to_dataframe(&driver_summaries(records, config)?)?,
    };
    write_stage(stage, df, &stage.output_path(config))
}

/// Load the raw file and write the prediction dataset
pub fn prepare_dataset(config: &PipelineConfig) -> Result<StageOutput> {
    run_stage(Stage::Prediction, &load_raw(config)?, config)
}

/// Load the raw file and write the wide pivot
pub fn build_pivot(config: &PipelineConfig) -> Result<StageOutput> {
    run_stage(Stage::Pivot, &load_raw(config)?, config)
}

/// Load the raw file and write the driver summary
pub fn build_summary(config: &PipelineConfig) -> Result<StageOutput> {
    run_stage(Stage::Summary, &load_raw(config)?, config)
}

/// Load the raw file once and write every derived table
pub fn run_all(config: &PipelineConfig) -> Result<Vec<StageOutput>> {
    let records = load_raw(config)?;
    Stage::ALL
        .iter()
        .map(|&stage| run_stage(stage, &records, config))
        .collect()
}

/// Merge per-season raw files and write the combined raw file
pub fn combine_seasons(config: &PipelineConfig, years: &[i32]) -> Result<CombinedSeasons> {
    let combined = combine_yearly(config, years)?;
    non_empty(&combined.records, &config.raw_stem)?;
    save_records(&combined.records, config.raw_path())?;
    info!(
        "Combined {} records from {} seasons",
        combined.records.len(),
        combined.loaded.len()
    );
    Ok(combined)
}
