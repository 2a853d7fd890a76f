//! F1 Features CLI - collect sessions and build derived tables

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use f1_features::collector::{collect_event, SessionOutcome};
use f1_features::config::{PipelineConfig, DEFAULT_DATA_DIR};
use f1_features::data::{save_records, JsonSessionLoader};
use f1_features::pipeline::{
    combine_seasons, driver_summaries, load_raw, prediction_rows, run_all, run_stage, Stage,
    StageOutput,
};
use f1_features::PipelineError;

/// Default directory of exported session JSON files
const DEFAULT_SESSIONS_DIR: &str = "sessions";

#[derive(Parser)]
#[command(name = "f1-features")]
#[command(author, version, about = "F1 race outcome feature pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory for raw and derived CSV files
    #[arg(long, env = "F1_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Directory of exported sessions ({year}/{Event_Name}/{Session}.json)
    #[arg(long, env = "F1_SESSIONS_DIR", default_value = DEFAULT_SESSIONS_DIR)]
    sessions_dir: PathBuf,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract session records for one season
    Collect {
        /// Season year
        #[arg(short, long)]
        year: i32,

        /// Event names; defaults to every exported event of the season
        #[arg(short, long)]
        event: Vec<String>,
    },

    /// Merge per-season raw files into the combined raw file
    Combine {
        /// Seasons to merge (comma separated)
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,
    },

    /// Build the prediction dataset
    Prepare,

    /// Build the wide per-driver pivot
    Pivot,

    /// Build per-driver season summaries
    Summary {
        /// Number of drivers to print
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Build every derived table
    All,
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(message.to_string());
    pb
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    println!("{}", "F1 Features CLI v0.3.0".cyan().bold());
    println!();

    let config = PipelineConfig::with_data_dir(&cli.data_dir);

    match cli.command {
        Commands::Collect { year, event } => {
            collect_season(&config, &cli.sessions_dir, year, event)?;
        }
        Commands::Combine { years } => {
            combine(&config, years)?;
        }
        Commands::Prepare => {
            prepare(&config)?;
        }
        Commands::Pivot => {
            let output = build_stage(&config, Stage::Pivot)?;
            print_output(&output);
        }
        Commands::Summary { top } => {
            summary(&config, top)?;
        }
        Commands::All => {
            build_all(&config)?;
        }
    }

    Ok(())
}

fn collect_season(
    config: &PipelineConfig,
    sessions_dir: &Path,
    year: i32,
    events: Vec<String>,
) -> Result<()> {
    let loader = JsonSessionLoader::new(sessions_dir);
    let events = if events.is_empty() {
        loader.list_events(year)
    } else {
        events
    };

    if events.is_empty() {
        anyhow::bail!("No exported events for {} under {:?}", year, sessions_dir);
    }

    println!(
        "{} {} ({} events)",
        "Collecting season".green(),
        year,
        events.len()
    );
    println!();

    let pb = ProgressBar::new(events.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut records = Vec::new();
    let mut failed = 0;

    for event in &events {
        pb.set_message(event.clone());
        let collected = collect_event(&loader, year, event);

        for (session, outcome) in &collected.outcomes {
            if let SessionOutcome::Failed(message) = outcome {
                failed += 1;
                pb.println(format!("{} {} {}: {}", "Warning".yellow(), event, session, message));
            }
        }

        records.extend(collected.records);
        pb.inc(1);
    }

    pb.finish_and_clear();

    if records.is_empty() {
        anyhow::bail!("No records collected for {}", year);
    }

    let path = config.yearly_raw_path(year);
    save_records(&records, &path)
        .with_context(|| format!("Failed to write raw records to {:?}", path))?;

    println!("Saved {} records to {:?}", records.len(), path);
    if failed > 0 {
        println!("{}", format!("{} sessions failed to load", failed).yellow());
    }

    Ok(())
}

fn combine(config: &PipelineConfig, years: Vec<i32>) -> Result<()> {
    let years = if years.is_empty() {
        config.years.clone()
    } else {
        years
    };

    println!("{} {:?}", "Combining seasons".green(), years);
    println!();

    let combined = combine_seasons(config, &years)
        .with_context(|| format!("Failed to combine seasons {:?}", years))?;

    for year in &combined.missing {
        println!("{}", format!("No data for {}", year).yellow());
    }

    println!("{}", "Records by year:".yellow().bold());
    for (year, count) in combined.counts_by_year() {
        println!("{:>8} {:>8}", year, count);
    }

    println!("\n{}", "Records by session:".yellow().bold());
    for (session, count) in combined.counts_by_session() {
        println!("{:>8} {:>8}", session.code(), count);
    }

    println!();
    println!(
        "Saved {} records to {:?}",
        combined.records.len(),
        config.raw_path()
    );

    Ok(())
}

fn load_with_spinner(config: &PipelineConfig) -> Result<Vec<f1_features::SessionRecord>> {
    let pb = spinner("Loading raw session records...");
    let records = load_raw(config);
    pb.finish_and_clear();

    match records {
        Err(PipelineError::NoRecords { source_name }) => {
            anyhow::bail!("No session records in {}; run collect and combine first", source_name)
        }
        other => other.with_context(|| format!("Failed to load {:?}", config.raw_path())),
    }
}

fn build_stage(config: &PipelineConfig, stage: Stage) -> Result<StageOutput> {
    let records = load_with_spinner(config)?;
    run_stage(stage, &records, config).with_context(|| format!("Failed to build {}", stage.label()))
}

fn print_output(output: &StageOutput) {
    println!(
        "{} {}: {} rows x {} columns -> {:?}",
        "Saved".green(),
        output.stage.label(),
        output.rows,
        output.columns,
        output.path
    );
}

fn prepare(config: &PipelineConfig) -> Result<()> {
    let records = load_with_spinner(config)?;
    let rows = prediction_rows(&records).context("Failed to build prediction rows")?;

    let with_quali = rows.iter().filter(|r| r.quali_position.is_some()).count();
    let with_practice = rows
        .iter()
        .filter(|r| r.engineered.fp_best_lap.is_some())
        .count();
    let with_history = rows
        .iter()
        .filter(|r| r.historical.driver_avg_position_last5.is_some())
        .count();

    println!("{}", "Prediction dataset:".yellow().bold());
    println!("Race entries:         {}", rows.len());
    println!("With qualifying:      {}", with_quali);
    println!("With practice laps:   {}", with_practice);
    println!("With prior races:     {}", with_history);
    println!();

    let output = run_stage(Stage::Prediction, &records, config)
        .context("Failed to write prediction dataset")?;
    print_output(&output);

    Ok(())
}

fn summary(config: &PipelineConfig, top: usize) -> Result<()> {
    let records = load_with_spinner(config)?;
    let mut summaries = driver_summaries(&records, config).context("Failed to summarize drivers")?;

    let output = run_stage(Stage::Summary, &records, config)
        .context("Failed to write driver summary")?;

    summaries.sort_by(|a, b| {
        let points = |s: &f1_features::DriverSummary| s.race.as_ref().map_or(0.0, |r| r.total_points);
        points(b)
            .partial_cmp(&points(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    println!("{}", "Top drivers by points:".yellow().bold());
    println!(
        "{:<6} {:<24} {:>6} {:>8} {:>5} {:>8} {:>5} {:>6}",
        "Driver", "Team", "Races", "Points", "Wins", "Podiums", "DNFs", "Poles"
    );
    println!("{}", "-".repeat(76));

    for s in summaries.iter().take(top) {
        let (races, points, wins, podiums, dnfs) = s
            .race
            .as_ref()
            .map_or((0, 0.0, 0, 0, 0), |r| {
                (r.total_races, r.total_points, r.wins, r.podiums, r.dnfs)
            });
        let poles = s.quali.as_ref().map_or(0, |q| q.pole_positions);

        println!(
            "{:<6} {:<24} {:>6} {:>8.1} {:>5} {:>8} {:>5} {:>6}",
            s.key.driver, s.key.team, races, points, wins, podiums, dnfs, poles
        );
    }

    println!();
    print_output(&output);

    Ok(())
}

fn build_all(config: &PipelineConfig) -> Result<()> {
    let pb = spinner("Building derived tables...");
    let outputs = run_all(config);
    pb.finish_and_clear();

    let outputs = match outputs {
        Err(PipelineError::NoRecords { source_name }) => {
            anyhow::bail!("No session records in {}; run collect and combine first", source_name)
        }
        other => other.context("Failed to build derived tables")?,
    };

    for output in &outputs {
        print_output(output);
    }

    Ok(())
}
