//! trackfeat CLI
//!
//! Batch feature pipeline: raw collar fixes to quantized feature tables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use trackfeat::{
    config::PipelineConfig,
    ingest, output, pipeline,
    quantize::quantize_table,
    report::RunReport,
    selection::{filter_artifacts, select_features},
    VERSION,
};

/// Output file names within the destination directory.
const ENRICHED_FILE: &str = "raw_enriched.csv";
const FEATURES_FILE: &str = "features.csv";
const CLEANED_FILE: &str = "features_cleaned.csv";
const QUANTIZED_FILE: &str = "features_quantized.csv";
const SCALES_FILE: &str = "quantization_scales.csv";
const REPORT_FILE: &str = "run_report.json";

#[derive(Parser)]
#[command(name = "trackfeat")]
#[command(version = VERSION)]
#[command(about = "GPS collar feature engineering and fixed-point quantization", long_about = None)]
struct Cli {
    /// Path to a pipeline configuration file (defaults to the standard
    /// config location, then to built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: features, selection, quantization
    Run {
        /// Raw fix table (CSV with timestamp, location-lat, location-long)
        #[arg(long, short)]
        input: PathBuf,

        /// Directory for all output tables
        #[arg(long, short)]
        out_dir: PathBuf,
    },

    /// Compute the enriched point table and the windowed feature table
    Features {
        /// Raw fix table
        #[arg(long, short)]
        input: PathBuf,

        /// Directory for output tables
        #[arg(long, short)]
        out_dir: PathBuf,
    },

    /// Select the classifier feature subset and drop artifact rows
    Select {
        /// Feature table produced by `features`
        #[arg(long, short)]
        input: PathBuf,

        /// Directory for the cleaned table
        #[arg(long, short)]
        out_dir: PathBuf,
    },

    /// Quantize a cleaned feature table to the u32 domain
    Quantize {
        /// Cleaned table produced by `select`
        #[arg(long, short)]
        input: PathBuf,

        /// Directory for the quantized table and scale table
        #[arg(long, short)]
        out_dir: PathBuf,
    },

    /// Show the effective configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { input, out_dir } => cmd_run(&config, &input, &out_dir),
        Commands::Features { input, out_dir } => cmd_features(&config, &input, &out_dir),
        Commands::Select { input, out_dir } => cmd_select(&config, &input, &out_dir),
        Commands::Quantize { input, out_dir } => cmd_quantize(&input, &out_dir),
        Commands::Config => cmd_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(p) => PipelineConfig::load_from(p)
            .with_context(|| format!("loading config from {}", p.display()))?,
        None => PipelineConfig::load().context("loading config")?,
    };
    config.validate().context("validating config")?;
    Ok(config)
}

fn cmd_run(config: &PipelineConfig, input: &Path, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let tz = config.tz()?;
    let mut report = RunReport::new(input, config);

    let fixes = ingest::read_fixes(input).context("reading raw fixes")?;
    report.points_read = fixes.len();

    let points = pipeline::enrich_trajectory(&fixes, config, tz).context("enriching trajectory")?;
    report.points_after_filter = points.len();
    report.points_outside = points.iter().filter(|p| p.is_outside).count();
    output::write_enriched(&out_dir.join(ENRICHED_FILE), &points)
        .context("writing enriched table")?;

    let features = pipeline::build_feature_table(&points, config, tz);
    report.bins_produced = features.len();
    output::write_features(&out_dir.join(FEATURES_FILE), &features)
        .context("writing feature table")?;

    let selected = select_features(&features);
    let (cleaned, artifacts) = filter_artifacts(&selected, config);
    report.artifacts = Some(artifacts);
    report.rows_cleaned = cleaned.len();
    output::write_selected(&out_dir.join(CLEANED_FILE), &cleaned)
        .context("writing cleaned table")?;

    let (quantized, scales) = quantize_table(&cleaned);
    report.columns_quantized = scales.len();
    output::write_quantized_pair(
        &out_dir.join(QUANTIZED_FILE),
        &out_dir.join(SCALES_FILE),
        &quantized,
        &scales,
    )
    .context("writing quantized table pair")?;

    report.finish();
    report
        .save(&out_dir.join(REPORT_FILE))
        .context("writing run report")?;

    println!("{}", report.summary());
    println!("Outputs written to {}", out_dir.display());
    Ok(())
}

fn cmd_features(config: &PipelineConfig, input: &Path, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
    let tz = config.tz()?;

    let fixes = ingest::read_fixes(input).context("reading raw fixes")?;
    let points = pipeline::enrich_trajectory(&fixes, config, tz).context("enriching trajectory")?;
    output::write_enriched(&out_dir.join(ENRICHED_FILE), &points)
        .context("writing enriched table")?;

    let features = pipeline::build_feature_table(&points, config, tz);
    output::write_features(&out_dir.join(FEATURES_FILE), &features)
        .context("writing feature table")?;

    println!(
        "Wrote {} enriched points and {} feature rows to {}",
        points.len(),
        features.len(),
        out_dir.display()
    );
    Ok(())
}

fn cmd_select(config: &PipelineConfig, input: &Path, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let features = output::read_features(input).context("reading feature table")?;
    let selected = select_features(&features);
    let (cleaned, artifacts) = filter_artifacts(&selected, config);
    output::write_selected(&out_dir.join(CLEANED_FILE), &cleaned)
        .context("writing cleaned table")?;

    println!(
        "Kept {} of {} rows ({} artifact rows removed, {} with positive labels)",
        cleaned.len(),
        artifacts.original_rows,
        artifacts.removed_rows,
        artifacts.removed_positive_labels
    );
    Ok(())
}

fn cmd_quantize(input: &Path, out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;

    let cleaned = output::read_selected(input).context("reading cleaned table")?;
    let (quantized, scales) = quantize_table(&cleaned);
    output::write_quantized_pair(
        &out_dir.join(QUANTIZED_FILE),
        &out_dir.join(SCALES_FILE),
        &quantized,
        &scales,
    )
    .context("writing quantized table pair")?;

    println!(
        "Quantized {} rows across {} columns; scale table alongside",
        quantized.len(),
        scales.len()
    );
    Ok(())
}

fn cmd_config(config: &PipelineConfig) -> Result<()> {
    println!("Config file: {}", PipelineConfig::config_path().display());
    println!(
        "{}",
        serde_json::to_string_pretty(config).context("serializing config")?
    );
    Ok(())
}
