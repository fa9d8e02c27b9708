//! Machine Energy Analysis - Main Entry Point

use anyhow::Context;
use clap::Parser;
use cycle_engine::Frequency;
use pipeline::{analyze_file, init_logging, init_metrics, PipelineConfig, RunOptions};
use std::path::PathBuf;
use tracing::info;

/// Segment a machine energy log into production cycles and report on them
#[derive(Debug, Parser)]
#[command(name = "energy-pipeline", version, about)]
struct Cli {
    /// JSON array of {"timestamp", "value"} records
    input: PathBuf,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, env = "ENERGY_CONFIG")]
    config: Option<PathBuf>,

    /// Activation threshold override
    #[arg(long)]
    threshold: Option<f64>,

    /// Minimum run length override (samples)
    #[arg(long)]
    min_run_length: Option<usize>,

    /// Counting bucket width override, e.g. 1H, 30min, 1D
    #[arg(long)]
    freq: Option<Frequency>,

    /// Baseline cycle duration in seconds (median of observed cycles if omitted)
    #[arg(long)]
    expected_duration: Option<f64>,

    /// Also cluster samples into this many operating states
    #[arg(long)]
    clusters: Option<usize>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print Prometheus metrics to stderr after the run
    #[arg(long)]
    metrics: bool,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs).context("Failed to set tracing subscriber")?;
    let metrics = if cli.metrics {
        Some(init_metrics().context("Failed to install metrics recorder")?)
    } else {
        None
    };

    info!("=== Energy Pipeline v{} ===", env!("CARGO_PKG_VERSION"));

    let mut config = PipelineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(threshold) = cli.threshold {
        config.engine.activation_threshold = threshold;
    }
    if let Some(min_run_length) = cli.min_run_length {
        config.engine.min_run_length = min_run_length;
    }
    if let Some(freq) = cli.freq {
        config.engine.default_resample_width = freq;
    }
    if let Some(n_states) = cli.clusters {
        config.clustering.n_states = n_states;
    }
    config.validate()?;

    let options = RunOptions {
        expected_duration: cli.expected_duration,
        cluster_states: cli.clusters.is_some(),
    };

    let report = analyze_file(&cli.input, &config, &options)
        .with_context(|| format!("Failed to analyze {}", cli.input.display()))?;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }

    Ok(())
}
