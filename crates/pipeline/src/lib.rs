//! Machine Energy Analysis Pipeline
//!
//! Wires ingestion, cycle segmentation, period counting, quality assessment
//! and state labeling into one report.

pub mod config;
pub mod report;

pub use config::PipelineConfig;
pub use report::{run_pipeline, EnergyReport, LabeledSample, ReportSummary, RunOptions};

use cycle_engine::EngineError;
use data_loader::{LoadError, MachineDataLoader};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use state_detector::StateError;
use std::path::Path;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Load a JSON record file and run the full pipeline over it
pub fn analyze_file(
    path: impl AsRef<Path>,
    config: &PipelineConfig,
    options: &RunOptions,
) -> Result<EnergyReport, PipelineError> {
    let loader = MachineDataLoader::new(config.loader.clone());
    let (series, load_report) = loader.load_series(path)?;
    let mut report = run_pipeline(&series, config, options)?;
    report.load = Some(load_report);
    Ok(report)
}

/// Initialize logging to stderr, filtered by `RUST_LOG` (default `info`)
pub fn init_logging(json: bool) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}

/// Install a Prometheus recorder for the engine's counters and histograms
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}
