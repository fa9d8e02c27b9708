//! Layered pipeline configuration

use crate::PipelineError;
use ::config::{Config, Environment, File};
use cycle_engine::EngineConfig;
use data_loader::LoaderConfig;
use serde::{Deserialize, Serialize};
use state_detector::{ClusteringConfig, StateThresholds};
use std::path::Path;
use tracing::debug;

/// Environment variable prefix, e.g. `ENERGY__ENGINE__MIN_RUN_LENGTH=3`
pub const ENV_PREFIX: &str = "ENERGY";

/// Configuration for every stage of the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub engine: EngineConfig,
    pub states: StateThresholds,
    pub clustering: ClusteringConfig,
    pub loader: LoaderConfig,
}

impl PipelineConfig {
    /// Built-in defaults, then `path` (TOML/JSON/YAML by extension), then
    /// `ENERGY__*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = path {
            debug!("Reading configuration from {}", path.display());
            builder = builder.add_source(File::from(path));
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check every section against its contract
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.engine.validate()?;
        self.states.validate()?;
        Ok(())
    }
}
