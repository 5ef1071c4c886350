//! Layered configuration loading.

use crate::ObservabilityConfig;
use config::{Config, File, FileFormat};
use fabula_error::{ConfigError, FabulaError, FabulaResult};
use fabula_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../fabula.toml");

/// Complete Fabula configuration.
///
/// The pipeline sections (`[generation]`, `[retry]`, `[validation]` and
/// `[pipeline]`) sit at the top level next to `[observability]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabulaConfig {
    /// Pipeline sections
    #[serde(flatten)]
    pipeline: PipelineConfig,
    /// Logging setup
    observability: ObservabilityConfig,
}

impl FabulaConfig {
    /// The pipeline sections.
    pub fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    /// The logging setup.
    pub fn observability(&self) -> &ObservabilityConfig {
        &self.observability
    }

    /// Load configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> FabulaResult<Self> {
        debug!("Loading configuration from file");

        Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                FabulaError::from(ConfigError::unreadable(path.as_ref().display().to_string(), e))
            })?
            .try_deserialize()
            .map_err(|e| FabulaError::from(ConfigError::malformed(e)))
    }

    /// Load configuration from TOML text layered over the bundled defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed.
    pub fn from_toml_str(text: &str) -> FabulaResult<Self> {
        Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()
            .map_err(|e| FabulaError::from(ConfigError::unreadable("layered configuration", e)))?
            .try_deserialize()
            .map_err(|e| FabulaError::from(ConfigError::malformed(e)))
    }

    /// Load configuration with precedence: user override > bundled default.
    ///
    /// Configuration sources in order of precedence (later sources override earlier):
    /// 1. Bundled defaults (fabula.toml shipped with the library)
    /// 2. User config in home directory (~/.config/fabula/fabula.toml)
    /// 3. User config in current directory (./fabula.toml)
    ///
    /// User config files are optional and skipped if not found.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fabula::FabulaConfig;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = FabulaConfig::load()?;
    /// println!("{} retries", config.pipeline().retry().clone().into_policy()?.max_retries());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument]
    pub fn load() -> FabulaResult<Self> {
        debug!("Loading configuration with precedence: current dir > home dir > bundled defaults");

        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/fabula/fabula.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("fabula").required(false));

        builder
            .build()
            .map_err(|e| FabulaError::from(ConfigError::unreadable("layered configuration", e)))?
            .try_deserialize()
            .map_err(|e| FabulaError::from(ConfigError::malformed(e)))
    }
}
