//! Configuration management for the CLI.
//!
//! Settings resolve in this order: command-line flags and environment
//! variables (including a `.env` file), then the config file, then built-in
//! defaults.

use crate::cli::ExtractArgs;
use crate::error::{CliError, Result};
use clinotes_extractor::ExtractorConfig;
use clinotes_llm::fireworks::DEFAULT_BASE_URL;
use clinotes_llm::ModelConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model defaults
    #[serde(default)]
    pub model: ModelSettings,

    /// Batch extractor limits
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Model defaults used when no flag or environment variable is given.
///
/// The API key is deliberately absent: it only comes from the environment
/// or the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Model identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    /// Base URL of the chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// Retries per note after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Timeout for one model call (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".clinotes").join("config.toml"))
    }

    /// Load configuration from `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Build the model client settings for an extract run.
    pub fn model_config(&self, args: &ExtractArgs) -> Result<ModelConfig> {
        let api_key = args
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CliError::Config("API_KEY is not set".into()))?;

        let model_id = args
            .model
            .clone()
            .or_else(|| self.model.model_id.clone())
            .filter(|model| !model.trim().is_empty())
            .ok_or_else(|| CliError::Config("MODEL is not set; `clinotes models` lists known models".into()))?;

        let timeout_secs = args.timeout_secs.unwrap_or(self.model.timeout_secs);
        let config = ModelConfig::new(api_key, model_id)
            .with_base_url(args.base_url.clone().unwrap_or_else(|| self.model.base_url.clone()))
            .with_temperature(args.temperature.unwrap_or(self.model.temperature))
            .with_timeout(Duration::from_secs(timeout_secs))
            .with_max_retries(args.max_retries.unwrap_or(self.model.max_retries));

        config.validate()?;
        Ok(config)
    }

    /// Build the extractor limits for an extract run.
    pub fn extractor_config(&self, args: &ExtractArgs) -> Result<ExtractorConfig> {
        let mut config = args
            .preset
            .map(ExtractorConfig::from)
            .unwrap_or_else(|| self.extractor.clone());

        if let Some(batch_size) = args.batch_size {
            config.batch_size = batch_size;
        }
        match args.max_concurrency {
            Some(max_concurrency) => config.max_concurrency = max_concurrency,
            // An inherited limit follows a smaller batch size down
            None => config.max_concurrency = config.max_concurrency.min(config.batch_size),
        }

        config.validate().map_err(CliError::Config)?;
        Ok(config)
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_id: None,
            base_url: default_base_url(),
            temperature: 0.0,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_retries() -> u32 {
    clinotes_llm::config::DEFAULT_MAX_RETRIES
}

fn default_timeout_secs() -> u64 {
    clinotes_llm::config::DEFAULT_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}
