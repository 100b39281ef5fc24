//! Error types for the CLI application.

use clinotes_extractor::ExtractorError;
use clinotes_llm::LlmError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model client error
    #[error("Model error: {0}")]
    Model(#[from] LlmError),

    /// Extraction error
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractorError),

    /// Input could not be loaded
    #[error("Input error: {0:#}")]
    Input(anyhow::Error),

    /// Export could not be written
    #[error("Export error: {0:#}")]
    Export(anyhow::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CliError {
    /// Suggested fix shown under the error message
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::Config(_)
            | CliError::Model(LlmError::Configuration(_))
            | CliError::Extraction(ExtractorError::Configuration(_)) => Some(
                "Check API_KEY and MODEL (environment, .env file or --api-key/--model)",
            ),
            CliError::Input(_) => Some("Pass a CSV file with a notes column or a directory of .txt files"),
            _ => None,
        }
    }
}
