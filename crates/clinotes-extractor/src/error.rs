//! Error types for the Extractor

use thiserror::Error;

/// Errors that stop a batch run
///
/// Per-note problems (unreachable model, unparseable output, oversized
/// note) never surface here; they are recorded on the note's result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractorError {
    /// Missing or invalid settings; no note can be processed
    #[error("Configuration error: {0}")]
    Configuration(String),
}
