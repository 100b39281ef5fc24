//! Configuration for the batch extractor

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of notes per chunk
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Configuration for the batch extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Longest accepted note (characters); longer notes fail with `input_too_large`
    pub max_note_chars: usize,

    /// Notes per chunk; chunks pace the run and drive progress reporting
    pub batch_size: usize,

    /// Model calls in flight at once within a chunk
    pub max_concurrency: usize,

    /// Pause between chunks (milliseconds)
    pub chunk_delay_ms: u64,
}

impl ExtractorConfig {
    /// Pause between chunks as a Duration
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_note_chars == 0 {
            return Err("max_note_chars must be greater than 0".to_string());
        }
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".to_string());
        }
        if self.max_concurrency > self.batch_size {
            return Err("max_concurrency cannot exceed batch_size".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Sequential processing with a short pause between chunks
    fn default() -> Self {
        Self {
            max_note_chars: 50_000,
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: 1,
            chunk_delay_ms: 500,
        }
    }
}

impl ExtractorConfig {
    /// Aggressive preset: larger chunks, parallel calls, no pause
    pub fn aggressive() -> Self {
        Self {
            max_note_chars: 20_000,
            batch_size: 10,
            max_concurrency: 4,
            chunk_delay_ms: 0,
        }
    }

    /// Lenient preset: long notes allowed, gentle on provider rate limits
    pub fn lenient() -> Self {
        Self {
            max_note_chars: 100_000,
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: 1,
            chunk_delay_ms: 2_000,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExtractorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.chunk_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_aggressive_config_is_valid() {
        assert!(ExtractorConfig::aggressive().validate().is_ok());
    }

    #[test]
    fn test_lenient_config_is_valid() {
        assert!(ExtractorConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_invalid_batch_size() {
        let config = ExtractorConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_max_note_chars() {
        let config = ExtractorConfig {
            max_note_chars: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_concurrency_bounded_by_batch_size() {
        let config = ExtractorConfig {
            batch_size: 2,
            max_concurrency: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ExtractorConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let parsed: ExtractorConfig = serde_json::from_str(r#"{"batch_size": 8}"#).unwrap();
        assert_eq!(parsed.batch_size, 8);
        assert_eq!(parsed.max_concurrency, 1);
        assert_eq!(parsed.max_note_chars, ExtractorConfig::default().max_note_chars);
    }
}
