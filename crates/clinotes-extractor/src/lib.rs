//! Clinotes Extractor
//!
//! Turns free-text clinical notes into the ten-field clinical schema using a
//! hosted LLM.
//!
//! # Architecture
//!
//! ```text
//! Notes → chunks → PromptBuilder → ModelClient → parse_response → BatchReport
//! ```
//!
//! # Key Features
//!
//! - **Prompt construction**: schema-driven instructions with worked examples
//! - **Tolerant parsing**: fenced or wrapped JSON, or `Label: value` lines
//! - **Batch processing**: chunked, optionally concurrent, order-preserving
//! - **Failure isolation**: one bad note never aborts the batch
//! - **Cancellation**: stop early and keep the results computed so far
//!
//! # Example Usage
//!
//! ```no_run
//! use clinotes_domain::ClinicalNote;
//! use clinotes_extractor::{BatchExtractor, ExtractorConfig, NoProgress};
//! use clinotes_llm::{MockProvider, ModelClient, ModelConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = MockProvider::new(r#"{"Chief_Complaint": "Chest pain"}"#);
//! let client = ModelClient::new(provider, ModelConfig::new("key", "model"));
//! let extractor = BatchExtractor::new(client, ExtractorConfig::default());
//!
//! let notes = ClinicalNote::from_texts(["CC: Chest pain since this morning."]);
//! let report = extractor
//!     .run_batch(&notes, &NoProgress, &CancellationToken::new())
//!     .await?;
//!
//! println!("Completion: {:.2}%", report.statistics.overall_percentage());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod batching;
mod config;
mod error;
mod extractor;
mod parser;
mod progress;
mod prompt;
mod types;


pub use batching::plan_chunks;
pub use config::{ExtractorConfig, DEFAULT_BATCH_SIZE};
pub use error::ExtractorError;
pub use extractor::BatchExtractor;
pub use parser::{parse_response, ParseStrategy};
pub use progress::{NoProgress, ProgressEvent, ProgressObserver};
pub use prompt::{Prompt, PromptBuilder, PromptError};
pub use types::BatchReport;
