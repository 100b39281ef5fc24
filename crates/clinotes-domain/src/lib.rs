//! Clinotes Domain Layer
//!
//! This crate contains the core data model for turning free-text clinical notes
//! into structured records. It performs no I/O and defines the fundamental
//! concepts that every other layer depends upon.
//!
//! ## Key Concepts
//!
//! - **Field schema**: the fixed, ordered set of ten clinical fields
//! - **Clinical note**: an immutable free-text note with a stable identifier
//! - **Field value**: either extracted text or the missing-marker
//! - **Extraction result**: exactly one value per schema field, plus a status
//! - **Completion statistics**: how often each field was populated in a batch
//!
//! ## Architecture
//!
//! - Only `serde` derives, no runtime dependencies
//! - Pure value types, no network or filesystem access
//! - Provider and pipeline implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod note;
pub mod record;
pub mod schema;
pub mod stats;

// Re-exports for convenience
pub use note::{ClinicalNote, NoteId};
pub use record::{ExtractionResult, ExtractionStatus, FailureKind, FieldValue, FieldValues};
pub use schema::{FieldDefinition, FieldSchema, SchemaField, FIELD_COUNT};
pub use stats::{CompletionStats, FieldCompletion};
