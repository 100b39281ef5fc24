//! Record module - per-note extraction results

use crate::note::NoteId;
use crate::schema::{SchemaField, FIELD_COUNT};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Value of a single schema field
///
/// `Missing` is the missing-marker: the note does not contain this
/// information. A present value is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum FieldValue {
    /// Field not present in the note
    #[default]
    Missing,

    /// Extracted text, trimmed and non-empty
    Present(String),
}

impl FieldValue {
    /// How the missing-marker is rendered in exports (an empty cell)
    pub const MISSING_PLACEHOLDER: &'static str = "";

    /// Normalize raw text into a field value
    ///
    /// Trims surrounding whitespace. Empty text and the placeholder `N/A`
    /// become [`FieldValue::Missing`].
    ///
    /// # Examples
    ///
    /// ```
    /// use clinotes_domain::FieldValue;
    ///
    /// assert_eq!(FieldValue::from_raw("  chest pain "), FieldValue::Present("chest pain".into()));
    /// assert_eq!(FieldValue::from_raw("   "), FieldValue::Missing);
    /// assert_eq!(FieldValue::from_raw("n/a"), FieldValue::Missing);
    /// ```
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
            FieldValue::Missing
        } else {
            FieldValue::Present(trimmed.to_string())
        }
    }

    /// Whether this is the missing-marker
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Extracted text, if present
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Present(text) => Some(text),
            FieldValue::Missing => None,
        }
    }

    /// Text written to an export cell
    pub fn export_cell(&self) -> &str {
        self.as_str().unwrap_or(Self::MISSING_PLACEHOLDER)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(text) => FieldValue::from_raw(&text),
            None => FieldValue::Missing,
        }
    }
}

impl From<FieldValue> for Option<String> {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Present(text) => Some(text),
            FieldValue::Missing => None,
        }
    }
}

/// Exactly one value per schema field
///
/// Backed by a fixed-size array indexed by [`SchemaField`], so a set of
/// values can never gain or lose a field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldValues {
    values: [FieldValue; FIELD_COUNT],
}

impl FieldValues {
    /// All fields set to the missing-marker
    pub fn all_missing() -> Self {
        Self::default()
    }

    /// Value of a field
    pub fn get(&self, field: SchemaField) -> &FieldValue {
        &self.values[field.index()]
    }

    /// Set the value of a field
    pub fn set(&mut self, field: SchemaField, value: FieldValue) {
        self.values[field.index()] = value;
    }

    /// Builder-style [`FieldValues::set`] from raw text
    pub fn with(mut self, field: SchemaField, raw: &str) -> Self {
        self.set(field, FieldValue::from_raw(raw));
        self
    }

    /// Fields and values in schema order
    pub fn iter(&self) -> impl Iterator<Item = (SchemaField, &FieldValue)> {
        SchemaField::ALL.into_iter().zip(self.values.iter())
    }

    /// Number of fields holding a value
    pub fn populated_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_missing()).count()
    }

    /// Whether every field is the missing-marker
    pub fn is_all_missing(&self) -> bool {
        self.populated_count() == 0
    }
}

impl Serialize for FieldValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FIELD_COUNT))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.key(), value)?;
        }
        map.end()
    }
}

/// Why a note's extraction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The remote model could not be reached after exhausting retries
    ExtractionUnavailable,

    /// The model answered but its output could not be mapped to the schema
    ParseFailure,

    /// The note exceeds the configured length limit
    InputTooLarge,
}

impl FailureKind {
    /// Stable identifier used in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::ExtractionUnavailable => "extraction_unavailable",
            FailureKind::ParseFailure => "parse_failure",
            FailureKind::InputTooLarge => "input_too_large",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of extracting a single note
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Fields were extracted (possibly all missing)
    Succeeded,

    /// Extraction failed; every field is the missing-marker
    Failed {
        /// Failure category
        kind: FailureKind,
        /// Human-readable reason
        detail: String,
    },
}

/// Structured fields extracted from one clinical note
///
/// Results are never mutated after creation. A failed extraction is
/// replaced wholesale by a new result, not patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    note_id: NoteId,
    fields: FieldValues,
    status: ExtractionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_response: Option<String>,
}

impl ExtractionResult {
    /// A successful extraction
    pub fn succeeded(note_id: NoteId, fields: FieldValues, raw_response: Option<String>) -> Self {
        Self {
            note_id,
            fields,
            status: ExtractionStatus::Succeeded,
            raw_response,
        }
    }

    /// A successful extraction where the note held no information
    pub fn empty(note_id: NoteId) -> Self {
        Self::succeeded(note_id, FieldValues::all_missing(), None)
    }

    /// A failed extraction with every field missing
    pub fn failed(
        note_id: NoteId,
        kind: FailureKind,
        detail: impl Into<String>,
        raw_response: Option<String>,
    ) -> Self {
        Self {
            note_id,
            fields: FieldValues::all_missing(),
            status: ExtractionStatus::Failed {
                kind,
                detail: detail.into(),
            },
            raw_response,
        }
    }

    /// Source note identifier
    pub fn note_id(&self) -> &NoteId {
        &self.note_id
    }

    /// Extracted values
    pub fn fields(&self) -> &FieldValues {
        &self.fields
    }

    /// Value of a single field
    pub fn value(&self, field: SchemaField) -> &FieldValue {
        self.fields.get(field)
    }

    /// Extraction outcome
    pub fn status(&self) -> &ExtractionStatus {
        &self.status
    }

    /// Whether extraction succeeded
    pub fn is_success(&self) -> bool {
        matches!(self.status, ExtractionStatus::Succeeded)
    }

    /// Failure category, if failed
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.status {
            ExtractionStatus::Failed { kind, .. } => Some(*kind),
            ExtractionStatus::Succeeded => None,
        }
    }

    /// Failure reason, if failed
    pub fn failure_detail(&self) -> Option<&str> {
        match &self.status {
            ExtractionStatus::Failed { detail, .. } => Some(detail),
            ExtractionStatus::Succeeded => None,
        }
    }

    /// Raw model output kept for diagnostics
    pub fn raw_response(&self) -> Option<&str> {
        self.raw_response.as_deref()
    }
}
