//! Note module - immutable free-text clinical notes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a clinical note
///
/// Usually a 1-based row number, a value from an id column, or a file stem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Create an identifier from any string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for the note at a zero-based input position (rendered 1-based)
    ///
    /// # Examples
    ///
    /// ```
    /// use clinotes_domain::NoteId;
    ///
    /// assert_eq!(NoteId::from_index(0).as_str(), "1");
    /// ```
    pub fn from_index(index: usize) -> Self {
        Self((index + 1).to_string())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A free-text clinical note
///
/// Notes are immutable once ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClinicalNote {
    id: NoteId,
    text: String,
}

impl ClinicalNote {
    /// Create a note
    pub fn new(id: NoteId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    /// Build notes from plain texts, numbering them by position
    pub fn from_texts<I, S>(texts: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(idx, text)| Self::new(NoteId::from_index(idx), text))
            .collect()
    }

    /// Note identifier
    pub fn id(&self) -> &NoteId {
        &self.id
    }

    /// Raw note text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the note has no content beyond whitespace
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Length in characters (Unicode scalar values), as used for size limits
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
