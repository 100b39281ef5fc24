//! Schema module - the fixed set of clinical fields extracted from every note

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fields in the clinical schema
pub const FIELD_COUNT: usize = 10;

/// One of the ten clinical categories extracted from a note
///
/// The declaration order is the schema order: it drives prompt layout,
/// export column order and statistics ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SchemaField {
    /// Primary reason for the visit
    #[serde(rename = "Chief_Complaint")]
    ChiefComplaint,

    /// Narrative of the current illness
    #[serde(rename = "History_Present_Illness")]
    HistoryOfPresentIllness,

    /// Prior conditions, surgeries and hospitalizations
    #[serde(rename = "Past_Medical_History")]
    PastMedicalHistory,

    /// Medications currently taken
    #[serde(rename = "Current_Medications")]
    CurrentMedications,

    /// Known allergies and reactions
    #[serde(rename = "Allergies")]
    Allergies,

    /// Objective examination findings and vitals
    #[serde(rename = "Physical_Exam")]
    PhysicalExam,

    /// Symptom inventory by organ system
    #[serde(rename = "Review_of_Systems")]
    ReviewOfSystems,

    /// Laboratory values and imaging findings
    #[serde(rename = "Labs_Imaging_Results")]
    LabsImagingResults,

    /// Working or differential diagnosis
    #[serde(rename = "Assessment_Impression")]
    AssessmentImpression,

    /// Treatment, follow-up and instructions
    #[serde(rename = "Plan")]
    Plan,
}

impl SchemaField {
    /// All fields in schema order
    pub const ALL: [SchemaField; FIELD_COUNT] = [
        SchemaField::ChiefComplaint,
        SchemaField::HistoryOfPresentIllness,
        SchemaField::PastMedicalHistory,
        SchemaField::CurrentMedications,
        SchemaField::Allergies,
        SchemaField::PhysicalExam,
        SchemaField::ReviewOfSystems,
        SchemaField::LabsImagingResults,
        SchemaField::AssessmentImpression,
        SchemaField::Plan,
    ];

    /// Position of this field in schema order
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical key used in model output and exports (e.g. `Chief_Complaint`)
    pub fn key(self) -> &'static str {
        CLINICAL_SCHEMA.definition(self).key
    }

    /// Human-readable label (e.g. `Chief Complaint`)
    pub fn label(self) -> &'static str {
        CLINICAL_SCHEMA.definition(self).label
    }
}

impl fmt::Display for SchemaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Static description of a single schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    /// The field this definition describes
    pub field: SchemaField,

    /// Canonical key
    pub key: &'static str,

    /// Display label
    pub label: &'static str,

    /// What the model should put in this field
    pub description: &'static str,

    /// Additional label spellings accepted when parsing, already normalized
    /// (lowercase ASCII alphanumerics only)
    pub aliases: &'static [&'static str],
}

impl FieldDefinition {
    /// Check whether an already-normalized label names this field
    fn accepts(&self, normalized: &str) -> bool {
        normalize_label(self.key) == normalized
            || normalize_label(self.label) == normalized
            || self.aliases.contains(&normalized)
    }
}

/// The ordered set of fields extracted from every note
///
/// The schema is static and defined once; use [`FieldSchema::clinical`].
#[derive(Debug, PartialEq, Eq)]
pub struct FieldSchema {
    definitions: [FieldDefinition; FIELD_COUNT],
}

static CLINICAL_SCHEMA: FieldSchema = FieldSchema {
    definitions: [
        FieldDefinition {
            field: SchemaField::ChiefComplaint,
            key: "Chief_Complaint",
            label: "Chief Complaint",
            description: "The primary reason for the visit, ideally in the patient's own words \
                (e.g. \"Chest pain\", \"Headache for 3 days\").",
            aliases: &["cc", "complaint", "presentingcomplaint", "reasonforvisit"],
        },
        FieldDefinition {
            field: SchemaField::HistoryOfPresentIllness,
            key: "History_Present_Illness",
            label: "History of Present Illness",
            description: "Narrative of the current illness: onset, location, duration, character, \
                aggravating/alleviating factors, radiation, severity.",
            aliases: &[
                "hpi",
                "historyofpresentillness",
                "historyofpresentingillness",
                "presentillness",
            ],
        },
        FieldDefinition {
            field: SchemaField::PastMedicalHistory,
            key: "Past_Medical_History",
            label: "Past Medical History",
            description: "Prior diagnoses, surgeries, hospitalizations and chronic conditions, \
                separated by semicolons.",
            aliases: &["pmh", "pmhx", "medicalhistory", "pasthistory"],
        },
        FieldDefinition {
            field: SchemaField::CurrentMedications,
            key: "Current_Medications",
            label: "Current Medications",
            description: "Medications currently taken with dose, route and frequency as written, \
                separated by semicolons.",
            aliases: &["medications", "meds", "currentmeds", "medicationlist"],
        },
        FieldDefinition {
            field: SchemaField::Allergies,
            key: "Allergies",
            label: "Allergies",
            description: "Known drug, food or environmental allergies with reactions \
                (e.g. \"Penicillin - Anaphylaxis; NKDA\").",
            aliases: &["allergy", "drugallergies"],
        },
        FieldDefinition {
            field: SchemaField::PhysicalExam,
            key: "Physical_Exam",
            label: "Physical Exam",
            description: "Vital signs and objective examination findings, grouped by body system.",
            aliases: &["pe", "exam", "examination", "physicalexamination"],
        },
        FieldDefinition {
            field: SchemaField::ReviewOfSystems,
            key: "Review_of_Systems",
            label: "Review of Systems",
            description: "Positive and pertinent negative symptoms by organ system.",
            aliases: &["ros"],
        },
        FieldDefinition {
            field: SchemaField::LabsImagingResults,
            key: "Labs_Imaging_Results",
            label: "Labs/Imaging Results",
            description: "Laboratory values, imaging findings and other diagnostic results with \
                interpretation, separated by semicolons.",
            aliases: &[
                "labs",
                "labsimaging",
                "labsandimaging",
                "labresults",
                "imaging",
                "diagnostics",
            ],
        },
        FieldDefinition {
            field: SchemaField::AssessmentImpression,
            key: "Assessment_Impression",
            label: "Assessment/Impression",
            description: "Working diagnosis first, then differential diagnoses, separated by \
                semicolons.",
            aliases: &[
                "assessment",
                "impression",
                "assessmentandimpression",
                "diagnosis",
            ],
        },
        FieldDefinition {
            field: SchemaField::Plan,
            key: "Plan",
            label: "Plan",
            description: "Treatment, orders, consultations, follow-up and patient instructions, \
                separated by semicolons.",
            aliases: &["treatmentplan", "planofcare", "disposition"],
        },
    ],
};

impl FieldSchema {
    /// The clinical note schema
    ///
    /// # Examples
    ///
    /// ```
    /// use clinotes_domain::{FieldSchema, SchemaField};
    ///
    /// let schema = FieldSchema::clinical();
    /// assert_eq!(schema.len(), 10);
    /// assert_eq!(schema.match_label("HPI"), Some(SchemaField::HistoryOfPresentIllness));
    /// ```
    pub fn clinical() -> &'static FieldSchema {
        &CLINICAL_SCHEMA
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Always false; the schema is never empty
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Field definitions in schema order
    pub fn definitions(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.definitions.iter()
    }

    /// Definition of a single field
    pub fn definition(&self, field: SchemaField) -> &FieldDefinition {
        &self.definitions[field.index()]
    }

    /// Canonical keys in schema order
    pub fn keys(&self) -> Vec<&'static str> {
        self.definitions.iter().map(|d| d.key).collect()
    }

    /// Resolve a label as written by a model to a schema field
    ///
    /// Matching ignores case, whitespace, punctuation and a trailing
    /// parenthetical, so `"chief complaint"`, `"Chief_Complaint"` and
    /// `"CC (Chief Complaint)"` all resolve to [`SchemaField::ChiefComplaint`].
    pub fn match_label(&self, label: &str) -> Option<SchemaField> {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            return None;
        }
        self.definitions
            .iter()
            .find(|d| d.accepts(&normalized))
            .map(|d| d.field)
    }
}

/// Normalize a field label for tolerant comparison
///
/// Drops anything from the first `(`, then keeps only ASCII alphanumerics,
/// lowercased.
pub fn normalize_label(label: &str) -> String {
    let head = label.split('(').next().unwrap_or(label);
    head.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
