//! Completion statistics over a batch of extraction results

use crate::record::{ExtractionResult, FailureKind};
use crate::schema::SchemaField;
use serde::Serialize;
use std::collections::BTreeMap;

/// How often a single field was populated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCompletion {
    /// The field
    pub field: SchemaField,

    /// Number of processed notes with a value for this field
    pub populated: usize,

    /// `populated / processed`, in `[0.0, 1.0]`
    pub rate: f64,
}

impl FieldCompletion {
    /// Rate as a percentage
    pub fn percentage(&self) -> f64 {
        self.rate * 100.0
    }
}

/// Aggregate counts and completion rates for a batch
///
/// Every rate uses the number of processed notes (failed ones included) as
/// its denominator, so failed rows lower completion. With zero processed
/// notes all rates are `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionStats {
    /// Notes that produced a result
    pub processed: usize,

    /// Results with a successful status
    pub succeeded: usize,

    /// Results with a failed status
    pub failures: usize,

    /// Failed results grouped by category
    pub failures_by_kind: BTreeMap<FailureKind, usize>,

    /// One entry per schema field, in schema order
    pub per_field: Vec<FieldCompletion>,

    /// Arithmetic mean of the per-field rates
    pub overall_rate: f64,
}

impl CompletionStats {
    /// Compute statistics over a set of results
    ///
    /// # Examples
    ///
    /// ```
    /// use clinotes_domain::{CompletionStats, ExtractionResult, FieldValues, NoteId, SchemaField};
    ///
    /// let results = vec![
    ///     ExtractionResult::succeeded(
    ///         NoteId::new("1"),
    ///         FieldValues::all_missing().with(SchemaField::Plan, "admit"),
    ///         None,
    ///     ),
    ///     ExtractionResult::empty(NoteId::new("2")),
    /// ];
    /// let stats = CompletionStats::from_results(&results);
    /// assert_eq!(stats.field(SchemaField::Plan).rate, 0.5);
    /// assert!((stats.overall_rate - 0.05).abs() < 1e-9);
    /// ```
    pub fn from_results(results: &[ExtractionResult]) -> Self {
        let processed = results.len();

        let mut failures_by_kind = BTreeMap::new();
        for kind in results.iter().filter_map(|r| r.failure_kind()) {
            *failures_by_kind.entry(kind).or_insert(0) += 1;
        }
        let failures: usize = failures_by_kind.values().sum();

        let per_field: Vec<FieldCompletion> = SchemaField::ALL
            .into_iter()
            .map(|field| {
                let populated = results
                    .iter()
                    .filter(|r| !r.value(field).is_missing())
                    .count();
                FieldCompletion {
                    field,
                    populated,
                    rate: ratio(populated, processed),
                }
            })
            .collect();

        let overall_rate = if per_field.is_empty() {
            0.0
        } else {
            per_field.iter().map(|f| f.rate).sum::<f64>() / per_field.len() as f64
        };

        Self {
            processed,
            succeeded: processed - failures,
            failures,
            failures_by_kind,
            per_field,
            overall_rate,
        }
    }

    /// Completion entry for a field
    pub fn field(&self, field: SchemaField) -> &FieldCompletion {
        &self.per_field[field.index()]
    }

    /// Number of failures of a given kind
    pub fn failures_of(&self, kind: FailureKind) -> usize {
        self.failures_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Overall rate as a percentage, rounded to two decimals
    pub fn overall_percentage(&self) -> f64 {
        (self.overall_rate * 10_000.0).round() / 100.0
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}
