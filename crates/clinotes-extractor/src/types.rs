//! Types produced by a batch run

use clinotes_domain::{CompletionStats, ExtractionResult};
use serde::Serialize;
use uuid::Uuid;

/// Outcome of one batch run
///
/// `results` holds one entry per processed note, in input order. When the
/// run was cancelled `truncated` is set and `results` is a prefix of the
/// input.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Identifier of this run, also attached to its log span
    pub run_id: Uuid,

    /// Model that produced the results
    pub model_id: String,

    /// Per-note results in input order
    pub results: Vec<ExtractionResult>,

    /// Notes submitted to the run
    pub total_notes: usize,

    /// Size of every chunk that was started
    pub chunk_sizes: Vec<usize>,

    /// Whether the run stopped early on cancellation
    pub truncated: bool,

    /// Completion statistics over `results`
    pub statistics: CompletionStats,

    /// Wall-clock duration of the run (milliseconds)
    pub elapsed_ms: u64,
}

impl BatchReport {
    /// Notes that produced a result
    pub fn processed(&self) -> usize {
        self.results.len()
    }

    /// Failed results
    pub fn failures(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Results with at least one populated field
    pub fn non_empty_results(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.results.iter().filter(|r| !r.fields().is_all_missing())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinotes_domain::{FailureKind, FieldValues, NoteId, SchemaField};

    fn report(results: Vec<ExtractionResult>) -> BatchReport {
        BatchReport {
            run_id: Uuid::now_v7(),
            model_id: "m".to_string(),
            total_notes: results.len(),
            chunk_sizes: vec![results.len()],
            truncated: false,
            statistics: CompletionStats::from_results(&results),
            results,
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_report_views() {
        let report = report(vec![
            ExtractionResult::succeeded(
                NoteId::new("1"),
                FieldValues::all_missing().with(SchemaField::Plan, "rest"),
                None,
            ),
            ExtractionResult::empty(NoteId::new("2")),
            ExtractionResult::failed(NoteId::new("3"), FailureKind::ParseFailure, "x", None),
        ]);

        assert_eq!(report.processed(), 3);
        assert_eq!(report.failures().count(), 1);
        let kept: Vec<_> = report.non_empty_results().map(|r| r.note_id().as_str()).collect();
        assert_eq!(kept, vec!["1"]);
    }

    #[test]
    fn test_report_serializes_run_id() {
        let report = report(vec![ExtractionResult::empty(NoteId::new("1"))]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["run_id"], report.run_id.to_string());
        assert_eq!(json["results"].as_array().unwrap().len(), 1);
        assert_eq!(json["truncated"], false);
    }
}
