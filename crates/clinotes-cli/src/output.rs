//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use clinotes_domain::{FailureKind, FieldSchema};
use clinotes_extractor::{BatchReport, ProgressEvent};
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format the summary of a batch run.
    pub fn format_report(&self, report: &BatchReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_report_json(report),
            OutputFormat::Table => Ok(self.format_report_table(report)),
            OutputFormat::Quiet => Ok(self.format_report_quiet(report)),
        }
    }

    fn format_report_json(&self, report: &BatchReport) -> Result<String> {
        let summary = serde_json::json!({
            "run_id": report.run_id.to_string(),
            "model_id": report.model_id,
            "total_notes": report.total_notes,
            "processed": report.processed(),
            "truncated": report.truncated,
            "chunk_sizes": report.chunk_sizes,
            "elapsed_ms": report.elapsed_ms,
            "statistics": report.statistics,
        });
        Ok(serde_json::to_string_pretty(&summary)?)
    }

    fn format_report_table(&self, report: &BatchReport) -> String {
        let stats = &report.statistics;
        if stats.processed == 0 {
            return self.colorize("No notes were processed.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Field", "Populated", "Completion"]);
        for entry in &stats.per_field {
            builder.push_record([
                entry.field.key().to_string(),
                format!("{}/{}", entry.populated, stats.processed),
                format!("{:.2}%", entry.percentage()),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        let mut lines = vec![table.to_string()];
        lines.push(format!(
            "Overall completion: {}",
            self.colorize(&format!("{:.2}%", stats.overall_percentage()), "cyan")
        ));
        lines.push(format!(
            "Notes: {} processed, {} succeeded, {} failed ({} ms)",
            stats.processed, stats.succeeded, stats.failures, report.elapsed_ms
        ));
        for (kind, count) in &stats.failures_by_kind {
            lines.push(self.warning(&format!("{}: {}", describe_failure(*kind), count)));
        }
        lines.join("\n")
    }

    fn format_report_quiet(&self, report: &BatchReport) -> String {
        format!(
            "{}/{} notes, {:.2}% complete",
            report.processed(),
            report.total_notes,
            report.statistics.overall_percentage()
        )
    }

    /// Format the clinical schema.
    pub fn format_schema(&self, schema: &FieldSchema) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let fields: Vec<serde_json::Value> = schema
                    .definitions()
                    .map(|def| {
                        serde_json::json!({
                            "key": def.key,
                            "label": def.label,
                            "description": def.description,
                            "aliases": def.aliases,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&fields)?)
            }
            OutputFormat::Quiet => Ok(schema.keys().join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Key", "Label", "Description"]);
                for def in schema.definitions() {
                    builder.push_record([def.key, def.label, def.description]);
                }
                let mut table = builder.build();
                table.with(Style::rounded());
                Ok(table.to_string())
            }
        }
    }

    /// Format the list of known models.
    pub fn format_models(&self, models: &[(&str, &str)], default_model: &str) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let entries: Vec<serde_json::Value> = models
                    .iter()
                    .map(|(id, description)| {
                        serde_json::json!({
                            "id": id,
                            "description": description,
                            "default": *id == default_model,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&entries)?)
            }
            OutputFormat::Quiet => Ok(models.iter().map(|(id, _)| *id).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Model", "Description"]);
                for (id, description) in models {
                    let marker = if *id == default_model { " *" } else { "" };
                    builder.push_record([format!("{}{}", id, marker), description.to_string()]);
                }
                let mut table = builder.build();
                table.with(Style::rounded());
                Ok(table.to_string())
            }
        }
    }

    /// Format a progress event as a single status line.
    ///
    /// Returns `None` for events that are not shown in the current format.
    pub fn progress(&self, event: &ProgressEvent) -> Option<String> {
        if self.format == OutputFormat::Quiet {
            return None;
        }
        match event {
            ProgressEvent::ChunkStarted {
                chunk,
                total_chunks,
                size,
            } => Some(self.info(&format!(
                "Chunk {}/{} ({} notes)",
                chunk + 1,
                total_chunks,
                size
            ))),
            ProgressEvent::NoteCompleted {
                position,
                total,
                note_id,
                failure,
            } => {
                let status = match failure {
                    None => self.colorize("ok", "green"),
                    Some(kind) => self.colorize(kind.as_str(), "red"),
                };
                Some(format!("  [{}/{}] note {} {}", position + 1, total, note_id, status))
            }
            ProgressEvent::ChunkCompleted { .. } => None,
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

fn describe_failure(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::ExtractionUnavailable => "Model unavailable",
        FailureKind::ParseFailure => "Unparseable response",
        FailureKind::InputTooLarge => "Note too long",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinotes_domain::{CompletionStats, ExtractionResult, FieldValues, NoteId, SchemaField};

    fn report(results: Vec<ExtractionResult>) -> BatchReport {
        BatchReport {
            run_id: Default::default(),
            model_id: "test-model".to_string(),
            total_notes: results.len(),
            chunk_sizes: vec![results.len()],
            truncated: false,
            statistics: CompletionStats::from_results(&results),
            results,
            elapsed_ms: 12,
        }
    }

    fn results() -> Vec<ExtractionResult> {
        vec![
            ExtractionResult::succeeded(
                NoteId::new("1"),
                FieldValues::all_missing().with(SchemaField::Plan, "Rest"),
                None,
            ),
            ExtractionResult::failed(NoteId::new("2"), FailureKind::ParseFailure, "x", None),
        ]
    }

    #[test]
    fn test_table_report() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&report(results())).unwrap();
        assert!(output.contains("Chief_Complaint"));
        assert!(output.contains("1/2"));
        assert!(output.contains("50.00%"));
        assert!(output.contains("Overall completion: 5.00%"));
        assert!(output.contains("Unparseable response: 1"));
    }

    #[test]
    fn test_json_report() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_report(&report(results())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["processed"], 2);
        assert_eq!(value["model_id"], "test-model");
        assert_eq!(value["statistics"]["failures"], 1);
    }

    #[test]
    fn test_quiet_report() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_report(&report(results())).unwrap();
        assert_eq!(output, "2/2 notes, 5.00% complete");
    }

    #[test]
    fn test_empty_report() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&report(Vec::new())).unwrap();
        assert!(output.contains("No notes were processed"));
    }

    #[test]
    fn test_schema_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_schema(FieldSchema::clinical()).unwrap();
        assert!(output.contains("Review_of_Systems"));

        let quiet = Formatter::new(OutputFormat::Quiet, false);
        assert_eq!(quiet.format_schema(FieldSchema::clinical()).unwrap().lines().count(), 10);
    }

    #[test]
    fn test_models_marks_default() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let models = [("a", "first"), ("b", "second")];
        let output = formatter.format_models(&models, "b").unwrap();
        assert!(output.contains("b *"));
        assert!(!output.contains("a *"));
    }

    #[test]
    fn test_progress_lines() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let line = formatter
            .progress(&ProgressEvent::NoteCompleted {
                position: 0,
                total: 3,
                note_id: NoteId::new("7"),
                failure: Some(FailureKind::InputTooLarge),
            })
            .unwrap();
        assert_eq!(line, "  [1/3] note 7 input_too_large");

        let quiet = Formatter::new(OutputFormat::Quiet, false);
        let event = ProgressEvent::ChunkStarted {
            chunk: 0,
            total_chunks: 1,
            size: 3,
        };
        assert!(quiet.progress(&event).is_none());
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let msg = formatter.success("test");
        assert_eq!(msg, "✓ test");
    }
}
