//! Integration tests for the clinotes CLI
//!
//! Exercises note loading, batch execution against a mock model and result
//! export through the filesystem.

use clinotes_cli::cli::ExportFormat;
use clinotes_cli::commands::run_extraction;
use clinotes_cli::config::OutputFormat;
use clinotes_cli::export::{export_headers, export_results, ExportOptions, SHEET_NAME};
use clinotes_cli::input::{load_csv, load_excel, load_text_dir, NoteSource};
use clinotes_cli::Formatter;
use clinotes_domain::{FailureKind, SchemaField};
use clinotes_extractor::{BatchExtractor, ExtractorConfig};
use clinotes_llm::{BackoffPolicy, MockProvider, ModelClient, ModelConfig};
use std::fs;
use tokio_util::sync::CancellationToken;

const RESPONSE: &str = r#"```json
{"Chief_Complaint": "Chest pain, radiating", "Allergies": "NKDA", "Plan": ""}
```"#;

fn write_notes_csv(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("notes.csv");
    fs::write(
        &path,
        "Patient,Notes\n\
         A-1,\"CC: chest pain, radiating to arm\"\n\
         A-2,\n\
         A-3,Follow-up visit. No complaints.\n",
    )
    .unwrap();
    path
}

#[test]
fn test_csv_input_skips_empty_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_notes_csv(dir.path());

    let notes = load_csv(&path, "Notes", None).unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].id().as_str(), "1");
    assert_eq!(notes[0].text(), "CC: chest pain, radiating to arm");
    assert_eq!(notes[1].id().as_str(), "3");

    let with_ids = load_csv(&path, "Notes", Some("Patient")).unwrap();
    let ids: Vec<_> = with_ids.iter().map(|n| n.id().as_str()).collect();
    assert_eq!(ids, vec!["A-1", "A-3"]);
}

#[test]
fn test_unknown_column_lists_available() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_notes_csv(dir.path());

    let err = load_csv(&path, "Text", None).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Column 'Text' not found"));
    assert!(message.contains("Patient, Notes"));
}

#[test]
fn test_missing_csv_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_csv(&dir.path().join("absent.csv"), "Notes", None).unwrap_err();
    assert!(format!("{:#}", err).contains("absent.csv"));
}

#[test]
fn test_text_directory_sorted_by_name() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("b_visit.txt"), "Second note").unwrap();
    fs::write(dir.path().join("a_visit.txt"), "First note").unwrap();
    fs::write(dir.path().join("ignored.md"), "Not a note").unwrap();

    let notes = load_text_dir(dir.path()).unwrap();
    let ids: Vec<_> = notes.iter().map(|n| n.id().as_str()).collect();
    assert_eq!(ids, vec!["a_visit", "b_visit"]);
    assert_eq!(notes[0].text(), "First note");

    let source = NoteSource::detect(dir.path(), "Notes", None);
    assert!(matches!(source, NoteSource::TextDir(_)));
    let table = source.load().unwrap();
    assert_eq!(table.notes.len(), 2);
    assert!(table.columns.is_empty());
}

#[tokio::test]
async fn test_extract_and_export_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_notes_csv(dir.path());
    let notes = load_csv(&input, "Notes", None).unwrap();

    let provider = MockProvider::new(RESPONSE);
    provider.add_response("Follow-up", "No recognizable content");
    let client = ModelClient::new(
        provider.clone(),
        ModelConfig::new("key", "model").with_backoff(BackoffPolicy::none()),
    );
    let config = ExtractorConfig {
        chunk_delay_ms: 0,
        ..ExtractorConfig::default()
    };
    let extractor = BatchExtractor::new(client, config);
    let formatter = Formatter::new(OutputFormat::Quiet, false);

    let report = run_extraction(&extractor, &notes, &formatter, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.results.len(), 2);
    assert_eq!(provider.call_count(), 2);
    assert_eq!(
        report.results[0].value(SchemaField::ChiefComplaint).as_str(),
        Some("Chest pain, radiating")
    );
    assert_eq!(report.results[1].failure_kind(), Some(FailureKind::ParseFailure));

    let output = dir.path().join("out").join("results.csv");
    let rows = export_results(&output, ExportFormat::Csv, &report.results, ExportOptions::default()).unwrap();
    assert_eq!(rows, 2);

    let mut reader = csv::Reader::from_path(&output).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(headers, export_headers());

    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][0], "1");
    assert_eq!(&records[0][1], "Chest pain, radiating");
    assert_eq!(&records[0][5], "NKDA");
    assert_eq!(&records[0][10], "");
    assert_eq!(&records[0][11], "true");
    assert_eq!(&records[1][0], "3");
    assert_eq!(&records[1][12], "parse_failure");
}

#[tokio::test]
async fn test_drop_empty_json_export() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_notes_csv(dir.path());
    let notes = load_csv(&input, "Notes", None).unwrap();

    let provider = MockProvider::new(RESPONSE);
    provider.add_response("Follow-up", r#"{"Chief_Complaint": "N/A"}"#);
    let client = ModelClient::new(provider, ModelConfig::new("key", "model"));
    let extractor = BatchExtractor::new(
        client,
        ExtractorConfig {
            chunk_delay_ms: 0,
            ..ExtractorConfig::default()
        },
    );
    let formatter = Formatter::new(OutputFormat::Quiet, false);
    let report = run_extraction(&extractor, &notes, &formatter, &CancellationToken::new())
        .await
        .unwrap();

    let output = dir.path().join("results.json");
    let format = ExportFormat::resolve(None, &output);
    let options = ExportOptions {
        drop_empty: true,
        source: None,
    };
    let rows = export_results(&output, format, &report.results, options).unwrap();
    assert_eq!(rows, 1);

    let exported: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    let exported = exported.as_array().unwrap();
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0]["note_id"], "1");
    assert_eq!(exported[0]["Allergies"], "NKDA");
    assert_eq!(exported[0]["success"], true);
}

fn write_notes_xlsx(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("visits.xlsx");
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    let rows: [[&str; 3]; 4] = [
        ["MRN", "Ward", "Notes"],
        ["A-1", "4B", "CC: chest pain, radiating to arm"],
        ["A-2", "2C", ""],
        ["A-3", "5A", "Follow-up visit. No complaints."],
    ];
    for (row, cells) in (0u32..).zip(rows) {
        for (col, cell) in (0u16..).zip(cells) {
            if !cell.is_empty() {
                sheet.write_string(row, col, cell).unwrap();
            }
        }
    }
    workbook.save(&path).unwrap();
    path
}

#[test]
fn test_excel_input_matches_csv_rules() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_notes_xlsx(dir.path());

    let notes = load_excel(&path, "Notes", None).unwrap();
    let ids: Vec<_> = notes.iter().map(|n| n.id().as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(notes[0].text(), "CC: chest pain, radiating to arm");

    let err = load_excel(&path, "Text", None).unwrap_err();
    assert!(format!("{:#}", err).contains("Available columns: MRN, Ward, Notes"));

    let source = NoteSource::detect(&path, "Notes", Some("MRN"));
    assert!(matches!(source, NoteSource::Excel { .. }));
    let table = source.load().unwrap();
    let ids: Vec<_> = table.notes.iter().map(|n| n.id().as_str()).collect();
    assert_eq!(ids, vec!["A-1", "A-3"]);
    assert_eq!(table.columns.headers(), &["MRN", "Ward", "Notes"]);
}

#[tokio::test]
async fn test_excel_to_xlsx_keeps_input_columns() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_notes_xlsx(dir.path());
    let table = NoteSource::detect(&input, "Notes", None).load().unwrap();

    let provider = MockProvider::new(RESPONSE);
    let client = ModelClient::new(provider, ModelConfig::new("key", "model"));
    let extractor = BatchExtractor::new(
        client,
        ExtractorConfig {
            chunk_delay_ms: 0,
            ..ExtractorConfig::default()
        },
    );
    let formatter = Formatter::new(OutputFormat::Quiet, false);
    let report = run_extraction(&extractor, &table.notes, &formatter, &CancellationToken::new())
        .await
        .unwrap();

    let output = dir.path().join("structured.xlsx");
    let options = ExportOptions {
        drop_empty: false,
        source: Some(&table.columns),
    };
    let rows = export_results(&output, ExportFormat::resolve(None, &output), &report.results, options).unwrap();
    assert_eq!(rows, 2);

    let mut workbook = calamine::open_workbook_auto(&output).unwrap();
    let range = calamine::Reader::worksheet_range(&mut workbook, SHEET_NAME).unwrap();
    let cells: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    assert_eq!(cells.len(), 3);
    assert_eq!(&cells[0][..4], &["MRN", "Ward", "Notes", "note_id"]);
    assert_eq!(&cells[1][..4], &["A-1", "4B", "CC: chest pain, radiating to arm", "1"]);
    assert_eq!(cells[1][4], "Chest pain, radiating");
    assert_eq!(&cells[2][..2], &["A-3", "5A"]);
    assert_eq!(cells[2][3], "3");
}
