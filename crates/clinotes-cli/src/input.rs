//! Loading clinical notes from disk.
//!
//! Tabular sources (CSV and Excel) also keep each note's full input row, so
//! the export can place the original columns beside the extracted fields.

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Reader};
use clinotes_domain::{ClinicalNote, NoteId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File extensions read as spreadsheets.
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

/// Where the notes of a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteSource {
    /// One note per row of a CSV file
    Csv {
        /// CSV file path
        path: PathBuf,
        /// Column holding the note text
        column: String,
        /// Column holding the note id, if any
        id_column: Option<String>,
    },
    /// One note per row of the first sheet of a workbook
    Excel {
        /// Workbook path
        path: PathBuf,
        /// Column holding the note text
        column: String,
        /// Column holding the note id, if any
        id_column: Option<String>,
    },
    /// One note per `.txt` file in a directory
    TextDir(PathBuf),
}

/// Input rows of a tabular source, keyed by the note they produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceColumns {
    headers: Vec<String>,
    rows: HashMap<NoteId, Vec<String>>,
}

impl SourceColumns {
    /// Input column names, in file order
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// The input row of a note, one cell per header
    pub fn row(&self, id: &NoteId) -> Option<&[String]> {
        self.rows.get(id).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Notes read from a source together with their input rows.
#[derive(Debug, Clone, Default)]
pub struct NoteTable {
    pub notes: Vec<ClinicalNote>,
    pub columns: SourceColumns,
}

impl NoteSource {
    /// Pick the source kind from what `path` points at.
    pub fn detect(path: &Path, column: &str, id_column: Option<&str>) -> Self {
        if path.is_dir() {
            return NoteSource::TextDir(path.to_path_buf());
        }

        let path = path.to_path_buf();
        let column = column.to_string();
        let id_column = id_column.map(str::to_string);
        if is_spreadsheet(&path) {
            NoteSource::Excel { path, column, id_column }
        } else {
            NoteSource::Csv { path, column, id_column }
        }
    }

    /// Read every note from the source.
    pub fn load(&self) -> Result<NoteTable> {
        let table = match self {
            NoteSource::Csv { path, column, id_column } => read_csv_table(path, column, id_column.as_deref())?,
            NoteSource::Excel { path, column, id_column } => {
                read_excel_table(path, column, id_column.as_deref())?
            }
            NoteSource::TextDir(dir) => NoteTable {
                notes: load_text_dir(dir)?,
                columns: SourceColumns::default(),
            },
        };
        info!(notes = table.notes.len(), "Loaded notes");
        Ok(table)
    }
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SPREADSHEET_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Read notes from a CSV column.
///
/// Rows with an empty notes cell are skipped. Without an id column a note is
/// identified by its 1-based data row number, so skipped rows leave gaps.
pub fn load_csv(path: &Path, column: &str, id_column: Option<&str>) -> Result<Vec<ClinicalNote>> {
    Ok(read_csv_table(path, column, id_column)?.notes)
}

fn read_csv_table(path: &Path, column: &str, id_column: Option<&str>) -> Result<NoteTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed opening CSV {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed reading headers from {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let records = reader.records().enumerate().map(|(row, record)| {
        record
            .map(|r| r.iter().map(str::to_string).collect())
            .with_context(|| format!("Failed reading row {} of {}", row + 1, path.display()))
    });
    build_table(headers, records, column, id_column)
}

/// Read notes from a column of the first sheet of a workbook.
///
/// The first row holds the column names; ids and skipped rows follow the
/// CSV rules.
pub fn load_excel(path: &Path, column: &str, id_column: Option<&str>) -> Result<Vec<ClinicalNote>> {
    Ok(read_excel_table(path, column, id_column)?.notes)
}

fn read_excel_table(path: &Path, column: &str, id_column: Option<&str>) -> Result<NoteTable> {
    let mut workbook =
        open_workbook_auto(path).with_context(|| format!("Failed opening workbook {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .with_context(|| format!("Workbook {} has no sheets", path.display()))?
        .with_context(|| format!("Failed reading first sheet of {}", path.display()))?;

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());
    let Some(headers) = rows.next() else {
        bail!("Workbook {} is empty", path.display());
    };
    build_table(headers, rows.map(Ok), column, id_column)
}

fn build_table(
    headers: Vec<String>,
    records: impl Iterator<Item = Result<Vec<String>>>,
    column: &str,
    id_column: Option<&str>,
) -> Result<NoteTable> {
    let text_index = header_index(&headers, column)?;
    let id_index = id_column.map(|name| header_index(&headers, name)).transpose()?;
    let width = headers.len();

    let mut table = NoteTable {
        notes: Vec::new(),
        columns: SourceColumns {
            headers: headers.iter().map(|h| h.trim().to_string()).collect(),
            rows: HashMap::new(),
        },
    };
    let mut skipped = 0usize;
    for (row, record) in records.enumerate() {
        let mut record = record?;
        let text = record.get(text_index).map(String::as_str).unwrap_or_default();
        if text.trim().is_empty() {
            skipped += 1;
            continue;
        }

        let id = match id_index.and_then(|i| record.get(i)).map(|id| id.trim()) {
            Some(id) if !id.is_empty() => NoteId::new(id),
            _ => NoteId::from_index(row),
        };
        table.notes.push(ClinicalNote::new(id.clone(), text));

        record.resize(width, String::new());
        if table.columns.rows.insert(id.clone(), record).is_some() {
            debug!(note_id = %id, "Duplicate note id; export keeps the last input row");
        }
    }

    if skipped > 0 {
        debug!(skipped, column, "Skipped rows with an empty notes cell");
    }
    Ok(table)
}

fn header_index(headers: &[String], name: &str) -> Result<usize> {
    match headers.iter().position(|h| h.trim() == name) {
        Some(index) => Ok(index),
        None => {
            let available: Vec<&str> = headers.iter().map(|h| h.trim()).collect();
            bail!("Column '{}' not found. Available columns: {}", name, available.join(", "))
        }
    }
}

/// Read one note per `.txt` file, sorted by file name, id = file stem.
pub fn load_text_dir(dir: &Path) -> Result<Vec<ClinicalNote>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed reading directory {}", dir.display()))? {
        let entry = entry.with_context(|| format!("Failed iterating {}", dir.display()))?;
        let path = entry.path();
        let is_txt = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
        if path.is_file() && is_txt {
            files.push(path);
        }
    }
    files.sort();

    files
        .into_iter()
        .map(|path| {
            let text = fs::read_to_string(&path).with_context(|| format!("Failed reading {}", path.display()))?;
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(ClinicalNote::new(NoteId::new(stem), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_extension() {
        let excel = NoteSource::detect(Path::new("visits.XLSX"), "Notes", None);
        assert!(matches!(excel, NoteSource::Excel { .. }));

        let csv = NoteSource::detect(Path::new("visits.csv"), "Notes", Some("MRN"));
        assert_eq!(
            csv,
            NoteSource::Csv {
                path: PathBuf::from("visits.csv"),
                column: "Notes".into(),
                id_column: Some("MRN".into()),
            }
        );
    }

    #[test]
    fn test_table_keeps_padded_input_rows() {
        let headers = vec!["MRN".to_string(), " Notes ".to_string(), "Ward".to_string()];
        let records = vec![
            Ok(vec!["A-1".to_string(), "Cough".to_string()]),
            Ok(vec!["A-2".to_string(), " ".to_string(), "4B".to_string()]),
            Ok(vec!["A-3".to_string(), "Fever".to_string(), "2C".to_string()]),
        ];

        let table = build_table(headers, records.into_iter(), "Notes", Some("MRN")).unwrap();
        assert_eq!(table.notes.len(), 2);
        assert_eq!(table.columns.headers(), &["MRN", "Notes", "Ward"]);
        assert_eq!(table.columns.row(&NoteId::new("A-1")).unwrap(), &["A-1", "Cough", ""]);
        assert_eq!(table.columns.row(&NoteId::new("A-3")).unwrap()[2], "2C");
        assert!(table.columns.row(&NoteId::new("A-2")).is_none());
    }
}
