//! Writing per-note results as CSV, JSON or an Excel workbook.
//!
//! Every format shares one row layout: `note_id`, the schema fields in schema
//! order, then `success`, `failure_kind` and `error`. A missing field is an
//! empty cell. When the input columns are kept they come first, as in the
//! input file.

use crate::cli::ExportFormat;
use crate::input::SourceColumns;
use anyhow::{Context, Result};
use clinotes_domain::{ExtractionResult, SchemaField};
use rust_xlsxwriter::{Format, Workbook};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Sheet name of the Excel export.
pub const SHEET_NAME: &str = "Structured_Features";

const MAX_COLUMN_WIDTH: usize = 50;

/// Header row shared by every export format.
pub fn export_headers() -> Vec<&'static str> {
    let mut headers = vec!["note_id"];
    headers.extend(SchemaField::ALL.iter().map(|f| f.key()));
    headers.extend(["success", "failure_kind", "error"]);
    headers
}

/// What goes into an export besides the results themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions<'a> {
    /// Leave out notes where every field is missing
    pub drop_empty: bool,
    /// Input columns placed before the extracted fields
    pub source: Option<&'a SourceColumns>,
}

/// Rows to export, with the optional input columns in front.
pub struct ExportTable<'a> {
    results: Vec<&'a ExtractionResult>,
    source: Option<&'a SourceColumns>,
    source_headers: Vec<String>,
}

impl<'a> ExportTable<'a> {
    pub fn new(results: &'a [ExtractionResult], options: ExportOptions<'a>) -> Self {
        let results = if options.drop_empty {
            drop_empty(results)
        } else {
            results.iter().collect()
        };
        let source = options.source.filter(|s| !s.is_empty());
        let source_headers = source.map(source_headers).unwrap_or_default();
        Self {
            results,
            source,
            source_headers,
        }
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Full header row
    pub fn headers(&self) -> Vec<&str> {
        let mut headers: Vec<&str> = self.source_headers.iter().map(String::as_str).collect();
        headers.extend(export_headers());
        headers
    }

    fn source_cells(&self, result: &ExtractionResult) -> Vec<&'a str> {
        let Some(source) = self.source else {
            return Vec::new();
        };
        match source.row(result.note_id()) {
            Some(row) => row.iter().map(String::as_str).collect(),
            None => vec![""; self.source_headers.len()],
        }
    }

    fn cells<'r>(&self, result: &'r ExtractionResult) -> Vec<&'r str>
    where
        'a: 'r,
    {
        let mut cells: Vec<&'r str> = self.source_cells(result);
        cells.extend(export_cells(result));
        cells
    }
}

/// Input headers, renamed where they clash with an extracted column.
fn source_headers(source: &SourceColumns) -> Vec<String> {
    let reserved = export_headers();
    source
        .headers()
        .iter()
        .map(|h| {
            if reserved.contains(&h.as_str()) {
                format!("input_{}", h)
            } else {
                h.clone()
            }
        })
        .collect()
}

fn export_cells(result: &ExtractionResult) -> Vec<&str> {
    let mut cells = vec![result.note_id().as_str()];
    cells.extend(SchemaField::ALL.iter().map(|f| result.value(*f).export_cell()));
    cells.push(if result.is_success() { "true" } else { "false" });
    cells.push(result.failure_kind().map(|k| k.as_str()).unwrap_or_default());
    cells.push(result.failure_detail().unwrap_or_default());
    cells
}

/// One export row, serialized as a flat object with keys in column order.
struct ExportRow<'t, 'a> {
    table: &'t ExportTable<'a>,
    result: &'a ExtractionResult,
}

impl Serialize for ExportRow<'_, '_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let result = self.result;
        let source = self.table.source_cells(result);
        let mut map = serializer.serialize_map(Some(source.len() + export_headers().len()))?;
        for (header, cell) in self.table.source_headers.iter().zip(source) {
            map.serialize_entry(header, cell)?;
        }
        map.serialize_entry("note_id", result.note_id().as_str())?;
        for field in SchemaField::ALL {
            map.serialize_entry(field.key(), result.value(field).export_cell())?;
        }
        map.serialize_entry("success", &result.is_success())?;
        map.serialize_entry("failure_kind", &result.failure_kind().map(|k| k.as_str()))?;
        map.serialize_entry("error", &result.failure_detail())?;
        map.end()
    }
}

/// Keep only results with at least one populated field.
pub fn drop_empty(results: &[ExtractionResult]) -> Vec<&ExtractionResult> {
    results.iter().filter(|r| !r.fields().is_all_missing()).collect()
}

/// Write rows as CSV.
pub fn write_csv<W: Write>(writer: W, table: &ExportTable<'_>) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(table.headers()).context("Failed writing CSV header")?;
    for result in &table.results {
        writer
            .write_record(table.cells(result))
            .with_context(|| format!("Failed writing CSV row for note {}", result.note_id()))?;
    }
    writer.flush().context("Failed flushing CSV output")?;
    Ok(())
}

/// Write rows as a pretty-printed JSON array.
pub fn write_json<W: Write>(mut writer: W, table: &ExportTable<'_>) -> Result<()> {
    let rows: Vec<ExportRow<'_, '_>> = table
        .results
        .iter()
        .map(|&result| ExportRow { table, result })
        .collect();
    serde_json::to_writer_pretty(&mut writer, &rows).context("Failed writing JSON output")?;
    writeln!(writer).context("Failed writing JSON output")?;
    Ok(())
}

/// Write rows as a single-sheet workbook with a bold header row.
///
/// Column widths follow the longest cell, capped at 50 characters.
pub fn write_xlsx<W: Write>(mut writer: W, table: &ExportTable<'_>) -> Result<()> {
    let headers = table.headers();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).context("Failed naming worksheet")?;

    let bold = Format::new().set_bold();
    for (col, header) in (0u16..).zip(&headers) {
        sheet
            .write_string_with_format(0, col, *header, &bold)
            .context("Failed writing header row")?;
    }

    for (row, result) in (1u32..).zip(&table.results) {
        for ((col, cell), width) in (0u16..).zip(table.cells(result)).zip(widths.iter_mut()) {
            *width = (*width).max(cell.chars().count());
            if cell.is_empty() {
                continue;
            }
            sheet
                .write_string(row, col, cell)
                .with_context(|| format!("Failed writing row for note {}", result.note_id()))?;
        }
    }

    for (col, width) in (0u16..).zip(&widths) {
        let width = (*width + 2).min(MAX_COLUMN_WIDTH);
        sheet
            .set_column_width(col, width as f64)
            .context("Failed sizing columns")?;
    }

    let buffer = workbook.save_to_buffer().context("Failed building workbook")?;
    writer.write_all(&buffer).context("Failed writing workbook")?;
    Ok(())
}

/// Export results to `path`, returning the number of rows written.
pub fn export_results(
    path: &Path,
    format: ExportFormat,
    results: &[ExtractionResult],
    options: ExportOptions<'_>,
) -> Result<usize> {
    let table = ExportTable::new(results, options);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed creating directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match format {
        ExportFormat::Csv => write_csv(&mut writer, &table)?,
        ExportFormat::Json => write_json(&mut writer, &table)?,
        ExportFormat::Xlsx => write_xlsx(&mut writer, &table)?,
    }
    writer
        .flush()
        .with_context(|| format!("Failed writing {}", path.display()))?;

    info!(
        path = %path.display(),
        rows = table.len(),
        dropped = results.len() - table.len(),
        "Exported results"
    );
    Ok(table.len())
}
