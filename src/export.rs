//! Tabular rendering of generated records: CSV export and a plain-text table.
//!
//! Columns are the union of top-level keys across all records, in the order
//! they are first seen. Fallback records contribute a `raw` column; items
//! that are not JSON objects contribute a `value` column.

use crate::error::ExamGenError;
use crate::output::GeneratedRecord;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// File name used when the caller asks for an export without naming one.
pub const DEFAULT_EXPORT_FILENAME: &str = "questions.csv";

/// Column header for non-object items.
const VALUE_COLUMN: &str = "value";

/// Widest cell shown by [`render_table`] before truncation.
const MAX_CELL_WIDTH: usize = 48;

/// Column names in first-seen order.
pub fn columns(records: &[GeneratedRecord]) -> Vec<String> {
    let mut cols: Vec<String> = Vec::new();
    let mut push = |name: &str| {
        if !cols.iter().any(|c| c == name) {
            cols.push(name.to_string());
        }
    };
    for record in records {
        match record {
            GeneratedRecord::Fallback { .. } => push("raw"),
            GeneratedRecord::Item(Value::Object(map)) => map.keys().for_each(|k| push(k.as_str())),
            GeneratedRecord::Item(_) => push(VALUE_COLUMN),
        }
    }
    cols
}

/// Text of one cell: strings verbatim, null/missing empty, anything else as
/// compact JSON.
fn cell(record: &GeneratedRecord, column: &str) -> String {
    let value = match record {
        GeneratedRecord::Item(v) if !v.is_object() => (column == VALUE_COLUMN).then(|| v.clone()),
        _ => record.get(column),
    };
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

/// Write `records` as CSV (header row first) to `writer`.
pub fn write_csv<W: Write>(records: &[GeneratedRecord], writer: W) -> Result<(), ExamGenError> {
    let cols = columns(records);
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&cols)?;
    for record in records {
        wtr.write_record(cols.iter().map(|c| cell(record, c)))?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Render `records` as a CSV string.
pub fn to_csv_string(records: &[GeneratedRecord]) -> Result<String, ExamGenError> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ExamGenError::Internal(format!("CSV not UTF-8: {}", e)))
}

/// Write `records` as CSV to `path`.
///
/// Atomic: the data goes to a temp file in the same directory, which is then
/// persisted over `path`, so readers never see a half-written export.
pub fn export_csv(records: &[GeneratedRecord], path: impl AsRef<Path>) -> Result<(), ExamGenError> {
    let path = path.as_ref();
    let write_err = |source: std::io::Error| ExamGenError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir().map_err(write_err)?,
    };
    std::fs::create_dir_all(&dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(write_err)?;
    write_csv(records, tmp.as_file_mut())?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    info!("Exported {} records to {}", records.len(), path.display());
    Ok(())
}

/// Render `records` as an aligned plain-text table for the terminal.
///
/// Newlines inside cells are flattened to spaces and long cells are
/// shortened with `…`.
pub fn render_table(records: &[GeneratedRecord]) -> String {
    let cols = columns(records);
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| cols.iter().map(|c| shorten(&cell(r, c))).collect())
        .collect();

    let widths: Vec<usize> = cols
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_row(&mut out, &cols, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(c, w)| format!("{:<width$}", c, width = *w))
        .collect();
    out.push_str(line.join(" | ").trim_end());
    out.push('\n');
}

fn shorten(s: &str) -> String {
    let flat: String = s
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if flat.chars().count() > MAX_CELL_WIDTH {
        let mut cut: String = flat.chars().take(MAX_CELL_WIDTH - 1).collect();
        cut.push('…');
        cut
    } else {
        flat
    }
}
