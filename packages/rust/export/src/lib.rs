//! Delimited-file export for extracted tables.
//!
//! Writes the header line followed by one line per row. The file is staged
//! in a sibling temp file and renamed over the destination, so a failed run
//! never leaves partial output behind.

mod preview;

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

use statgrab_shared::{DataRow, ExportOptions, Result, StatgrabError, Table};

pub use preview::render_preview;

/// Outcome of a successful export.
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// File that was written.
    pub path: PathBuf,
    /// Data rows written (header excluded).
    pub rows: usize,
    /// Columns per row, index column excluded.
    pub columns: usize,
}

/// Write `table` to `path`, replacing any existing file.
///
/// Missing parent directories are created.
#[instrument(skip(table), fields(path = %path.display(), rows = table.len()))]
pub fn write_table(table: &Table, path: &Path, opts: &ExportOptions) -> Result<ExportSummary> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| StatgrabError::io(&dir, e))?;

    let staged = NamedTempFile::new_in(&dir).map_err(|e| StatgrabError::io(&dir, e))?;
    debug!(staged = %staged.path().display(), "staging export");

    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(opts.delimiter)
            .from_writer(staged.as_file());

        writer
            .write_record(with_index(None, table.headers(), opts.write_index))
            .map_err(|e| csv_error(path, e))?;

        for (i, row) in table.rows().iter().enumerate() {
            writer
                .write_record(with_index(Some(i), row, opts.write_index))
                .map_err(|e| csv_error(path, e))?;
        }

        writer.flush().map_err(|e| StatgrabError::io(path, e))?;
    }

    staged
        .persist(path)
        .map_err(|e| StatgrabError::io(path, e.error))?;

    let summary = ExportSummary {
        path: path.to_path_buf(),
        rows: table.len(),
        columns: table.width(),
    };

    info!(rows = summary.rows, columns = summary.columns, "table exported");
    Ok(summary)
}

/// Read a file produced by [`write_table`] back into a [`Table`].
///
/// With `opts.write_index` the leading index column is dropped. Ragged
/// lines surface as [`StatgrabError::SchemaMismatch`].
#[instrument(skip(opts), fields(path = %path.display()))]
pub fn read_table(path: &Path, opts: &ExportOptions) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(opts.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let skip = usize::from(opts.write_index);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .skip(skip)
        .map(String::from)
        .collect();

    let mut rows: Vec<DataRow> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        rows.push(record.iter().skip(skip).map(String::from).collect());
    }

    debug!(columns = headers.len(), rows = rows.len(), "table read back");
    Table::new(headers, rows)
}

fn with_index(index: Option<usize>, fields: &[String], write_index: bool) -> Vec<String> {
    let mut record = Vec::with_capacity(fields.len() + 1);
    if write_index {
        record.push(index.map(|i| i.to_string()).unwrap_or_default());
    }
    record.extend(fields.iter().cloned());
    record
}

fn csv_error(path: &Path, err: csv::Error) -> StatgrabError {
    StatgrabError::io(path, err.into())
}
