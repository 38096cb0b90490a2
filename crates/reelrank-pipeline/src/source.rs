//! Creator list loading from a CSV file or a spreadsheet workbook.
//!
//! Only the configured link column is read. Row order is preserved, cells
//! are trimmed, and empty cells are dropped.

use std::path::Path;

use calamine::{open_workbook_auto, Reader};

use reelrank_core::CreatorRef;

use crate::error::SourceError;

/// Load creator references from the `column` of the table at `path`.
///
/// The format is chosen by extension: `.csv` is read as delimited text,
/// `.xlsx`, `.xlsm`, `.xlsb`, `.xls` and `.ods` as a workbook (first sheet).
/// The header row is matched case-insensitively.
///
/// # Errors
///
/// Returns [`SourceError`] when the file is missing, has an unsupported
/// extension, cannot be parsed, or lacks the column.
pub fn read_creators(path: &Path, column: &str) -> Result<Vec<CreatorRef>, SourceError> {
    if !path.is_file() {
        return Err(SourceError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let creators = match extension.as_str() {
        "csv" => read_csv(path, column)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path, column)?,
        _ => {
            return Err(SourceError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            })
        }
    };

    tracing::info!(
        path = %path.display(),
        column,
        creators = creators.len(),
        "creator list loaded"
    );
    Ok(creators)
}

fn header_matches(cell: &str, column: &str) -> bool {
    cell.trim_start_matches('\u{feff}')
        .trim()
        .eq_ignore_ascii_case(column.trim())
}

fn read_error(path: &Path, reason: impl ToString) -> SourceError {
    SourceError::Read {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn missing_column(path: &Path, column: &str) -> SourceError {
    SourceError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    }
}

fn read_csv(path: &Path, column: &str) -> Result<Vec<CreatorRef>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| read_error(path, e))?;

    let index = reader
        .headers()
        .map_err(|e| read_error(path, e))?
        .iter()
        .position(|h| header_matches(h, column))
        .ok_or_else(|| missing_column(path, column))?;

    let mut creators = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| read_error(path, e))?;
        if let Some(cell) = record.get(index).map(str::trim) {
            if !cell.is_empty() {
                creators.push(CreatorRef::new(cell));
            }
        }
    }
    Ok(creators)
}

fn read_workbook(path: &Path, column: &str) -> Result<Vec<CreatorRef>, SourceError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| read_error(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| read_error(path, "workbook has no sheets"))?
        .map_err(|e| read_error(path, e))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| missing_column(path, column))?;
    let index = header
        .iter()
        .position(|cell| header_matches(&cell.to_string(), column))
        .ok_or_else(|| missing_column(path, column))?;

    let creators = rows
        .filter_map(|row| row.get(index))
        .map(|cell| cell.to_string().trim().to_string())
        .filter(|cell| !cell.is_empty())
        .map(CreatorRef::from)
        .collect();
    Ok(creators)
}
