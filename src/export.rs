//! CSV export of a tab's visible columns.

use chrono::NaiveDate;
use serde_json::Value;
use std::path::Path;
use tracing::info;

use crate::columns::ROW_INDEX_COLUMN;
use crate::error::ExportError;
use crate::table::TableState;

/// Render every row of `state` as CSV: row index first, then the visible columns in
/// display order. Lines are separated by `\n`, without a trailing newline.
pub fn to_csv(state: &TableState) -> Result<String, ExportError> {
    if state.rows.is_empty() {
        return Err(ExportError::EmptyData);
    }
    let columns = state.display_columns();

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());
    writer.write_record(&columns)?;

    for (index, row) in state.flat_rows.iter().enumerate() {
        let record: Vec<String> = columns
            .iter()
            .map(|&column| {
                if column == ROW_INDEX_COLUMN {
                    (index + 1).to_string()
                } else {
                    cell_text(row.get(column))
                }
            })
            .collect();
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let mut text = String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Text of one cell: empty for missing or null, strings verbatim, everything else as JSON.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write the CSV for `state` to `path`, or to stdout when `path` is `-`.
pub fn write_csv(state: &TableState, path: &Path) -> Result<(), ExportError> {
    let text = to_csv(state)?;
    if path.as_os_str() == "-" {
        use std::io::Write;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
    } else {
        std::fs::write(path, text)?;
    }
    info!(rows = state.rows.len(), path = %path.display(), "exported CSV");
    Ok(())
}

/// Default file name for an export of the tab titled `title` on `date`.
pub fn export_file_name(title: &str, date: NaiveDate) -> String {
    let safe_title: String = title
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    format!("data_{}_{}.csv", safe_title, date.format("%Y-%m-%d"))
}
