//! CSV export of classification results
//!
//! Two columns, `Query` and `Predicted Intent`, one row per result in
//! result order. Fields containing commas, quotes or newlines are quoted.

use crate::models::ClassificationResult;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::info;

/// Export header row
pub const EXPORT_HEADERS: [&str; 2] = ["Query", "Predicted Intent"];

/// Default download name
pub const DEFAULT_EXPORT_FILE: &str = "classification_results.csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export is not valid UTF-8")]
    Encoding,

    /// Re-read file does not have the export layout
    #[error("Unexpected export layout: {0}")]
    Layout(String),
}

/// Write `results` as CSV to `writer`
pub fn export_csv<W: Write>(results: &[ClassificationResult], writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);

    csv_writer.write_record(EXPORT_HEADERS)?;
    for result in results {
        csv_writer.write_record([result.input_text(), result.predicted_intent()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_to_string(results: &[ClassificationResult]) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    export_csv(results, &mut buffer)?;
    String::from_utf8(buffer).map_err(|_| ExportError::Encoding)
}

/// Write the export to `path`, replacing any existing file
pub async fn export_to_path(
    results: &[ClassificationResult],
    path: &Path,
) -> Result<(), ExportError> {
    let content = export_to_string(results)?;
    let temp_path = path.with_extension("csv.tmp");
    fs::write(&temp_path, content).await?;
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    info!(path = %path.display(), rows = results.len(), "Results exported");
    Ok(())
}

/// Parse an export back into results
pub fn read_export(content: &str) -> Result<Vec<ClassificationResult>, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?;
    if headers.iter().ne(EXPORT_HEADERS) {
        return Err(ExportError::Layout(format!(
            "expected header {:?}, found {:?}",
            EXPORT_HEADERS,
            headers.iter().collect::<Vec<_>>()
        )));
    }

    reader
        .records()
        .map(|record| {
            let record = record?;
            match (record.get(0), record.get(1)) {
                (Some(query), Some(intent)) => Ok(ClassificationResult::labelled(query, intent)),
                _ => Err(ExportError::Layout(format!(
                    "row with {} fields",
                    record.len()
                ))),
            }
        })
        .collect()
}
