//! Dataset file ingestion
//!
//! Validates an uploaded file (type and size, before reading) and turns its
//! contents into batch items aligned with the source rows.
//!
//! - CSV and plain text are parsed as CSV; the first row is the header and a
//!   `text` column is required.
//! - JSON must be an array of strings or of objects with a `text` field.
//!
//! Structural problems (unknown type, oversize, undecodable file, missing
//! `text` column) reject the whole file. Problems confined to one row only
//! turn that row into an N/A placeholder.

use crate::models::{BatchItem, ClassificationRequest, PlaceholderReason};
use intent_common::config::DEFAULT_MAX_UPLOAD_BYTES;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Column holding the text to classify
pub const TEXT_COLUMN: &str = "text";

/// File ingestion errors; every variant rejects the whole file
#[derive(Debug, Error)]
pub enum IngestError {
    /// Declared MIME type is not CSV, JSON or plain text
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    /// File exceeds the upload ceiling
    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    /// File content is structurally invalid
    #[error("Parse error: {0}")]
    ParseError(String),

    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Accepted upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Json,
    PlainText,
}

impl FileKind {
    /// Map a MIME type (parameters such as `charset` are ignored)
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "text/csv" => Some(FileKind::Csv),
            "application/json" => Some(FileKind::Json),
            "text/plain" => Some(FileKind::PlainText),
            _ => None,
        }
    }
}

/// A user-supplied file plus its declared MIME type
#[derive(Debug, Clone)]
pub struct UploadFile {
    path: PathBuf,
    mime: Option<String>,
}

impl UploadFile {
    /// File whose MIME type is guessed from its extension
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mime: None,
        }
    }

    /// File with an explicitly declared MIME type
    pub fn with_mime(path: impl Into<PathBuf>, mime: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime: Some(mime.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Declared MIME type, or the one guessed from the extension
    pub fn mime(&self) -> String {
        match &self.mime {
            Some(mime) => mime.clone(),
            None => mime_guess::from_path(&self.path)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Validates and parses uploaded dataset files
#[derive(Debug, Clone)]
pub struct FileIngestor {
    max_bytes: u64,
}

impl FileIngestor {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check type and size without reading the content
    pub async fn validate(&self, file: &UploadFile) -> Result<FileKind, IngestError> {
        let mime = file.mime();
        let kind = FileKind::from_mime(&mime).ok_or(IngestError::InvalidFileType(mime))?;

        let size = tokio::fs::metadata(file.path()).await?.len();
        self.check_size(size)?;

        Ok(kind)
    }

    /// Size check; the limit itself is accepted
    pub fn check_size(&self, size: u64) -> Result<(), IngestError> {
        if size > self.max_bytes {
            return Err(IngestError::FileTooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Validate, read and parse `file`
    pub async fn ingest(&self, file: &UploadFile) -> Result<Vec<BatchItem>, IngestError> {
        let kind = self.validate(file).await?;
        let bytes = tokio::fs::read(file.path()).await?;
        // The file may have grown between the metadata check and the read
        self.check_size(bytes.len() as u64)?;

        let items = parse_items(kind, &bytes)?;
        info!(
            file = %file.file_name(),
            kind = ?kind,
            rows = items.len(),
            placeholders = items.iter().filter(|i| i.is_placeholder()).count(),
            "Dataset ingested"
        );
        Ok(items)
    }
}

impl Default for FileIngestor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}

/// Parse raw file content of the given kind into batch items
pub fn parse_items(kind: FileKind, bytes: &[u8]) -> Result<Vec<BatchItem>, IngestError> {
    let items = match kind {
        FileKind::Csv | FileKind::PlainText => parse_csv(bytes)?,
        FileKind::Json => parse_json(bytes)?,
    };

    if items.is_empty() {
        return Err(IngestError::ParseError(
            "file contains no data rows".to_string(),
        ));
    }
    Ok(items)
}

/// Parse CSV with a header row and a `text` column
///
/// The header must be UTF-8. A row whose `text` field is not UTF-8 becomes
/// an N/A placeholder; the rest of the file is still classified.
pub fn parse_csv(bytes: &[u8]) -> Result<Vec<BatchItem>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| IngestError::ParseError(format!("unreadable header row: {}", e)))?
        .clone();

    let text_index = headers
        .iter()
        .position(|h| h.trim() == TEXT_COLUMN)
        .ok_or_else(|| {
            IngestError::ParseError(format!("missing required \"{}\" column", TEXT_COLUMN))
        })?;

    let mut items = Vec::new();
    for (row, record) in reader.byte_records().enumerate() {
        let record =
            record.map_err(|e| IngestError::ParseError(format!("row {}: {}", row + 1, e)))?;
        let field = record.get(text_index).unwrap_or_default();
        let item = match std::str::from_utf8(field) {
            Ok(text) => text_item(text),
            Err(e) => {
                warn!(row = row + 1, error = %e, "CSV row is not valid UTF-8, keeping N/A placeholder");
                BatchItem::Placeholder {
                    input_text: String::from_utf8_lossy(field).into_owned(),
                    reason: PlaceholderReason::UnreadableRow(e.to_string()),
                }
            }
        };
        items.push(item);
    }

    debug!(rows = items.len(), "CSV parsed");
    Ok(items)
}

/// Parse a JSON array of strings or `{ "text": ... }` objects
pub fn parse_json(bytes: &[u8]) -> Result<Vec<BatchItem>, IngestError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| IngestError::ParseError(format!("invalid JSON: {}", e)))?;

    let Value::Array(elements) = value else {
        return Err(IngestError::ParseError(
            "JSON upload must be an array".to_string(),
        ));
    };

    let items = elements
        .into_iter()
        .enumerate()
        .map(|(row, element)| match element {
            Value::String(text) => text_item(&text),
            Value::Object(mut object) => match object.remove(TEXT_COLUMN) {
                Some(Value::String(text)) => text_item(&text),
                None | Some(Value::Null) => text_item(""),
                Some(other) => unreadable(row, format!("\"text\" is not a string: {}", other)),
            },
            other => unreadable(row, format!("unsupported element: {}", other)),
        })
        .collect();

    Ok(items)
}

fn text_item(text: &str) -> BatchItem {
    match ClassificationRequest::new(text) {
        Some(request) => BatchItem::Request(request),
        None => BatchItem::Placeholder {
            input_text: text.to_string(),
            reason: PlaceholderReason::EmptyText,
        },
    }
}

fn unreadable(row: usize, reason: String) -> BatchItem {
    warn!(row = row + 1, reason = %reason, "Unreadable JSON element, keeping N/A placeholder");
    BatchItem::Placeholder {
        input_text: String::new(),
        reason: PlaceholderReason::UnreadableRow(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn texts(items: &[BatchItem]) -> Vec<&str> {
        items.iter().map(|i| i.input_text()).collect()
    }

    #[test]
    fn test_mime_mapping() {
        assert_eq!(FileKind::from_mime("text/csv"), Some(FileKind::Csv));
        assert_eq!(FileKind::from_mime("text/csv; charset=utf-8"), Some(FileKind::Csv));
        assert_eq!(FileKind::from_mime("Application/JSON"), Some(FileKind::Json));
        assert_eq!(FileKind::from_mime("text/plain"), Some(FileKind::PlainText));
        assert_eq!(FileKind::from_mime("application/pdf"), None);
        assert_eq!(FileKind::from_mime(""), None);
    }

    #[test]
    fn test_mime_guessed_from_extension() {
        assert_eq!(UploadFile::new("comments.csv").mime(), "text/csv");
        assert_eq!(UploadFile::new("comments.json").mime(), "application/json");
        assert_eq!(UploadFile::new("comments.txt").mime(), "text/plain");
        assert_eq!(UploadFile::with_mime("x.bin", "text/csv").mime(), "text/csv");
    }

    #[test]
    fn test_csv_text_column_extracted_in_order() {
        let csv = "id,text\n1,refund please\n2,where is my order\n3,thanks\n";
        let items = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(texts(&items), vec!["refund please", "where is my order", "thanks"]);
        assert!(items.iter().all(|i| !i.is_placeholder()));
    }

    #[test]
    fn test_csv_empty_text_keeps_placeholder() {
        let csv = "text,other\nhello,a\n,b\nbye,c\n";
        let items = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(
            items[1],
            BatchItem::Placeholder {
                input_text: String::new(),
                reason: PlaceholderReason::EmptyText,
            }
        );
    }

    #[test]
    fn test_csv_short_row_is_placeholder_not_error() {
        let csv = "id,text\n1,hello\n2\n3,bye\n";
        let items = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items[1].is_placeholder());
        assert_eq!(items[2].input_text(), "bye");
    }

    #[test]
    fn test_csv_quoted_fields() {
        let csv = "text\n\"late, and \"\"broken\"\"\"\n\"multi\nline\"\n";
        let items = parse_csv(csv.as_bytes()).unwrap();
        assert_eq!(texts(&items), vec!["late, and \"broken\"", "multi\nline"]);
    }

    #[test]
    fn test_csv_missing_text_column_is_fatal() {
        let err = parse_csv(b"comment\nhello\n").unwrap_err();
        assert!(matches!(err, IngestError::ParseError(_)));
    }

    #[test]
    fn test_csv_invalid_utf8_header_is_fatal() {
        let err = parse_csv(&[0xff, 0xfe, b'\n', b'h', b'i', b'\n']).unwrap_err();
        assert!(matches!(err, IngestError::ParseError(_)));
    }

    #[test]
    fn test_csv_invalid_utf8_row_is_placeholder() {
        let mut csv = b"id,text\n1,hello\n2,".to_vec();
        csv.extend_from_slice(&[0xff, 0xfe]);
        csv.extend_from_slice(b"\n3,bye\n");

        let items = parse_csv(&csv).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].input_text(), "hello");
        assert!(matches!(
            &items[1],
            BatchItem::Placeholder { reason: PlaceholderReason::UnreadableRow(_), .. }
        ));
        assert_eq!(items[2].input_text(), "bye");
    }

    #[test]
    fn test_header_only_file_rejected() {
        let err = parse_items(FileKind::Csv, b"text\n").unwrap_err();
        assert!(matches!(err, IngestError::ParseError(_)));
    }

    #[test]
    fn test_plain_text_parsed_as_csv() {
        let items = parse_items(FileKind::PlainText, b"text\nhello\n").unwrap();
        assert_eq!(texts(&items), vec!["hello"]);
    }

    #[test]
    fn test_json_shapes() {
        let json = r#"["refund please", {"text": "thanks"}, {"text": ""}, {"id": 4}, 42]"#;
        let items = parse_json(json.as_bytes()).unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(items[0].input_text(), "refund please");
        assert_eq!(items[1].input_text(), "thanks");
        assert!(items[2].is_placeholder());
        assert!(items[3].is_placeholder());
        assert!(matches!(
            items[4],
            BatchItem::Placeholder { reason: PlaceholderReason::UnreadableRow(_), .. }
        ));
    }

    #[test]
    fn test_json_non_array_rejected() {
        assert!(matches!(
            parse_json(br#"{"text": "hi"}"#),
            Err(IngestError::ParseError(_))
        ));
        assert!(matches!(parse_json(b"not json"), Err(IngestError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_invalid_type_rejected_before_read() {
        let ingestor = FileIngestor::default();
        // Path does not exist: the type check must fail first
        let file = UploadFile::with_mime("/definitely/missing.pdf", "application/pdf");
        assert!(matches!(
            ingestor.ingest(&file).await,
            Err(IngestError::InvalidFileType(_))
        ));
    }

    #[tokio::test]
    async fn test_size_boundary() {
        let dir = TempDir::new().unwrap();
        let ingestor = FileIngestor::new(16);

        let at_limit = dir.path().join("at_limit.csv");
        std::fs::write(&at_limit, b"text\nabcdefghij\n").unwrap();
        assert_eq!(std::fs::metadata(&at_limit).unwrap().len(), 16);
        assert_eq!(
            ingestor.validate(&UploadFile::new(&at_limit)).await.unwrap(),
            FileKind::Csv
        );

        let over = dir.path().join("over.csv");
        std::fs::write(&over, b"text\nabcdefghijk\n").unwrap();
        assert!(matches!(
            ingestor.validate(&UploadFile::new(&over)).await,
            Err(IngestError::FileTooLarge { size: 17, limit: 16 })
        ));
    }
}
