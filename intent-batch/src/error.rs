//! Error types for intent-batch
//!
//! Each service has its own error enum; [`AppError`] aggregates them at the
//! operation boundary and decides what the user sees.

use crate::models::{BatchJobError, View};
use crate::services::csv_export::ExportError;
use crate::services::file_ingestor::IngestError;
use crate::types::ClassifyError;
use thiserror::Error;

/// Warning shown when a protected view is entered without a session
pub const SIGN_IN_WARNING: &str = "You need to sign in to access this page.";

/// Operation-level error
#[derive(Debug, Error)]
pub enum AppError {
    /// Upload rejected or unparseable (batch-fatal)
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Single-query classification failed
    #[error(transparent)]
    Classification(#[from] ClassifyError),

    /// Protected view entered without a session
    #[error("Sign-in required for {0}")]
    AuthRequired(View),

    /// Batch aborted by the user
    #[error("Batch cancelled")]
    Cancelled,

    /// Results could not be exported
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Batch job driven through an invalid transition
    #[error("Batch job error: {0}")]
    Job(#[from] BatchJobError),

    /// Configuration unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// intent-common error
    #[error("Common error: {0}")]
    Common(#[from] intent_common::Error),
}

impl AppError {
    /// Stable code for logs and scripted callers
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Ingest(IngestError::InvalidFileType(_)) => "INVALID_FILE_TYPE",
            AppError::Ingest(IngestError::FileTooLarge { .. }) => "FILE_TOO_LARGE",
            AppError::Ingest(IngestError::ParseError(_)) => "PARSE_ERROR",
            AppError::Ingest(IngestError::Io(_)) => "IO_ERROR",
            AppError::Classification(ClassifyError::Timeout(_)) => "CLASSIFICATION_TIMEOUT",
            AppError::Classification(_) => "CLASSIFICATION_ERROR",
            AppError::AuthRequired(_) => "AUTH_REQUIRED",
            AppError::Cancelled => "CANCELLED",
            AppError::Export(_) => "EXPORT_ERROR",
            AppError::Job(_) => "INTERNAL_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Common(_) => "COMMON_ERROR",
        }
    }

    /// Human-readable message for the user
    pub fn user_message(&self) -> String {
        match self {
            AppError::Ingest(IngestError::InvalidFileType(_)) => {
                "Invalid file type. Please upload a CSV, JSON, or TXT file.".to_string()
            }
            AppError::Ingest(IngestError::FileTooLarge { limit, .. }) => format!(
                "File size exceeds {}. Please upload a smaller file.",
                format_size(*limit)
            ),
            AppError::Ingest(IngestError::ParseError(_)) => {
                "Error parsing the CSV file. Please check the file format.".to_string()
            }
            AppError::Ingest(IngestError::Io(e)) => format!("Could not read the file: {}", e),
            AppError::Classification(ClassifyError::Timeout(_)) => {
                "The classifier did not answer in time. Please try again.".to_string()
            }
            AppError::Classification(e) => format!("Error fetching prediction: {}", e),
            AppError::AuthRequired(_) => SIGN_IN_WARNING.to_string(),
            AppError::Cancelled => "Processing cancelled. No results were saved.".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether retrying the whole operation is worth offering
    pub fn is_retryable(&self) -> bool {
        match self {
            // The user can pick another file
            AppError::Ingest(_) => true,
            AppError::Classification(e) => e.is_transient(),
            AppError::AuthRequired(_) => false,
            AppError::Cancelled => true,
            AppError::Export(_) => true,
            AppError::Job(_) | AppError::Config(_) => false,
            AppError::Common(_) => false,
        }
    }
}

/// `5 MB` for whole mebibytes, bytes otherwise
fn format_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Result type for operations
pub type AppResult<T> = Result<T, AppError>;
