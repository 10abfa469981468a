//! Data models

pub mod batch_job;
pub mod classification;
pub mod session;

pub use batch_job::{BatchItem, BatchJob, BatchJobError, BatchStatus, PlaceholderReason};
pub use classification::{ClassificationRequest, ClassificationResult, NOT_AVAILABLE};
pub use session::{Session, View};
