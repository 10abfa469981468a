//! Services

pub mod batch_orchestrator;
pub mod classifier_client;
pub mod csv_export;
pub mod file_ingestor;
pub mod predict_api_client;
pub mod result_store;
pub mod session_gate;
pub mod zero_shot_client;

pub use batch_orchestrator::BatchOrchestrator;
pub use classifier_client::{ClassifierClient, RetryPolicy};
pub use csv_export::{export_csv, read_export, ExportError};
pub use file_ingestor::{FileIngestor, FileKind, IngestError, UploadFile};
pub use predict_api_client::PredictApiClient;
pub use result_store::{IntentCount, ResultStore};
pub use session_gate::{Navigation, SessionGate};
pub use zero_shot_client::ZeroShotClient;
