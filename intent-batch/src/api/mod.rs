//! Operations behind each view
//!
//! Every operation takes the shared [`AppState`](crate::AppState) and
//! enforces the session gate for its view before doing anything else.

pub mod query;
pub mod results;
pub mod session;
pub mod upload;

pub use query::{last_query, submit_query};
pub use results::{export_results, intent_distribution, results_snapshot};
pub use session::{login, logout, navigate, session_status};
pub use upload::{cancel_batch, upload_dataset};
