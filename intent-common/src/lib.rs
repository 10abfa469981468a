//! # intent-common
//!
//! Shared code for the intent classification client:
//! - Error types
//! - TOML configuration loading and root folder resolution
//! - Batch lifecycle events (EventBus)
//! - Persisted key/value client state (local storage)

pub mod config;
pub mod error;
pub mod events;
pub mod storage;

pub use error::{Error, Result};
