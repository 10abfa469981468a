//! Test Helper Utilities
//!
//! Shared utilities for testing intent-batch

#![allow(dead_code)]

pub mod scripted_backend;

pub use scripted_backend::{BulkMode, ScriptedBackend};

use intent_batch::models::{BatchItem, ClassificationRequest};

/// Batch items for `texts`; empty strings become placeholders
pub fn items(texts: &[&str]) -> Vec<BatchItem> {
    texts
        .iter()
        .map(|text| match ClassificationRequest::new(*text) {
            Some(request) => BatchItem::Request(request),
            None => BatchItem::Placeholder {
                input_text: text.to_string(),
                reason: intent_batch::models::PlaceholderReason::EmptyText,
            },
        })
        .collect()
}
