//! Classification request/result value types

use serde::{Deserialize, Serialize};

/// Label stored when an item could not be classified
pub const NOT_AVAILABLE: &str = "N/A";

/// One unit of text submitted for classification
///
/// Construction rejects empty and whitespace-only text, so every request that
/// exists is worth dispatching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    text: String,
}

impl ClassificationRequest {
    /// Returns `None` for empty or whitespace-only text
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            None
        } else {
            Some(Self { text })
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Canonical classification outcome for one item
///
/// Every backend response shape is normalized into this type at the client
/// boundary. Fields are private so a result cannot change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    input_text: String,
    predicted_intent: String,
}

impl ClassificationResult {
    /// Result carrying `label`; a blank label degrades to N/A
    pub fn labelled(input_text: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        let predicted_intent = if label.trim().is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            label
        };
        Self {
            input_text: input_text.into(),
            predicted_intent,
        }
    }

    pub fn not_available(input_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            predicted_intent: NOT_AVAILABLE.to_string(),
        }
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn predicted_intent(&self) -> &str {
        &self.predicted_intent
    }

    /// `false` when the result is the N/A placeholder
    pub fn is_labelled(&self) -> bool {
        self.predicted_intent != NOT_AVAILABLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_blank_text() {
        assert!(ClassificationRequest::new("").is_none());
        assert!(ClassificationRequest::new("  \t\n").is_none());
        assert_eq!(
            ClassificationRequest::new(" refund please ").unwrap().text(),
            " refund please "
        );
    }

    #[test]
    fn test_blank_label_becomes_not_available() {
        let result = ClassificationResult::labelled("thanks", "  ");
        assert_eq!(result.predicted_intent(), NOT_AVAILABLE);
        assert!(!result.is_labelled());
    }

    #[test]
    fn test_serializes_camel_case() {
        let result = ClassificationResult::labelled("where is my order", "Order Inquiry");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["inputText"], "where is my order");
        assert_eq!(json["predictedIntent"], "Order Inquiry");
    }
}
