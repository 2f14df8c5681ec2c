//! Warning model and the warning-code catalog.
//!
//! Warnings are the non-fatal channel of the conversion pipeline: parsing
//! repairs, low-confidence detections, AI degradations, and render fallbacks
//! all surface here instead of aborting the conversion. Warnings are
//! append-only and preserve chronological order.

use serde::Serialize;
use serde_json::Value;

pub const INPUT_EMPTY: &str = "INPUT_EMPTY";
pub const HEADER_LOW_CONFIDENCE: &str = "HEADER_LOW_CONFIDENCE";
pub const MAPPING_AI_FAILED: &str = "MAPPING_AI_FAILED";
pub const MAPPING_AI_LOW_CONFIDENCE: &str = "MAPPING_AI_LOW_CONFIDENCE";
pub const MAPPING_AI_UNKNOWN_FIELD: &str = "MAPPING_AI_UNKNOWN_FIELD";
pub const MAPPING_AI_INVALID_COLUMN: &str = "MAPPING_AI_INVALID_COLUMN";
pub const MAPPING_AI_DUPLICATE_FIELD: &str = "MAPPING_AI_DUPLICATE_FIELD";
pub const MAPPING_DYNAMIC_INFERENCE: &str = "MAPPING_DYNAMIC_INFERENCE";
pub const MAPPING_LOW_CONFIDENCE_TABLE_FALLBACK: &str = "MAPPING_LOW_CONFIDENCE_TABLE_FALLBACK";
pub const MAPPING_UNMAPPED_COLUMNS: &str = "MAPPING_UNMAPPED_COLUMNS";
pub const AI_UNAVAILABLE: &str = "AI_UNAVAILABLE";
pub const RENDER_WARNING: &str = "RENDER_WARNING";
pub const PARSING_WARNING: &str = "PARSING_WARNING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Input,
    Detect,
    Header,
    Mapping,
    Rows,
    Render,
}

#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub code: &'static str,
    pub severity: Severity,
    pub category: Category,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Warning {
    pub fn new(
        code: &'static str,
        severity: Severity,
        category: Category,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity,
            category,
            message: message.into(),
            hint: None,
            details: None,
        }
    }

    pub fn info(code: &'static str, category: Category, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Info, category, message)
    }

    pub fn warn(code: &'static str, category: Category, message: impl Into<String>) -> Self {
        Self::new(code, Severity::Warn, category, message)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn warning_serializes_lowercase_severity_and_category() {
        let warning = Warning::warn(HEADER_LOW_CONFIDENCE, Category::Header, "low confidence")
            .with_hint("check the first rows of the sheet")
            .with_details(json!({ "confidence": 35 }));
        let rendered = serde_json::to_value(&warning).expect("serialize warning");
        assert_eq!(rendered["code"], "HEADER_LOW_CONFIDENCE");
        assert_eq!(rendered["severity"], "warn");
        assert_eq!(rendered["category"], "header");
        assert_eq!(rendered["details"]["confidence"], 35);
    }

    #[test]
    fn optional_fields_are_omitted_when_unset() {
        let warning = Warning::info(MAPPING_DYNAMIC_INFERENCE, Category::Mapping, "inferred");
        let rendered = serde_json::to_value(&warning).expect("serialize warning");
        assert!(rendered.get("hint").is_none());
        assert!(rendered.get("details").is_none());
    }
}
