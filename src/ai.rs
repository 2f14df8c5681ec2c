//! The external column-mapping service contract and response validation.
//!
//! The concrete vendor client lives outside this crate; everything here is
//! the stable boundary: the sanitized request shape, the response shape,
//! the [`ColumnMappingService`] trait the resolver consumes, and the
//! validation pass that turns a raw response into a trustworthy
//! [`ColumnMap`]. Validation is defensive on every axis the service could
//! get wrong: unknown field names, out-of-range column indices, duplicate
//! assignments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::AiError;
use crate::fields::{CanonicalField, resolve_field_name};
use crate::mapping::ColumnMap;
use crate::progress::CancelToken;
use crate::warnings::{self, Category, Warning};

/// Version tag embedded in request meta and reported in output meta.
pub const AI_PROMPT_VERSION: &str = "v2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiMode {
    Off,
    On,
    Skipped,
    Shadow,
}

impl AiMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AiMode::Off => "off",
            AiMode::On => "on",
            AiMode::Skipped => "skipped",
            AiMode::Shadow => "shadow",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MapColumnsRequest {
    pub headers: Vec<String>,
    pub sample_rows: Vec<Vec<String>>,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    pub source_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub canonical_name: String,
    pub source_header: String,
    pub column_index: i64,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub prompt_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapColumnsResponse {
    pub canonical_fields: Vec<FieldMapping>,
    #[serde(default)]
    pub extra_columns: Vec<String>,
    #[serde(default)]
    pub meta: ResponseMeta,
}

/// Capability of an external mapping service. `AiError::Unavailable` is the
/// sentinel for "circuit open / transport down".
pub trait ColumnMappingService: Send + Sync {
    fn map_columns(
        &self,
        cancel: &CancelToken,
        request: &MapColumnsRequest,
    ) -> Result<MapColumnsResponse, AiError>;

    fn mode(&self) -> AiMode;

    fn model(&self) -> String;
}

/// A validated AI mapping with its confidence bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct ValidatedMapping {
    pub column_map: ColumnMap,
    pub confidences: BTreeMap<CanonicalField, f64>,
    pub avg_confidence: f64,
}

impl ValidatedMapping {
    pub fn mapped_columns(&self) -> usize {
        self.column_map.len()
    }
}

/// Checks every mapping the service returned against the actual headers.
/// Alias spellings are coerced silently; everything else that cannot be
/// trusted is dropped with a warning.
pub fn validate_response(
    response: &MapColumnsResponse,
    headers: &[String],
    sink: &mut Vec<Warning>,
) -> ValidatedMapping {
    let mut validated = ValidatedMapping::default();
    let column_count = headers.len() as i64;

    for mapping in &response.canonical_fields {
        let Some(field) = resolve_field_name(&mapping.canonical_name) else {
            sink.push(Warning::info(
                warnings::MAPPING_AI_UNKNOWN_FIELD,
                Category::Mapping,
                format!(
                    "AI mapped '{}' to unknown field '{}'",
                    mapping.source_header, mapping.canonical_name
                ),
            ));
            continue;
        };

        if mapping.column_index < 0 || mapping.column_index >= column_count {
            sink.push(
                Warning::warn(
                    warnings::MAPPING_AI_INVALID_COLUMN,
                    Category::Mapping,
                    format!(
                        "AI mapped '{}' to out-of-range column {}",
                        field, mapping.column_index
                    ),
                )
                .with_details(serde_json::json!({
                    "field": field.as_str(),
                    "column_index": mapping.column_index,
                    "column_count": headers.len(),
                })),
            );
            continue;
        }
        let index = mapping.column_index as usize;

        if validated.column_map.contains_key(&field) {
            sink.push(Warning::warn(
                warnings::MAPPING_AI_DUPLICATE_FIELD,
                Category::Mapping,
                format!("AI mapped field '{field}' more than once; keeping the first assignment"),
            ));
            continue;
        }
        if validated.column_map.values().any(|&taken| taken == index) {
            sink.push(Warning::warn(
                warnings::MAPPING_AI_DUPLICATE_FIELD,
                Category::Mapping,
                format!(
                    "AI mapped column {index} ('{}') more than once; keeping the first assignment",
                    headers[index]
                ),
            ));
            continue;
        }

        validated.column_map.insert(field, index);
        validated
            .confidences
            .insert(field, mapping.confidence.clamp(0.0, 1.0));
    }

    if !validated.confidences.is_empty() {
        validated.avg_confidence = validated.confidences.values().sum::<f64>()
            / validated.confidences.len() as f64;
    }
    validated
}
