#![allow(dead_code)]

use std::sync::Mutex;

use mdspec::ai::{
    AiMode, ColumnMappingService, FieldMapping, MapColumnsRequest, MapColumnsResponse,
};
use mdspec::error::AiError;
use mdspec::progress::CancelToken;

/// Scripted mapping service: returns the same scripted result on every
/// call, recording each request for inspection.
pub struct MockMappingService {
    script: Result<MapColumnsResponse, AiError>,
    requests: Mutex<Vec<MapColumnsRequest>>,
}

impl MockMappingService {
    pub fn with_response(response: MapColumnsResponse) -> Self {
        Self {
            script: Ok(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_error(error: AiError) -> Self {
        Self {
            script: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("request log").len()
    }

    pub fn last_request(&self) -> Option<MapColumnsRequest> {
        self.requests.lock().expect("request log").last().cloned()
    }
}

impl ColumnMappingService for MockMappingService {
    fn map_columns(
        &self,
        _cancel: &CancelToken,
        request: &MapColumnsRequest,
    ) -> Result<MapColumnsResponse, AiError> {
        self.requests
            .lock()
            .expect("request log")
            .push(request.clone());
        self.script.clone()
    }

    fn mode(&self) -> AiMode {
        AiMode::On
    }

    fn model(&self) -> String {
        "mock-mapper".to_string()
    }
}

/// Builds a response mapping `(canonical_name, column_index, confidence)`
/// triples.
pub fn mapping_response(fields: &[(&str, i64, f64)]) -> MapColumnsResponse {
    MapColumnsResponse {
        canonical_fields: fields
            .iter()
            .map(|&(name, index, confidence)| FieldMapping {
                canonical_name: name.to_string(),
                source_header: format!("column {index}"),
                column_index: index,
                confidence,
                reasoning: None,
            })
            .collect(),
        ..MapColumnsResponse::default()
    }
}
