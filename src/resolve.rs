//! The layered mapping decision: heuristic baseline, optional AI mapping,
//! confidence thresholds, and degradation bookkeeping.
//!
//! Policy, in order: the `table` format and preview (`skip_ai`) paths never
//! call the service; without a wired service the heuristic stands alone;
//! otherwise the AI result is validated and quality-gated (average
//! confidence ≥ 0.75 *and* mapped ratio ≥ 0.60), degrading to the heuristic
//! mapping when either bar is missed. Dynamic inference runs over whichever
//! mapping wins to fill remaining gaps.
//!
//! The AI bookkeeping ([`AiMappingMeta`]) is a reporting vector independent
//! of the mapping decision: a degraded conversion still reports what the
//! service answered.

use log::{debug, warn};
use serde_json::json;

use crate::ai::{AiMode, ColumnMappingService, MapColumnsRequest, validate_response};
use crate::error::{AiError, ConvertError};
use crate::mapping::{HeuristicMapper, MappingOutcome, infer_dynamic};
use crate::model::OutputFormat;
use crate::progress::CancelToken;
use crate::sanitize::sanitize_sheet;
use crate::warnings::{self, Category, Warning};

pub const MIN_AVG_CONFIDENCE: f64 = 0.75;
pub const MIN_MAPPED_RATIO: f64 = 0.60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    None,
    AiUnavailable,
    AiLowConfidence,
    AiFailed,
}

impl FallbackReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FallbackReason::None => "",
            FallbackReason::AiUnavailable => "ai_unavailable",
            FallbackReason::AiLowConfidence => "ai_low_confidence",
            FallbackReason::AiFailed => "ai_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiMappingMeta {
    pub mode: AiMode,
    pub used: bool,
    pub degraded: bool,
    pub avg_confidence: f64,
    pub mapped_columns: usize,
    pub unmapped_columns: usize,
    pub fallback_reason: FallbackReason,
}

impl Default for AiMappingMeta {
    fn default() -> Self {
        Self {
            mode: AiMode::Off,
            used: false,
            degraded: false,
            avg_confidence: 0.0,
            mapped_columns: 0,
            unmapped_columns: 0,
            fallback_reason: FallbackReason::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedMapping {
    pub outcome: MappingOutcome,
    pub ai: AiMappingMeta,
}

/// Inputs the resolver needs beyond the sheet itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions<'a> {
    pub format: OutputFormat,
    pub skip_ai: bool,
    pub file_type: Option<&'a str>,
}

/// Candidate shape for the preference rule: non-degraded beats degraded,
/// then more mapped columns, then higher average confidence.
#[derive(Debug, Clone, Copy)]
pub struct MappingCandidate {
    pub degraded: bool,
    pub mapped_columns: usize,
    pub avg_confidence: f64,
}

pub fn prefer_first(a: &MappingCandidate, b: &MappingCandidate) -> bool {
    (!a.degraded, a.mapped_columns, a.avg_confidence)
        > (!b.degraded, b.mapped_columns, b.avg_confidence)
}

pub fn resolve_mapping(
    service: Option<&dyn ColumnMappingService>,
    cancel: &CancelToken,
    headers: &[String],
    data_rows: &[Vec<String>],
    options: ResolveOptions<'_>,
    sink: &mut Vec<Warning>,
) -> Result<ResolvedMapping, ConvertError> {
    let mut chosen = HeuristicMapper.synonym_pass(headers);
    let mut ai = AiMappingMeta::default();

    if options.format == OutputFormat::Table {
        ai.mode = AiMode::Off;
    } else if options.skip_ai {
        ai.mode = AiMode::Skipped;
    } else if let Some(service) = service {
        ai.mode = AiMode::On;
        cancel.ensure_active()?;
        attempt_ai_mapping(service, cancel, headers, data_rows, options, &mut chosen, &mut ai, sink)?;
    }

    let inferred = infer_dynamic(&mut chosen.column_map, headers, data_rows);
    if inferred > 0 {
        sink.push(
            Warning::info(
                warnings::MAPPING_DYNAMIC_INFERENCE,
                Category::Mapping,
                format!("{inferred} column(s) mapped by dynamic inference over sample values"),
            )
            .with_details(json!({ "count": inferred })),
        );
    }
    chosen.recompute_unmapped(headers.len());

    Ok(ResolvedMapping { outcome: chosen, ai })
}

#[allow(clippy::too_many_arguments)]
fn attempt_ai_mapping(
    service: &dyn ColumnMappingService,
    cancel: &CancelToken,
    headers: &[String],
    data_rows: &[Vec<String>],
    options: ResolveOptions<'_>,
    chosen: &mut MappingOutcome,
    ai: &mut AiMappingMeta,
    sink: &mut Vec<Warning>,
) -> Result<(), ConvertError> {
    let sheet = sanitize_sheet(headers, data_rows);
    let request = MapColumnsRequest {
        headers: sheet.headers,
        sample_rows: sheet.sample_rows,
        format: options.format.as_str().to_string(),
        file_type: options.file_type.map(str::to_string),
        source_lang: sheet.source_lang.as_str().to_string(),
        schema_hint: sheet.schema_hint.map(|hint| hint.as_str().to_string()),
    };

    let response = match service.map_columns(cancel, &request) {
        Ok(response) => response,
        Err(AiError::Cancelled) => return Err(ConvertError::Cancelled),
        Err(AiError::Unavailable) => {
            warn!("AI mapping unavailable; using heuristic mapping");
            sink.push(
                Warning::warn(
                    warnings::AI_UNAVAILABLE,
                    Category::Mapping,
                    "AI mapping service is unavailable; heuristic mapping was used",
                )
                .with_hint("retry later or continue with the heuristic mapping"),
            );
            ai.degraded = true;
            ai.fallback_reason = FallbackReason::AiUnavailable;
            return Ok(());
        }
        Err(err) => {
            warn!("AI mapping failed: {err}");
            sink.push(
                Warning::warn(
                    warnings::MAPPING_AI_FAILED,
                    Category::Mapping,
                    format!("AI mapping failed ({err}); heuristic mapping was used"),
                )
                .with_hint("check the mapping service credentials and connectivity"),
            );
            ai.degraded = true;
            ai.fallback_reason = FallbackReason::AiFailed;
            return Ok(());
        }
    };

    ai.used = true;
    let validated = validate_response(&response, headers, sink);
    ai.avg_confidence = validated.avg_confidence;
    ai.mapped_columns = validated.mapped_columns();
    ai.unmapped_columns = headers.len().saturating_sub(validated.mapped_columns());

    let mapped_ratio = validated.mapped_columns() as f64 / headers.len().max(1) as f64;
    if validated.avg_confidence >= MIN_AVG_CONFIDENCE && mapped_ratio >= MIN_MAPPED_RATIO {
        let ai_candidate = MappingCandidate {
            degraded: false,
            mapped_columns: validated.mapped_columns(),
            avg_confidence: validated.avg_confidence,
        };
        let heuristic_candidate = MappingCandidate {
            degraded: false,
            mapped_columns: chosen.column_map.len(),
            avg_confidence: 0.0,
        };
        if prefer_first(&ai_candidate, &heuristic_candidate) {
            debug!(
                "AI mapping accepted: {} column(s), avg confidence {:.2}",
                validated.mapped_columns(),
                validated.avg_confidence
            );
            chosen.column_map = validated.column_map;
            chosen.recompute_unmapped(headers.len());
        }
    } else {
        sink.push(
            Warning::warn(
                warnings::MAPPING_AI_LOW_CONFIDENCE,
                Category::Mapping,
                format!(
                    "AI mapping confidence too low (avg {:.2}, mapped ratio {:.2}); heuristic mapping was used",
                    validated.avg_confidence, mapped_ratio
                ),
            )
            .with_hint("give the sheet clearer headers or map columns manually")
            .with_details(json!({
                "avg_confidence": validated.avg_confidence,
                "mapped_ratio": mapped_ratio,
                "min_avg_confidence": MIN_AVG_CONFIDENCE,
                "min_mapped_ratio": MIN_MAPPED_RATIO,
            })),
        );
        ai.degraded = true;
        ai.fallback_reason = FallbackReason::AiLowConfidence;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{FieldMapping, MapColumnsResponse};
    use std::sync::Mutex;

    struct ScriptedService {
        result: Mutex<Option<Result<MapColumnsResponse, AiError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedService {
        fn new(result: Result<MapColumnsResponse, AiError>) -> Self {
            Self {
                result: Mutex::new(Some(result)),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().expect("call counter")
        }
    }

    impl ColumnMappingService for ScriptedService {
        fn map_columns(
            &self,
            _cancel: &CancelToken,
            _request: &MapColumnsRequest,
        ) -> Result<MapColumnsResponse, AiError> {
            *self.calls.lock().expect("call counter") += 1;
            self.result
                .lock()
                .expect("scripted result")
                .take()
                .unwrap_or(Err(AiError::Unavailable))
        }

        fn mode(&self) -> AiMode {
            AiMode::On
        }

        fn model(&self) -> String {
            "scripted".to_string()
        }
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn response(fields: &[(&str, i64, f64)]) -> MapColumnsResponse {
        MapColumnsResponse {
            canonical_fields: fields
                .iter()
                .map(|&(name, index, confidence)| FieldMapping {
                    canonical_name: name.to_string(),
                    source_header: String::new(),
                    column_index: index,
                    confidence,
                    reasoning: None,
                })
                .collect(),
            ..MapColumnsResponse::default()
        }
    }

    #[test]
    fn table_format_never_calls_the_service() {
        let service = ScriptedService::new(Ok(response(&[("id", 0, 0.9)])));
        let mut sink = Vec::new();
        let resolved = resolve_mapping(
            Some(&service),
            &CancelToken::new(),
            &headers(&["ID", "Title"]),
            &[],
            ResolveOptions {
                format: OutputFormat::Table,
                ..ResolveOptions::default()
            },
            &mut sink,
        )
        .expect("resolve");
        assert_eq!(service.call_count(), 0);
        assert_eq!(resolved.ai.mode, AiMode::Off);
    }

    #[test]
    fn skip_ai_reports_skipped_mode() {
        let service = ScriptedService::new(Ok(response(&[("id", 0, 0.9)])));
        let mut sink = Vec::new();
        let resolved = resolve_mapping(
            Some(&service),
            &CancelToken::new(),
            &headers(&["ID"]),
            &[],
            ResolveOptions {
                skip_ai: true,
                ..ResolveOptions::default()
            },
            &mut sink,
        )
        .expect("resolve");
        assert_eq!(service.call_count(), 0);
        assert_eq!(resolved.ai.mode, AiMode::Skipped);
        assert!(!resolved.ai.used);
    }

    #[test]
    fn confident_ai_mapping_is_adopted() {
        let service = ScriptedService::new(Ok(response(&[
            ("id", 0, 0.95),
            ("title", 1, 0.9),
            ("description", 2, 0.9),
        ])));
        let mut sink = Vec::new();
        let resolved = resolve_mapping(
            Some(&service),
            &CancelToken::new(),
            &headers(&["ID", "Title", "Description"]),
            &[],
            ResolveOptions::default(),
            &mut sink,
        )
        .expect("resolve");
        assert_eq!(service.call_count(), 1);
        assert!(resolved.ai.used);
        assert!(!resolved.ai.degraded);
        assert_eq!(resolved.outcome.column_map.len(), 3);
        assert_eq!(resolved.ai.fallback_reason, FallbackReason::None);
    }

    #[test]
    fn low_confidence_degrades_to_heuristic() {
        let service = ScriptedService::new(Ok(response(&[("id", 0, 0.40)])));
        let mut sink = Vec::new();
        let hdrs = headers(&["ID", "AAA", "BBB", "CCC", "DDD"]);
        let resolved = resolve_mapping(
            Some(&service),
            &CancelToken::new(),
            &hdrs,
            &[],
            ResolveOptions::default(),
            &mut sink,
        )
        .expect("resolve");
        assert!(resolved.ai.used);
        assert!(resolved.ai.degraded);
        assert_eq!(resolved.ai.fallback_reason, FallbackReason::AiLowConfidence);
        assert!(sink.iter().any(|w| w.code == warnings::MAPPING_AI_LOW_CONFIDENCE));
        // Heuristic still maps the ID column.
        assert_eq!(resolved.outcome.column_map[&crate::fields::CanonicalField::Id], 0);
    }

    #[test]
    fn unavailable_service_degrades_with_sentinel_warning() {
        let service = ScriptedService::new(Err(AiError::Unavailable));
        let mut sink = Vec::new();
        let resolved = resolve_mapping(
            Some(&service),
            &CancelToken::new(),
            &headers(&["ID", "Title"]),
            &[],
            ResolveOptions::default(),
            &mut sink,
        )
        .expect("resolve");
        assert!(!resolved.ai.used);
        assert!(resolved.ai.degraded);
        assert_eq!(resolved.ai.fallback_reason, FallbackReason::AiUnavailable);
        assert!(sink.iter().any(|w| w.code == warnings::AI_UNAVAILABLE));
    }

    #[test]
    fn cancellation_propagates_from_the_service_call() {
        let service = ScriptedService::new(Err(AiError::Cancelled));
        let mut sink = Vec::new();
        let err = resolve_mapping(
            Some(&service),
            &CancelToken::new(),
            &headers(&["ID"]),
            &[],
            ResolveOptions::default(),
            &mut sink,
        )
        .expect_err("cancelled");
        assert!(matches!(err, ConvertError::Cancelled));
    }

    #[test]
    fn preference_rule_orders_candidates() {
        let fresh = MappingCandidate { degraded: false, mapped_columns: 2, avg_confidence: 0.5 };
        let degraded = MappingCandidate { degraded: true, mapped_columns: 5, avg_confidence: 0.9 };
        assert!(prefer_first(&fresh, &degraded));

        let wider = MappingCandidate { degraded: false, mapped_columns: 4, avg_confidence: 0.4 };
        assert!(prefer_first(&wider, &fresh));

        let confident = MappingCandidate { degraded: false, mapped_columns: 2, avg_confidence: 0.9 };
        assert!(prefer_first(&confident, &fresh));
    }
}
