//! Mapping-quality evaluation and the spec→table format gate.
//!
//! The composite score weighs header confidence (0.35), mapped ratio
//! (0.40), and core-schema coverage (0.25), capped at 1. The gate only
//! applies on the `spec` path: a sheet that maps no core field of any
//! schema, or scores poorly on both coverage and the composite, renders as
//! a plain table instead of a hollow spec document.

use log::debug;
use serde_json::json;

use crate::fields::SchemaKind;
use crate::mapping::ColumnMap;
use crate::warnings::{self, Category, Warning};

const HEADER_WEIGHT: f64 = 0.35;
const MAPPED_WEIGHT: f64 = 0.40;
const COVERAGE_WEIGHT: f64 = 0.25;

#[derive(Debug, Clone, Copy)]
pub struct QualityReport {
    pub score: f64,
    pub header_score: f64,
    pub mapped_ratio: f64,
    pub core_coverage: f64,
    pub core_mapped: usize,
    pub best_schema: Option<SchemaKind>,
}

pub fn evaluate(header_confidence: u32, headers_len: usize, map: &ColumnMap) -> QualityReport {
    let header_score = f64::from(header_confidence.min(100)) / 100.0;
    let mapped_ratio = map.len() as f64 / headers_len.max(1) as f64;

    let mut core_coverage = 0.0;
    let mut core_mapped = 0;
    let mut best_schema = None;
    for schema in SchemaKind::ALL {
        let core = schema.core_fields();
        let mapped = core.iter().filter(|field| map.contains_key(field)).count();
        let coverage = mapped as f64 / core.len() as f64;
        if coverage > core_coverage || best_schema.is_none() {
            core_coverage = coverage;
            core_mapped = mapped;
            best_schema = Some(schema);
        }
    }

    let score = (HEADER_WEIGHT * header_score
        + MAPPED_WEIGHT * mapped_ratio
        + COVERAGE_WEIGHT * core_coverage)
        .min(1.0);

    QualityReport {
        score,
        header_score,
        mapped_ratio: mapped_ratio.min(1.0),
        core_coverage,
        core_mapped,
        best_schema,
    }
}

/// The gate, in rule order. Returns `true` when the spec rendering should
/// fall back to a table.
pub fn should_fallback_to_table(report: &QualityReport) -> bool {
    if report.core_mapped == 0 {
        return true;
    }
    if report.mapped_ratio >= 0.5 && report.core_mapped >= 1 {
        return false;
    }
    if report.core_coverage < 0.34 && report.score < 0.45 {
        return true;
    }
    if report.score >= 0.45 {
        return false;
    }
    report.mapped_ratio < 0.25
}

pub fn fallback_warning(report: &QualityReport) -> Warning {
    debug!(
        "format gate: falling back to table (score {:.2}, coverage {:.2}, mapped {:.2})",
        report.score, report.core_coverage, report.mapped_ratio
    );
    Warning::warn(
        warnings::MAPPING_LOW_CONFIDENCE_TABLE_FALLBACK,
        Category::Mapping,
        "column mapping quality too low for a spec document; rendering a table instead",
    )
    .with_hint("rename the sheet headers to standard spec columns or pass format=table explicitly")
    .with_details(json!({
        "score": report.score,
        "header_score": report.header_score,
        "mapped_ratio": report.mapped_ratio,
        "core_coverage": report.core_coverage,
        "best_schema": report.best_schema.map(SchemaKind::as_str),
    }))
}
