//! The conversion orchestrator: blocking and streaming entry points over
//! one shared pipeline.
//!
//! Pipeline: classify → parse → block selection → header detection →
//! mapping resolution → quality gate → table assembly → render. The
//! streaming variant emits one event per phase (parsing 20, mapping 50,
//! rendering 80, complete 100); cancellation is checked before every phase
//! boundary and no `complete` is emitted after it fires. Markdown-classified
//! input short-circuits the table pipeline entirely.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use serde_json::json;

use crate::ai::ColumnMappingService;
use crate::blocks::{Block, BlockCandidate, detect_blocks, select_block};
use crate::classify::{InputKind, classify};
use crate::error::ConvertError;
use crate::fields::CanonicalField;
use crate::header::detect_header;
use crate::mapping::{ColumnMapper, HeuristicMapper};
use crate::model::{OutputFormat, Table, TableMeta};
use crate::parse::parse_delimited;
use crate::progress::{CancelToken, Phase, ProgressEvent};
use crate::quality::{evaluate, fallback_warning, should_fallback_to_table};
use crate::render;
use crate::resolve::{ResolveOptions, resolve_mapping};
use crate::warnings::{self, Category, Warning};

const DEFAULT_SHEET_NAME: &str = "Sheet1";
const LOW_HEADER_CONFIDENCE: u32 = 50;

#[derive(Debug, Clone, Copy)]
pub struct TemplateInfo {
    pub name: &'static str,
    pub format: OutputFormat,
    pub description: &'static str,
}

/// The template catalogue. Each template fixes a default output format;
/// the `format` argument overrides it.
pub fn list_templates() -> Vec<TemplateInfo> {
    vec![
        TemplateInfo {
            name: "spec",
            format: OutputFormat::Spec,
            description: "Richly formatted specification document grouped by feature",
        },
        TemplateInfo {
            name: "table",
            format: OutputFormat::Table,
            description: "Normalized Markdown table preserving the source columns",
        },
    ]
}

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub template: String,
    pub format: String,
    pub sheet_name: Option<String>,
    pub overrides: HashMap<String, String>,
    pub skip_ai: bool,
    pub file_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub markdown: String,
    pub warnings: Vec<Warning>,
    pub meta: TableMeta,
}

/// Heuristic-only preview of a header mapping (no AI, no samples).
#[derive(Debug, Clone)]
pub struct PreviewMapping {
    pub mapping: Vec<(String, CanonicalField)>,
    pub unmapped: Vec<String>,
}

#[derive(Default)]
pub struct Converter {
    ai_service: Option<Arc<dyn ColumnMappingService>>,
}

impl Converter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ai_service(mut self, service: Arc<dyn ColumnMappingService>) -> Self {
        self.ai_service = Some(service);
        self
    }

    pub fn has_ai_service(&self) -> bool {
        self.ai_service.is_some()
    }

    pub fn convert(
        &self,
        text: &str,
        template: &str,
        format: &str,
    ) -> Result<Conversion, ConvertError> {
        let options = ConvertOptions {
            template: template.to_string(),
            format: format.to_string(),
            ..ConvertOptions::default()
        };
        self.convert_with_options(text, &options, &CancelToken::new(), &mut |_| {})
    }

    pub fn convert_with_overrides(
        &self,
        text: &str,
        template: &str,
        format: &str,
        overrides: &HashMap<String, String>,
    ) -> Result<Conversion, ConvertError> {
        let options = ConvertOptions {
            template: template.to_string(),
            format: format.to_string(),
            overrides: overrides.clone(),
            ..ConvertOptions::default()
        };
        self.convert_with_options(text, &options, &CancelToken::new(), &mut |_| {})
    }

    pub fn convert_streaming(
        &self,
        text: &str,
        template: &str,
        format: &str,
        cancel: &CancelToken,
        on_event: &mut dyn FnMut(ProgressEvent),
    ) -> Result<Conversion, ConvertError> {
        let options = ConvertOptions {
            template: template.to_string(),
            format: format.to_string(),
            ..ConvertOptions::default()
        };
        self.convert_with_options(text, &options, cancel, on_event)
    }

    /// The full pipeline. All other entry points delegate here.
    pub fn convert_with_options(
        &self,
        text: &str,
        options: &ConvertOptions,
        cancel: &CancelToken,
        on_event: &mut dyn FnMut(ProgressEvent),
    ) -> Result<Conversion, ConvertError> {
        let requested_format = resolve_format(&options.template, &options.format)?;
        let sheet_name = options
            .sheet_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string());
        let mut sink: Vec<Warning> = Vec::new();

        cancel.ensure_active()?;
        on_event(ProgressEvent::with_message(Phase::Parsing, "parsing input"));

        if text.trim().is_empty() {
            return self.finish_empty(&sheet_name, requested_format, sink, cancel, on_event);
        }

        if classify(text) == InputKind::Markdown {
            debug!("input classified as markdown; passing through");
            cancel.ensure_active()?;
            on_event(ProgressEvent::with_message(Phase::Rendering, "rendering markdown"));
            let meta = TableMeta {
                output_format: "markdown".to_string(),
                ..TableMeta::default()
            };
            return finish(
                Conversion {
                    markdown: text.to_string(),
                    warnings: sink,
                    meta,
                },
                cancel,
                on_event,
            );
        }

        let parsed = parse_delimited(text);
        sink.extend(parsed.warnings);
        if parsed.matrix.is_empty() {
            return self.finish_empty(&sheet_name, requested_format, sink, cancel, on_event);
        }

        let (block, header) = choose_block(&parsed.matrix);
        if header.confidence < LOW_HEADER_CONFIDENCE {
            sink.push(
                Warning::warn(
                    warnings::HEADER_LOW_CONFIDENCE,
                    Category::Header,
                    format!(
                        "header row {} detected with low confidence ({})",
                        header.row_index, header.confidence
                    ),
                )
                .with_hint("check that the first sheet row holds column names")
                .with_details(json!({ "confidence": header.confidence })),
            );
        }

        let mut block_matrix = block.matrix;
        for (target, replacement) in &options.overrides {
            let column = block_matrix
                .row(header.row_index)
                .and_then(|row| row.iter().position(|cell| cell.trim() == target.trim()));
            if let Some(column) = column {
                block_matrix.replace_cell(header.row_index, column, replacement.clone());
            }
        }

        let mut table = Table::from_matrix(&block_matrix, header.row_index, &sheet_name);
        if table.headers.is_empty() {
            return self.finish_empty(&sheet_name, requested_format, sink, cancel, on_event);
        }

        cancel.ensure_active()?;
        on_event(ProgressEvent::with_message(Phase::Mapping, "mapping columns"));

        let resolved = resolve_mapping(
            self.ai_service.as_deref(),
            cancel,
            &table.headers,
            &table.rows,
            ResolveOptions {
                format: requested_format,
                skip_ai: options.skip_ai,
                file_type: options.file_type.as_deref(),
            },
            &mut sink,
        )?;

        if !resolved.outcome.unmapped.is_empty() {
            let names: Vec<&str> = resolved
                .outcome
                .unmapped
                .iter()
                .filter_map(|&index| table.headers.get(index).map(String::as_str))
                .collect();
            sink.push(
                Warning::info(
                    warnings::MAPPING_UNMAPPED_COLUMNS,
                    Category::Mapping,
                    format!("{} column(s) have no canonical mapping", names.len()),
                )
                .with_hint("unmapped columns render under Additional Fields")
                .with_details(json!({ "columns": names })),
            );
        }

        let mut effective_format = requested_format;
        if requested_format == OutputFormat::Spec {
            let report = evaluate(header.confidence, table.headers.len(), &resolved.outcome.column_map);
            if should_fallback_to_table(&report) {
                sink.push(fallback_warning(&report));
                effective_format = OutputFormat::Table;
            }
        }

        table.meta.column_map = resolved.outcome.column_map;
        table.meta.ai_mode = resolved.ai.mode;
        table.meta.ai_used = resolved.ai.used;
        table.meta.ai_degraded = resolved.ai.degraded;
        table.meta.ai_fallback_reason = resolved.ai.fallback_reason.as_str().to_string();
        table.meta.ai_avg_confidence = resolved.ai.avg_confidence;
        table.meta.ai_mapped_columns = resolved.ai.mapped_columns;
        table.meta.ai_unmapped_columns = resolved.ai.unmapped_columns;
        table.meta.output_format = effective_format.as_str().to_string();

        cancel.ensure_active()?;
        on_event(ProgressEvent::with_message(Phase::Rendering, "rendering markdown"));
        let markdown = render::render(&table, effective_format)?;

        info!(
            "converted {} row(s) into {} output ({} warning(s))",
            table.rows.len(),
            effective_format.as_str(),
            sink.len()
        );

        table.meta.warnings = sink.clone();
        finish(
            Conversion {
                markdown,
                warnings: sink,
                meta: table.meta,
            },
            cancel,
            on_event,
        )
    }

    /// Heuristic mapping preview over caller-supplied headers; never calls
    /// the AI service.
    pub fn get_preview_mapping(
        &self,
        headers: &[String],
        template: &str,
    ) -> Result<PreviewMapping, ConvertError> {
        resolve_format(template, "")?;
        let outcome = HeuristicMapper.map_columns(headers, &[]);
        let mapping = outcome
            .column_map
            .iter()
            .map(|(&field, &index)| (headers[index].clone(), field))
            .collect();
        let unmapped = outcome
            .unmapped
            .iter()
            .filter_map(|&index| headers.get(index).cloned())
            .collect();
        Ok(PreviewMapping { mapping, unmapped })
    }

    fn finish_empty(
        &self,
        sheet_name: &str,
        format: OutputFormat,
        mut sink: Vec<Warning>,
        cancel: &CancelToken,
        on_event: &mut dyn FnMut(ProgressEvent),
    ) -> Result<Conversion, ConvertError> {
        sink.push(
            Warning::warn(
                warnings::INPUT_EMPTY,
                Category::Input,
                "input contains no table data",
            )
            .with_hint("paste TSV/CSV content or upload a sheet with at least one data row"),
        );
        cancel.ensure_active()?;
        on_event(ProgressEvent::with_message(Phase::Rendering, "rendering markdown"));
        let markdown = format!(
            "{}# {sheet_name}\n\n_No table data was found in the input._\n",
            render::front_matter(sheet_name, format.as_str())?
        );
        let meta = TableMeta {
            warnings: sink.clone(),
            output_format: format.as_str().to_string(),
            ..TableMeta::default()
        };
        finish(
            Conversion {
                markdown,
                warnings: sink,
                meta,
            },
            cancel,
            on_event,
        )
    }
}

fn finish(
    conversion: Conversion,
    cancel: &CancelToken,
    on_event: &mut dyn FnMut(ProgressEvent),
) -> Result<Conversion, ConvertError> {
    cancel.ensure_active()?;
    on_event(ProgressEvent::new(Phase::Complete));
    Ok(conversion)
}

/// Template lookup plus format override. An empty format falls back to the
/// template's default; an empty template means the default `spec` template.
fn resolve_format(template: &str, format: &str) -> Result<OutputFormat, ConvertError> {
    let template_format = match template.trim() {
        "" => OutputFormat::Spec,
        name => {
            list_templates()
                .into_iter()
                .find(|t| t.name == name)
                .ok_or_else(|| ConvertError::UnknownTemplate(name.to_string()))?
                .format
        }
    };
    match format.trim() {
        "" => Ok(template_format),
        value => OutputFormat::parse(value)
            .ok_or_else(|| ConvertError::InvalidFormat(value.to_string())),
    }
}

/// Runs header detection per block and picks the one worth converting.
fn choose_block(matrix: &crate::matrix::CellMatrix) -> (Block, crate::header::HeaderDetection) {
    let blocks = detect_blocks(matrix);
    if blocks.len() == 1 {
        let block = blocks.into_iter().next().expect("single block");
        let header = detect_header(&block.matrix);
        return (block, header);
    }

    let detections: Vec<crate::header::HeaderDetection> = blocks
        .iter()
        .map(|block| detect_header(&block.matrix))
        .collect();
    let candidates: Vec<BlockCandidate> = blocks
        .iter()
        .zip(&detections)
        .map(|(block, detection)| BlockCandidate {
            quality: f64::from(detection.confidence) / 100.0,
            rows: block.matrix.row_count(),
            cols: block.matrix.column_count(),
        })
        .collect();
    let selected = select_block(&candidates);
    debug!("selected block {selected} of {}", candidates.len());
    let header = detections[selected];
    let block = blocks.into_iter().nth(selected).expect("selected block");
    (block, header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_format_honors_template_default_and_override() {
        assert_eq!(resolve_format("", "").unwrap(), OutputFormat::Spec);
        assert_eq!(resolve_format("table", "").unwrap(), OutputFormat::Table);
        assert_eq!(resolve_format("spec", "table").unwrap(), OutputFormat::Table);
        assert!(matches!(
            resolve_format("fancy", ""),
            Err(ConvertError::UnknownTemplate(_))
        ));
        assert!(matches!(
            resolve_format("", "yaml"),
            Err(ConvertError::InvalidFormat(_))
        ));
    }

    #[test]
    fn template_catalogue_lists_both_formats() {
        let templates = list_templates();
        assert_eq!(templates.len(), 2);
        assert!(templates.iter().any(|t| t.name == "spec"));
        assert!(templates.iter().any(|t| t.name == "table"));
    }

    #[test]
    fn preview_mapping_reports_headers_by_name() {
        let converter = Converter::new();
        let headers = vec!["ID".to_string(), "Expected".to_string(), "Zzz".to_string()];
        let preview = converter.get_preview_mapping(&headers, "spec").expect("preview");
        assert!(preview
            .mapping
            .iter()
            .any(|(header, field)| header == "ID" && *field == CanonicalField::Id));
        assert_eq!(preview.unmapped, vec!["Zzz".to_string()]);
    }

    #[test]
    fn empty_input_yields_a_stub_document_with_warning() {
        let converter = Converter::new();
        let conversion = converter.convert("   ", "", "").expect("convert");
        assert!(!conversion.markdown.is_empty());
        assert!(conversion
            .warnings
            .iter()
            .any(|w| w.code == warnings::INPUT_EMPTY));
    }

    #[test]
    fn markdown_input_passes_through() {
        let converter = Converter::new();
        let text = "# Notes\n\n- already markdown\n- stays untouched";
        let conversion = converter.convert(text, "", "").expect("convert");
        assert_eq!(conversion.markdown, text);
        assert_eq!(conversion.meta.output_format, "markdown");
    }
}
