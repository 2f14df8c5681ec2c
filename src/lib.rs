pub mod ai;
pub mod blocks;
pub mod byok;
pub mod classify;
pub mod cli;
pub mod console;
pub mod convert;
pub mod error;
pub mod fields;
pub mod header;
pub mod io_utils;
pub mod mapping;
pub mod matrix;
pub mod model;
pub mod parse;
pub mod progress;
pub mod quality;
pub mod render;
pub mod render_spec;
pub mod render_table;
pub mod resolve;
pub mod sanitize;
pub mod warnings;

use std::{collections::HashMap, env, sync::OnceLock, time::Instant};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use log::{LevelFilter, error, info, warn};

use crate::cli::{Cli, Commands, ConvertArgs, PreviewArgs};
use crate::convert::{ConvertOptions, Converter, list_templates};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("mdspec", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => run_operation("convert", || handle_convert(&args)),
        Commands::Preview(args) => run_operation("preview", || handle_preview(&args)),
        Commands::Templates(_) => run_operation("templates", handle_templates),
    }
}

fn run_operation<F>(name: &str, op: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let start_clock = Utc::now();
    let start_instant = Instant::now();
    let result = op();
    let end_clock = Utc::now();
    let duration_secs = start_instant.elapsed().as_secs_f64();
    let start_str = start_clock.to_rfc3339_opts(SecondsFormat::Millis, true);
    let end_str = end_clock.to_rfc3339_opts(SecondsFormat::Millis, true);

    match &result {
        Ok(_) => info!(
            "Operation '{name}' completed (status=ok)\nstart: {start_str}\nend: {end_str}\nduration_secs: {duration_secs:.3}"
        ),
        Err(err) => error!(
            "Operation '{name}' failed (status=error)\nstart: {start_str}\nend: {end_str}\nduration_secs: {duration_secs:.3}\nerror: {err:?}"
        ),
    }

    result
}

fn handle_convert(args: &ConvertArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let text = io_utils::read_input(&args.input, encoding)?;

    // The vendor mapping client is wired by embedding callers; the CLI runs
    // heuristic-only.
    let converter = Converter::new();
    let options = ConvertOptions {
        template: args.template.clone(),
        format: args.format.clone(),
        sheet_name: args.sheet_name.clone(),
        overrides: args
            .overrides
            .iter()
            .cloned()
            .collect::<HashMap<String, String>>(),
        skip_ai: args.skip_ai,
        file_type: None,
    };
    let conversion = converter
        .convert_with_options(
            &text,
            &options,
            &progress::CancelToken::new(),
            &mut |event| {
                info!("{}% {}", event.percent, event.message.unwrap_or_default());
            },
        )
        .with_context(|| format!("Converting {:?}", args.input))?;

    for warning in &conversion.warnings {
        warn!(
            "[{}] {}{}",
            warning.code,
            warning.message,
            warning
                .hint
                .as_deref()
                .map(|hint| format!(" (hint: {hint})"))
                .unwrap_or_default()
        );
    }

    io_utils::write_output(args.output.as_deref(), &conversion.markdown)?;
    info!(
        "Wrote {} output with {} warning(s) to {}",
        conversion.meta.output_format,
        conversion.warnings.len(),
        args.output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into())
    );
    Ok(())
}

fn handle_preview(args: &PreviewArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let text = io_utils::read_input(&args.input, encoding)?;

    let parsed = parse::parse_delimited(&text);
    if parsed.matrix.is_empty() {
        anyhow::bail!("Input {:?} contains no table data", args.input);
    }
    let detection = header::detect_header(&parsed.matrix);
    let headers = parsed
        .matrix
        .row(detection.row_index)
        .unwrap_or_default()
        .to_vec();

    let converter = Converter::new();
    let preview = converter.get_preview_mapping(&headers, &args.template)?;

    let mut rows: Vec<Vec<String>> = preview
        .mapping
        .iter()
        .map(|(head, field)| vec![head.clone(), field.as_str().to_string()])
        .collect();
    for head in &preview.unmapped {
        rows.push(vec![head.clone(), "(unmapped)".to_string()]);
    }
    console::print_table(
        &["Source Column".to_string(), "Canonical Field".to_string()],
        &rows,
    );
    info!(
        "Previewed {} column(s) from {:?} (header row {}, confidence {})",
        headers.len(),
        args.input,
        detection.row_index,
        detection.confidence
    );
    Ok(())
}

fn handle_templates() -> Result<()> {
    let rows: Vec<Vec<String>> = list_templates()
        .into_iter()
        .map(|template| {
            vec![
                template.name.to_string(),
                template.format.as_str().to_string(),
                template.description.to_string(),
            ]
        })
        .collect();
    console::print_table(
        &[
            "Template".to_string(),
            "Format".to_string(),
            "Description".to_string(),
        ],
        &rows,
    );
    Ok(())
}
