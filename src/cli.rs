use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Convert tabular specification data into structured Markdown", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert pasted TSV/CSV or an exported sheet into Markdown
    Convert(ConvertArgs),
    /// Show the heuristic column mapping for a sheet without converting it
    Preview(PreviewArgs),
    /// List the available output templates
    Templates(TemplatesArgs),
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input file path ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Output file path ('-' or absent writes stdout)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Output format: 'spec' or 'table' (defaults to the template's format)
    #[arg(short = 'f', long = "format", default_value = "")]
    pub format: String,
    /// Output template name
    #[arg(short = 't', long = "template", default_value = "")]
    pub template: String,
    /// Sheet name used for the document title
    #[arg(long = "sheet-name")]
    pub sheet_name: Option<String>,
    /// Replace a detected header before mapping, using `Header=Replacement`
    #[arg(long = "override", action = clap::ArgAction::Append, value_parser = parse_override)]
    pub overrides: Vec<(String, String)>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Skip AI column mapping even when a service is configured
    #[arg(long = "skip-ai")]
    pub skip_ai: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input file path ('-' reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Template whose mapping rules to preview
    #[arg(short = 't', long = "template", default_value = "")]
    pub template: String,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct TemplatesArgs {}

fn parse_override(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((header, replacement)) if !header.trim().is_empty() => Ok((
            header.trim().to_string(),
            replacement.trim().to_string(),
        )),
        _ => Err(format!(
            "override '{value}' must use the form 'Header=Replacement'"
        )),
    }
}
