//! Shared rendering plumbing: YAML front-matter, cell escaping, and the
//! format dispatch.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::error::ConvertError;
use crate::matrix::is_blank_cell;
use crate::model::{OutputFormat, Table};
use crate::{render_spec, render_table};

#[derive(Serialize)]
struct FrontMatter<'a> {
    name: &'a str,
    version: &'a str,
    generated: String,
    #[serde(rename = "type")]
    doc_type: &'a str,
}

pub fn front_matter(name: &str, doc_type: &str) -> Result<String, ConvertError> {
    let front = FrontMatter {
        name,
        version: env!("CARGO_PKG_VERSION"),
        generated: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        doc_type,
    };
    let yaml =
        serde_yaml::to_string(&front).map_err(|err| ConvertError::Render(err.to_string()))?;
    Ok(format!("---\n{yaml}---\n\n"))
}

/// Escapes one Markdown table cell: pipes become `\|`, newlines collapse to
/// single spaces, blank placeholders render empty.
pub fn escape_table_cell(value: &str) -> String {
    if is_blank_cell(value) {
        return String::new();
    }
    value
        .replace("\r\n", "\n")
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|")
}

/// Renders one pipe-table line.
pub fn table_line(cells: &[String]) -> String {
    let mut line = String::from("|");
    for cell in cells {
        line.push(' ');
        line.push_str(cell);
        line.push_str(" |");
    }
    line.push('\n');
    line
}

pub fn separator_line(columns: usize) -> String {
    table_line(&vec!["---".to_string(); columns])
}

pub fn render(table: &Table, format: OutputFormat) -> Result<String, ConvertError> {
    match format {
        OutputFormat::Spec => render_spec::render(table),
        OutputFormat::Table => render_table::render(table),
    }
}
