//! The spec renderer: canonical-field-aware, feature-grouped Markdown.
//!
//! Output shape: YAML front-matter, a title, a summary table, an optional
//! column-mapping section, then one `###` section per feature (rows with no
//! feature value group under `Uncategorized`, rendered last). Every data
//! row becomes a `####` item with a metadata table and labeled blocks.
//! Features are emitted in a deterministic sort so repeated conversions of
//! the same sheet produce identical documents.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConvertError;
use crate::fields::CanonicalField;
use crate::model::Table;
use crate::render::{escape_table_cell, front_matter, separator_line, table_line};

const UNCATEGORIZED: &str = "Uncategorized";

pub fn render(table: &Table) -> Result<String, ConvertError> {
    let mut output = front_matter(&table.sheet_name, "specification")?;
    let _ = write!(output, "# {}\n\n", table.sheet_name);

    render_summary(&mut output, table);
    render_column_mapping(&mut output, table);

    output.push_str("## Specifications\n\n");
    for (feature, row_indices) in grouped_features(table) {
        let _ = write!(output, "### {feature}\n\n");
        for (position, &row_index) in row_indices.iter().enumerate() {
            render_item(&mut output, table, row_index, position);
        }
    }

    Ok(output)
}

fn render_summary(output: &mut String, table: &Table) {
    let feature_count = grouped_features(table).len();
    output.push_str("## Summary\n\n");
    output.push_str(&table_line(&["Item".to_string(), "Value".to_string()]));
    output.push_str(&separator_line(2));
    output.push_str(&table_line(&[
        "Total Items".to_string(),
        table.rows.len().to_string(),
    ]));
    output.push_str(&table_line(&[
        "Feature Groups".to_string(),
        feature_count.to_string(),
    ]));
    output.push_str(&table_line(&[
        "Mapped Columns".to_string(),
        format!("{} / {}", table.meta.column_map.len(), table.headers.len()),
    ]));
    output.push('\n');
}

fn render_column_mapping(output: &mut String, table: &Table) {
    if table.meta.column_map.is_empty() {
        return;
    }
    output.push_str("## Column Mapping\n\n");
    output.push_str(&table_line(&[
        "Canonical Field".to_string(),
        "Source Column".to_string(),
    ]));
    output.push_str(&separator_line(2));
    for (&field, &index) in &table.meta.column_map {
        let source = table
            .headers
            .get(index)
            .map(String::as_str)
            .unwrap_or_default();
        output.push_str(&table_line(&[
            field.as_str().to_string(),
            escape_table_cell(source),
        ]));
    }
    output.push('\n');
}

/// Rows grouped by their feature value. `BTreeMap` gives a stable
/// alphabetical order; `Uncategorized` is moved to the end.
fn grouped_features(table: &Table) -> Vec<(String, Vec<usize>)> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, row) in table.rows.iter().enumerate() {
        let feature = table
            .field_value(row, CanonicalField::Feature)
            .unwrap_or(UNCATEGORIZED)
            .to_string();
        groups.entry(feature).or_default().push(index);
    }

    let uncategorized = groups.remove(UNCATEGORIZED);
    let mut ordered: Vec<(String, Vec<usize>)> = groups.into_iter().collect();
    if let Some(rows) = uncategorized {
        ordered.push((UNCATEGORIZED.to_string(), rows));
    }
    ordered
}

fn render_item(output: &mut String, table: &Table, row_index: usize, position: usize) {
    let row = &table.rows[row_index];
    let title = item_title(table, row, position);
    let _ = write!(output, "#### {title}\n\n");

    render_metadata_table(output, table, row);

    if let Some(description) = table.field_value(row, CanonicalField::Description) {
        let _ = write!(output, "**Description**\n\n{description}\n\n");
    }
    if let Some(precondition) = table.field_value(row, CanonicalField::Precondition) {
        let _ = write!(output, "**Precondition**\n\n{precondition}\n\n");
    }
    if let Some(instructions) = table.field_value(row, CanonicalField::Instructions) {
        output.push_str("**Steps**\n\n");
        for (number, step) in numbered_steps(instructions).into_iter().enumerate() {
            let _ = writeln!(output, "{}. {step}", number + 1);
        }
        output.push('\n');
    }
    if let Some(expected) = table.field_value(row, CanonicalField::Expected) {
        let _ = write!(output, "**Expected Result**\n\n{expected}\n\n");
    }
    if let Some(inputs) = table.field_value(row, CanonicalField::Inputs) {
        let _ = write!(output, "**Test Data**\n\n```\n{inputs}\n```\n\n");
    }
    if let Some(criteria) = table.field_value(row, CanonicalField::AcceptanceCriteria) {
        let _ = write!(output, "**Acceptance Criteria**\n\n{criteria}\n\n");
    }
    render_api_block(output, table, row);
    render_ui_fields(output, table, row);
    if let Some(notes) = table.field_value(row, CanonicalField::Notes) {
        let _ = write!(output, "**Notes**\n\n{notes}\n\n");
    }
    render_additional_fields(output, table, row);
}

/// Item title: the id prefixes the first non-blank of scenario, feature,
/// item name, or row number.
fn item_title(table: &Table, row: &[String], position: usize) -> String {
    let label = table
        .field_value(row, CanonicalField::Scenario)
        .or_else(|| table.field_value(row, CanonicalField::Title))
        .or_else(|| table.field_value(row, CanonicalField::Feature))
        .or_else(|| table.field_value(row, CanonicalField::ItemName))
        .or_else(|| table.field_value(row, CanonicalField::No));

    match (table.field_value(row, CanonicalField::Id), label) {
        (Some(id), Some(label)) => format!("{id}: {label}"),
        (Some(id), None) => id.to_string(),
        (None, Some(label)) => label.to_string(),
        (None, None) => format!("Item {}", position + 1),
    }
}

fn render_metadata_table(output: &mut String, table: &Table, row: &[String]) {
    let fields = [
        CanonicalField::Id,
        CanonicalField::Type,
        CanonicalField::Priority,
        CanonicalField::Status,
        CanonicalField::Component,
        CanonicalField::Assignee,
        CanonicalField::Category,
    ];
    let present: Vec<(&str, &str)> = fields
        .iter()
        .filter_map(|&field| {
            table
                .field_value(row, field)
                .map(|value| (field.label(), value))
        })
        .collect();
    if present.is_empty() {
        return;
    }

    output.push_str(&table_line(&["Field".to_string(), "Value".to_string()]));
    output.push_str(&separator_line(2));
    for (label, value) in present {
        output.push_str(&table_line(&[
            label.to_string(),
            escape_table_cell(value),
        ]));
    }
    output.push('\n');
}

fn render_api_block(output: &mut String, table: &Table, row: &[String]) {
    let endpoint = table.field_value(row, CanonicalField::Endpoint);
    let method = table.field_value(row, CanonicalField::Method);
    match (method, endpoint) {
        (Some(method), Some(endpoint)) => {
            let _ = write!(output, "**API**: `{} {}`\n\n", method.trim(), endpoint.trim());
        }
        (None, Some(endpoint)) => {
            let _ = write!(output, "**Endpoint**: `{}`\n\n", endpoint.trim());
        }
        _ => {}
    }
    if let Some(parameters) = table.field_value(row, CanonicalField::Parameters) {
        let _ = write!(output, "**Parameters**\n\n```\n{parameters}\n```\n\n");
    }
    if let Some(response) = table.field_value(row, CanonicalField::Response) {
        let _ = write!(output, "**Response**\n\n```\n{response}\n```\n\n");
    }
    if let Some(status_code) = table.field_value(row, CanonicalField::StatusCode) {
        let _ = write!(output, "**Status Code**: `{}`\n\n", status_code.trim());
    }
}

fn render_ui_fields(output: &mut String, table: &Table, row: &[String]) {
    let fields = [
        CanonicalField::ItemName,
        CanonicalField::ItemType,
        CanonicalField::RequiredOptional,
        CanonicalField::InputRestrictions,
        CanonicalField::DisplayConditions,
        CanonicalField::Action,
        CanonicalField::NavigationDestination,
    ];
    let present: Vec<(&str, &str)> = fields
        .iter()
        .filter_map(|&field| {
            table
                .field_value(row, field)
                .map(|value| (field.label(), value))
        })
        .collect();
    if present.is_empty() {
        return;
    }
    for (label, value) in present {
        let _ = writeln!(output, "- **{label}**: {}", escape_table_cell(value));
    }
    output.push('\n');
}

/// Unmapped columns with content render as a trailing key/value table so no
/// source data silently disappears.
fn render_additional_fields(output: &mut String, table: &Table, row: &[String]) {
    let mapped: Vec<usize> = table.meta.column_map.values().copied().collect();
    let extras: Vec<(&str, &str)> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(index, _)| !mapped.contains(index))
        .filter_map(|(index, header)| {
            row.get(index)
                .filter(|value| !crate::matrix::is_blank_cell(value))
                .map(|value| (header.as_str(), value.as_str()))
        })
        .collect();
    if extras.is_empty() {
        return;
    }

    output.push_str("**Additional Fields**\n\n");
    output.push_str(&table_line(&["Column".to_string(), "Value".to_string()]));
    output.push_str(&separator_line(2));
    for (header, value) in extras {
        output.push_str(&table_line(&[
            escape_table_cell(header),
            escape_table_cell(value),
        ]));
    }
    output.push('\n');
}

/// Splits an instructions cell into steps, stripping any numbering the
/// source already carried.
fn numbered_steps(instructions: &str) -> Vec<String> {
    static LEADING_NUMBER: OnceLock<Regex> = OnceLock::new();
    let pattern = LEADING_NUMBER
        .get_or_init(|| Regex::new(r"^\s*\d+\s*[.)]\s*").expect("step numbering regex"));

    instructions
        .lines()
        .map(|line| pattern.replace(line.trim(), "").to_string())
        .filter(|line| !line.is_empty())
        .collect()
}
