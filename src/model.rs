//! The normalized `Table` and its conversion metadata.
//!
//! A `Table` is the post-detection view of one block: unique, non-blank
//! headers; rows padded or truncated to the header width; all-blank rows
//! dropped. `TableMeta` carries everything a caller needs to render a
//! "Degraded" badge without inspecting warnings: the AI reporting vector,
//! the fallback reason, and the effective output format.

use serde::Serialize;

use crate::ai::{AI_PROMPT_VERSION, AiMode};
use crate::fields::CanonicalField;
use crate::mapping::ColumnMap;
use crate::matrix::{CellMatrix, is_blank_cell};
use crate::warnings::Warning;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Spec,
    Table,
}

impl OutputFormat {
    /// Parses the caller-supplied format string; empty selects the default.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "" | "spec" => Some(OutputFormat::Spec),
            "table" => Some(OutputFormat::Table),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Spec => "spec",
            OutputFormat::Table => "table",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TableMeta {
    pub header_row_index: usize,
    pub total_source_rows: usize,
    pub blank_header_count: usize,
    pub duplicate_header_count: usize,
    pub warnings: Vec<Warning>,
    pub column_map: ColumnMap,
    pub ai_mode: AiMode,
    pub ai_used: bool,
    pub ai_degraded: bool,
    pub ai_fallback_reason: String,
    pub ai_avg_confidence: f64,
    pub ai_mapped_columns: usize,
    pub ai_unmapped_columns: usize,
    pub ai_prompt_version: String,
    pub output_format: String,
}

impl Default for TableMeta {
    fn default() -> Self {
        Self {
            header_row_index: 0,
            total_source_rows: 0,
            blank_header_count: 0,
            duplicate_header_count: 0,
            warnings: Vec::new(),
            column_map: ColumnMap::new(),
            ai_mode: AiMode::Off,
            ai_used: false,
            ai_degraded: false,
            ai_fallback_reason: String::new(),
            ai_avg_confidence: 0.0,
            ai_mapped_columns: 0,
            ai_unmapped_columns: 0,
            ai_prompt_version: AI_PROMPT_VERSION.to_string(),
            output_format: OutputFormat::Spec.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub meta: TableMeta,
}

impl Table {
    /// Builds the normalized table from a detected block: rows above the
    /// header are discarded (title banners), headers are uniquified, data
    /// rows are aligned to the header width, and all-blank rows dropped.
    pub fn from_matrix(matrix: &CellMatrix, header_row: usize, sheet_name: &str) -> Self {
        let raw_headers = matrix.row(header_row).unwrap_or_default().to_vec();
        let (headers, blank_header_count, duplicate_header_count) = uniquify_headers(raw_headers);

        let rows: Vec<Vec<String>> = matrix
            .rows()
            .iter()
            .skip(header_row + 1)
            .filter(|row| row.iter().any(|cell| !is_blank_cell(cell)))
            .map(|row| {
                let mut cells = row.clone();
                cells.resize(headers.len(), String::new());
                cells.truncate(headers.len());
                cells
            })
            .collect();

        let meta = TableMeta {
            header_row_index: header_row,
            total_source_rows: matrix.row_count(),
            blank_header_count,
            duplicate_header_count,
            ..TableMeta::default()
        };

        Self {
            sheet_name: sheet_name.to_string(),
            headers,
            rows,
            meta,
        }
    }

    /// Cell for a mapped canonical field, blank placeholders filtered.
    pub fn field_value<'a>(&self, row: &'a [String], field: CanonicalField) -> Option<&'a str> {
        let index = *self.meta.column_map.get(&field)?;
        let value = row.get(index)?;
        if is_blank_cell(value) { None } else { Some(value.as_str()) }
    }
}

/// Renames blank headers to `"Column K"` (1-indexed) and suffixes
/// duplicates with `" (N)"`, N ≥ 2. Returns the headers plus both counts.
fn uniquify_headers(raw: Vec<String>) -> (Vec<String>, usize, usize) {
    let mut headers = Vec::with_capacity(raw.len());
    let mut blank_count = 0;
    let mut duplicate_count = 0;

    for (index, header) in raw.into_iter().enumerate() {
        let mut name = header.trim().to_string();
        if is_blank_cell(&name) {
            blank_count += 1;
            name = format!("Column {}", index + 1);
        }
        if headers.contains(&name) {
            duplicate_count += 1;
            let mut suffix = 2;
            let mut candidate = format!("{name} ({suffix})");
            while headers.contains(&candidate) {
                suffix += 1;
                candidate = format!("{name} ({suffix})");
            }
            name = candidate;
        }
        headers.push(name);
    }

    (headers, blank_count, duplicate_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn matrix(rows: &[&[&str]]) -> CellMatrix {
        CellMatrix::normalize(
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn blank_and_duplicate_headers_are_renamed() {
        let m = matrix(&[
            &["ID", "", "Name", "Name", "-"],
            &["1", "a", "b", "c", "d"],
        ]);
        let table = Table::from_matrix(&m, 0, "Sheet1");
        assert_eq!(
            table.headers,
            vec!["ID", "Column 2", "Name", "Name (2)", "Column 5"]
        );
        assert_eq!(table.meta.blank_header_count, 2);
        assert_eq!(table.meta.duplicate_header_count, 1);
    }

    #[test]
    fn rows_align_to_header_width_and_blank_rows_drop() {
        let m = matrix(&[
            &["A", "B", "C"],
            &["1", "2", "3"],
            &["-", "-", ""],
            &["4", "5", ""],
        ]);
        let table = Table::from_matrix(&m, 0, "Sheet1");
        assert_eq!(table.rows.len(), 2);
        for row in &table.rows {
            assert_eq!(row.len(), table.headers.len());
        }
    }

    #[test]
    fn rows_above_the_header_are_discarded() {
        let m = matrix(&[
            &["Big Banner Title", "", ""],
            &["A", "B", "C"],
            &["1", "2", "3"],
        ]);
        let table = Table::from_matrix(&m, 1, "Sheet1");
        assert_eq!(table.headers, vec!["A", "B", "C"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.meta.header_row_index, 1);
        assert_eq!(table.meta.total_source_rows, 3);
    }

    #[test]
    fn output_format_parses_the_contract_values() {
        assert_eq!(OutputFormat::parse(""), Some(OutputFormat::Spec));
        assert_eq!(OutputFormat::parse("spec"), Some(OutputFormat::Spec));
        assert_eq!(OutputFormat::parse("Table"), Some(OutputFormat::Table));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }

    #[test]
    fn field_value_filters_blank_placeholders() {
        let m = matrix(&[&["ID", "Notes"], &["1", "-"]]);
        let mut table = Table::from_matrix(&m, 0, "Sheet1");
        table.meta.column_map.insert(CanonicalField::Id, 0);
        table.meta.column_map.insert(CanonicalField::Notes, 1);
        let row = table.rows[0].clone();
        assert_eq!(table.field_value(&row, CanonicalField::Id), Some("1"));
        assert_eq!(table.field_value(&row, CanonicalField::Notes), None);
    }

    proptest! {
        #[test]
        fn headers_are_always_unique_and_non_blank(
            raw in proptest::collection::vec("[ a-cA-C]{0,3}", 0..12)
        ) {
            let (headers, _, _) = uniquify_headers(raw);
            for (i, a) in headers.iter().enumerate() {
                prop_assert!(!a.trim().is_empty());
                for b in headers.iter().skip(i + 1) {
                    prop_assert_ne!(a, b);
                }
            }
        }
    }
}
