//! The table renderer: front-matter plus one header-preserving Markdown
//! table. Columns are exactly the input headers in source order.

use std::fmt::Write as _;

use crate::error::ConvertError;
use crate::model::Table;
use crate::render::{escape_table_cell, front_matter, separator_line, table_line};

pub fn render(table: &Table) -> Result<String, ConvertError> {
    let mut output = front_matter(&table.sheet_name, "table")?;
    let _ = write!(output, "# {}\n\n", table.sheet_name);

    let headers: Vec<String> = table.headers.iter().map(|h| escape_table_cell(h)).collect();
    output.push_str(&table_line(&headers));
    output.push_str(&separator_line(table.headers.len()));
    for row in &table.rows {
        let cells: Vec<String> = row.iter().map(|cell| escape_table_cell(cell)).collect();
        output.push_str(&table_line(&cells));
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::CellMatrix;

    fn table(rows: &[&[&str]]) -> Table {
        let matrix = CellMatrix::normalize(
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        );
        Table::from_matrix(&matrix, 0, "Sheet1")
    }

    #[test]
    fn columns_match_the_source_headers_in_order() {
        let rendered = render(&table(&[
            &["ID", "Title", "Status"],
            &["1", "Login", "open"],
        ]))
        .expect("render");
        assert!(rendered.contains("| ID | Title | Status |"));
        assert!(rendered.contains("| --- | --- | --- |"));
        assert!(rendered.contains("| 1 | Login | open |"));
    }

    #[test]
    fn pipes_and_newlines_are_escaped_in_cells() {
        let rendered = render(&table(&[
            &["A", "B"],
            &["x|y", "line1\nline2"],
        ]))
        .expect("render");
        assert!(rendered.contains("x\\|y"));
        assert!(rendered.contains("line1 line2"));
        assert!(!rendered.contains("<br>"));
    }

    #[test]
    fn placeholder_cells_render_empty() {
        let rendered = render(&table(&[&["A", "B"], &["1", "-"]])).expect("render");
        assert!(rendered.contains("| 1 |  |"));
    }
}
