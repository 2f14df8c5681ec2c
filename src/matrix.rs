//! Rectangular cell matrix: the normalized 2-D view every detector works on.
//!
//! After [`CellMatrix::normalize`] every row has the same column count
//! (padded with empty strings), every cell is trimmed, and fully empty rows
//! are gone. The column count is the maximum over the original rows.

/// Placeholder glyphs treated as empty by downstream logic.
const EMPTY_MARKERS: [&str; 2] = ["-", "–"];

pub fn is_blank_cell(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || EMPTY_MARKERS.contains(&trimmed)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellMatrix {
    rows: Vec<Vec<String>>,
    columns: usize,
}

impl CellMatrix {
    /// Builds a normalized matrix from raw records: trims cells, removes
    /// fully empty rows, and pads every row to the widest record.
    pub fn normalize(raw: Vec<Vec<String>>) -> Self {
        let mut rows: Vec<Vec<String>> = raw
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.trim().to_string())
                    .collect::<Vec<_>>()
            })
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(columns, String::new());
        }

        Self { rows, columns }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column)).map(String::as_str)
    }

    /// Iterates one column top to bottom.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(move |row| row.get(index).map(String::as_str))
    }

    pub fn non_empty_in_column(&self, index: usize) -> usize {
        self.column(index).filter(|cell| !is_blank_cell(cell)).count()
    }

    /// Replaces a single cell in place. Out-of-range coordinates are a
    /// no-op; the matrix stays rectangular.
    pub fn replace_cell(&mut self, row: usize, column: usize, value: impl Into<String>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value.into().trim().to_string();
        }
    }

    /// Extracts a sub-matrix over `[row_start, row_end)` × `[col_start, col_end)`
    /// and renormalizes it.
    pub fn slice(
        &self,
        row_start: usize,
        row_end: usize,
        col_start: usize,
        col_end: usize,
    ) -> Self {
        let raw = self
            .rows
            .iter()
            .skip(row_start)
            .take(row_end.saturating_sub(row_start))
            .map(|row| {
                row.iter()
                    .skip(col_start)
                    .take(col_end.saturating_sub(col_start))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        Self::normalize(raw)
    }
}
