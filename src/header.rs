//! Header-row detection with a 0–100 confidence score.
//!
//! Each of the first five rows is scored on synonym hits, header-likeness,
//! and separation from the row below it; rows dominated by data-looking
//! cells (numbers, long prose, emails, URLs) score zero. The best row wins,
//! ties going to the earlier row.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::fields::{is_synonym, normalize_header};
use crate::matrix::{CellMatrix, is_blank_cell};

const ROWS_TO_SCAN: usize = 5;
const SYNONYM_POINTS: u32 = 25;
const HEADERISH_POINTS: u32 = 5;
const SEPARATION_CAP: u32 = 20;

#[derive(Debug, Clone, Copy)]
pub struct HeaderDetection {
    pub row_index: usize,
    pub confidence: u32,
}

pub fn detect_header(matrix: &CellMatrix) -> HeaderDetection {
    let mut best = HeaderDetection {
        row_index: 0,
        confidence: 0,
    };

    for index in 0..matrix.row_count().min(ROWS_TO_SCAN) {
        let score = score_row(matrix, index);
        if score > best.confidence {
            best = HeaderDetection {
                row_index: index,
                confidence: score,
            };
        }
    }

    best.confidence = best.confidence.min(100);
    debug!(
        "header row {} with confidence {}",
        best.row_index, best.confidence
    );
    best
}

fn score_row(matrix: &CellMatrix, index: usize) -> u32 {
    let Some(row) = matrix.row(index) else {
        return 0;
    };

    if row.iter().any(|cell| starts_with_markdown_marker(cell)) {
        return 0;
    }

    let non_empty: Vec<&str> = row
        .iter()
        .map(String::as_str)
        .filter(|cell| !is_blank_cell(cell))
        .collect();
    if non_empty.len() < 2 {
        return 0;
    }

    let data_like = non_empty.iter().filter(|cell| looks_like_data(cell)).count();
    if data_like * 2 > non_empty.len() {
        return 0;
    }

    let synonym_hits = non_empty
        .iter()
        .filter(|cell| is_synonym(&normalize_header(cell)))
        .count();
    let headerish = non_empty
        .iter()
        .filter(|cell| looks_like_header(cell))
        .count();

    let mut score = synonym_hits as u32 * SYNONYM_POINTS + headerish as u32 * HEADERISH_POINTS;
    if synonym_hits >= 3 {
        score += 30;
    } else if synonym_hits >= 2 {
        score += 20;
    }
    score += separation_bonus(matrix, index);
    score
}

/// Rewards rows whose cells contrast with the row directly below: headers
/// over numeric data, short labels over long values, uppercase labels.
fn separation_bonus(matrix: &CellMatrix, index: usize) -> u32 {
    let Some(header) = matrix.row(index) else {
        return 0;
    };
    let Some(next) = matrix.row(index + 1) else {
        return 0;
    };

    let mut bonus = 0;
    for (cell, below) in header.iter().zip(next.iter()) {
        if is_blank_cell(cell) || is_blank_cell(below) {
            continue;
        }
        if is_numeric_cell(below) && !is_numeric_cell(cell) {
            bonus += 8;
        }
        if below.chars().count() >= cell.chars().count() + 8 {
            bonus += 6;
        }
        if is_uppercase_label(cell) {
            bonus += 6;
        }
        if bonus >= SEPARATION_CAP {
            return SEPARATION_CAP;
        }
    }
    bonus.min(SEPARATION_CAP)
}

fn starts_with_markdown_marker(cell: &str) -> bool {
    let trimmed = cell.trim_start();
    trimmed.starts_with('#')
        || trimmed.starts_with('>')
        || trimmed.starts_with("```")
        || trimmed.starts_with("- ")
        || trimmed.starts_with("* ")
}

fn looks_like_header(cell: &str) -> bool {
    cell.chars().count() <= 50
        && !cell.chars().next().is_some_and(|c| c.is_ascii_digit())
        && !cell.contains(". ")
        && cell.split_whitespace().count() <= 3
}

fn looks_like_data(cell: &str) -> bool {
    is_numeric_cell(cell)
        || cell.contains('\n')
        || cell.chars().count() > 100
        || cell.contains('@')
        || cell.contains("http")
}

pub(crate) fn is_numeric_cell(cell: &str) -> bool {
    static NUMERIC: OnceLock<Regex> = OnceLock::new();
    let pattern = NUMERIC.get_or_init(|| Regex::new(r"^-?[0-9][0-9.,]*$").expect("numeric regex"));
    pattern.is_match(cell.trim())
}

fn is_uppercase_label(cell: &str) -> bool {
    let mut saw_alpha = false;
    for c in cell.chars() {
        if c.is_alphabetic() {
            saw_alpha = true;
            if c.is_lowercase() {
                return false;
            }
        }
    }
    saw_alpha
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[&[&str]]) -> CellMatrix {
        CellMatrix::normalize(
            rows.iter()
                .map(|row| row.iter().map(|cell| cell.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn title_row_is_skipped_in_favor_of_the_real_header() {
        let m = matrix(&[
            &["Authentication Test Cases", "", ""],
            &["Feature", "Description", "Expected"],
            &["Login", "User can log in", "Session starts"],
        ]);
        let detection = detect_header(&m);
        assert_eq!(detection.row_index, 1);
        assert!(detection.confidence >= 50);
    }

    #[test]
    fn synonym_rich_rows_reach_full_confidence() {
        let m = matrix(&[
            &["ID", "Priority", "Status", "Notes"],
            &["1", "High", "open", "first run"],
        ]);
        let detection = detect_header(&m);
        assert_eq!(detection.row_index, 0);
        assert_eq!(detection.confidence, 100);
    }

    #[test]
    fn data_dominated_rows_score_zero() {
        let m = matrix(&[
            &["123", "456", "789"],
            &["Feature", "Expected", "Status"],
        ]);
        let detection = detect_header(&m);
        assert_eq!(detection.row_index, 1);
    }

    #[test]
    fn markdown_markers_disqualify_a_row() {
        let m = matrix(&[
            &["# Heading", "Feature", "Status"],
            &["Feature", "Expected", "Status"],
        ]);
        assert_eq!(detect_header(&m).row_index, 1);
    }

    #[test]
    fn numeric_separation_lifts_plain_headers() {
        let m = matrix(&[
            &["Alpha", "Beta"],
            &["12", "873"],
        ]);
        let detection = detect_header(&m);
        assert_eq!(detection.row_index, 0);
        assert!(detection.confidence > 0);
    }

    #[test]
    fn numeric_cells_are_recognized() {
        assert!(is_numeric_cell("42"));
        assert!(is_numeric_cell("1,234.5"));
        assert!(is_numeric_cell("-7"));
        assert!(!is_numeric_cell("v1.2"));
        assert!(!is_numeric_cell("twelve"));
    }
}
