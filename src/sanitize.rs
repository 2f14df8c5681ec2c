//! Sanitization applied before any data crosses the AI boundary.
//!
//! Bounds are part of the external contract and are bit-exact:
//! at most [`MAX_COLUMN_COUNT`] headers, [`MAX_SAMPLE_ROWS`] representative
//! sample rows drawn from at most [`MAX_INPUT_ROWS`] data rows, and every
//! cell NFKC-normalized then truncated to [`MAX_CELL_LENGTH`] code points
//! with a `"..."` suffix. The sanitizer also infers `source_lang` and a
//! schema hint so the mapping service can anchor its prompt.

use unicode_normalization::UnicodeNormalization;

use crate::fields::SchemaKind;
use crate::matrix::is_blank_cell;

pub const MAX_COLUMN_COUNT: usize = 50;
pub const MAX_SAMPLE_ROWS: usize = 5;
pub const MAX_CELL_LENGTH: usize = 1000;
pub const MAX_INPUT_ROWS: usize = 100;
const TRUNCATION_SUFFIX: &str = "...";
const LANG_SAMPLE_ROWS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLang {
    English,
    Japanese,
}

impl SourceLang {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceLang::English => "en",
            SourceLang::Japanese => "ja",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SanitizedSheet {
    pub headers: Vec<String>,
    pub sample_rows: Vec<Vec<String>>,
    pub source_lang: SourceLang,
    pub schema_hint: Option<SchemaKind>,
}

/// Produces the bounded, normalized view of a sheet for the mapping service.
pub fn sanitize_sheet(headers: &[String], rows: &[Vec<String>]) -> SanitizedSheet {
    let bounded_rows = &rows[..rows.len().min(MAX_INPUT_ROWS)];

    let sanitized_headers: Vec<String> = headers
        .iter()
        .take(MAX_COLUMN_COUNT)
        .map(|header| sanitize_cell(header))
        .collect();

    let sample_rows: Vec<Vec<String>> = representative_indices(bounded_rows)
        .into_iter()
        .map(|index| {
            bounded_rows[index]
                .iter()
                .take(MAX_COLUMN_COUNT)
                .map(|cell| sanitize_cell(cell))
                .collect()
        })
        .collect();

    SanitizedSheet {
        source_lang: detect_source_lang(headers, bounded_rows),
        schema_hint: infer_schema_hint(headers),
        headers: sanitized_headers,
        sample_rows,
    }
}

/// NFKC-normalizes and truncates one cell. Truncation appends `"..."`.
pub fn sanitize_cell(cell: &str) -> String {
    // Normalize before trimming: some compatibility forms decompose to a
    // leading or trailing space that must not survive.
    let normalized: String = cell.nfkc().collect();
    let normalized = normalized.trim().to_string();
    if normalized.chars().count() <= MAX_CELL_LENGTH {
        return normalized;
    }
    let mut truncated: String = normalized.chars().take(MAX_CELL_LENGTH).collect();
    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}

/// Representative sample selection: the first two rows, two near the
/// median, and the last row. All-empty rows are skipped, at most
/// [`MAX_SAMPLE_ROWS`] total.
fn representative_indices(rows: &[Vec<String>]) -> Vec<usize> {
    let populated: Vec<usize> = (0..rows.len())
        .filter(|&index| rows[index].iter().any(|cell| !is_blank_cell(cell)))
        .collect();
    if populated.is_empty() {
        return Vec::new();
    }

    let mut picks = std::collections::BTreeSet::new();
    let last = populated.len() - 1;
    let median = populated.len() / 2;
    for position in [0, 1, median.saturating_sub(1), median, last] {
        if position <= last {
            picks.insert(populated[position]);
        }
    }
    picks.into_iter().take(MAX_SAMPLE_ROWS).collect()
}

/// Latin-vs-Japanese code point estimator over headers and a bounded row
/// sample.
pub fn detect_source_lang(headers: &[String], rows: &[Vec<String>]) -> SourceLang {
    let mut latin = 0usize;
    let mut japanese = 0usize;

    let mut tally = |text: &str| {
        for c in text.chars() {
            if c.is_ascii_alphabetic() {
                latin += 1;
            } else if is_japanese_char(c) {
                japanese += 1;
            }
        }
    };

    for header in headers {
        tally(header);
    }
    for row in rows.iter().take(LANG_SAMPLE_ROWS) {
        for cell in row {
            tally(cell);
        }
    }

    let total = (latin + japanese).max(1) as f64;
    if japanese as f64 / total > latin as f64 / total {
        SourceLang::Japanese
    } else {
        SourceLang::English
    }
}

fn is_japanese_char(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}'   // Hiragana
        | '\u{30A0}'..='\u{30FF}' // Katakana
        | '\u{4E00}'..='\u{9FFF}' // Han
    )
}

/// Keyword-level schema hint from the headers alone.
pub fn infer_schema_hint(headers: &[String]) -> Option<SchemaKind> {
    let joined = headers
        .iter()
        .map(|header| header.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    if joined.contains("endpoint") || joined.contains("method") || joined.contains("メソッド") {
        return Some(SchemaKind::ApiSpec);
    }
    if joined.contains("item name") || joined.contains("項目名") || joined.contains("必須") {
        return Some(SchemaKind::UiSpec);
    }
    if joined.contains("acceptance") || joined.contains("受入") {
        return Some(SchemaKind::Backlog);
    }
    if joined.contains("expected") || joined.contains("期待") || joined.contains("test") {
        return Some(SchemaKind::TestCase);
    }
    if joined.contains("assignee") || joined.contains("担当") {
        return Some(SchemaKind::Issue);
    }
    None
}
