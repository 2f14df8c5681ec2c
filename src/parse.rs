//! Delimited-text parsing with continuation-row repair.
//!
//! Accepts arbitrary pasted text and produces a normalized [`CellMatrix`]:
//!
//! - A first non-empty line containing a tab dispatches to the TSV path
//!   (quoting disabled; real-world TSV exports are not RFC 4180).
//! - Otherwise the CSV path runs with lax quoting and variable-width
//!   records; on a parse failure a simple line splitter takes over, electing
//!   the delimiter from `{'\t', ',', ';', '|'}` that maximizes
//!   `(lines yielding >1 column, modal column count)`.
//! - Records are then repaired: rows with at most one non-empty cell are
//!   continuations of the previous record (joined into its longest-content
//!   column), and every data row is normalized to the width of the first
//!   record that splits into columns.
//!
//! Continuation merges are soft repairs; they surface as a single
//! `PARSING_WARNING` carrying the merge count, never as an error.

use csv::ReaderBuilder;
use itertools::Itertools;
use log::debug;

use crate::matrix::{CellMatrix, is_blank_cell};
use crate::warnings::{self, Category, Warning};

const CANDIDATE_DELIMITERS: [char; 4] = ['\t', ',', ';', '|'];

#[derive(Debug)]
pub struct ParseOutcome {
    pub matrix: CellMatrix,
    pub warnings: Vec<Warning>,
}

/// Parses raw text into a normalized cell matrix.
pub fn parse_delimited(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome {
        matrix: CellMatrix::default(),
        warnings: Vec::new(),
    };

    let Some(first_line) = text.lines().find(|line| !line.trim().is_empty()) else {
        return outcome;
    };

    let records = if first_line.contains('\t') {
        read_records(text, b'\t', false).unwrap_or_else(|err| {
            debug!("TSV parse failed ({err}); falling back to line splitter");
            split_lines(text)
        })
    } else {
        match read_records(text, b',', true) {
            // A single-column result means the comma reader found nothing to
            // split; let the delimiter election try the other candidates.
            Ok(records) if record_width(&records) > 1 => records,
            Ok(_) => split_lines(text),
            Err(err) => {
                debug!("CSV parse failed ({err}); falling back to line splitter");
                split_lines(text)
            }
        }
    };

    let (repaired, merges) = repair_records(records);
    if merges > 0 {
        outcome.warnings.push(
            Warning::warn(
                warnings::PARSING_WARNING,
                Category::Input,
                format!("{merges} continuation row(s) were merged into the preceding record"),
            )
            .with_hint("check rows with multiline cells; the source export split them without quoting")
            .with_details(serde_json::json!({ "continuation_merges": merges })),
        );
    }

    outcome.matrix = CellMatrix::normalize(repaired);
    outcome
}

fn record_width(records: &[Vec<String>]) -> usize {
    records.iter().map(Vec::len).max().unwrap_or(0)
}

fn read_records(text: &str, delimiter: u8, quoting: bool) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .quoting(quoting)
        .double_quote(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}

/// Splits on the elected delimiter, line by line. Last resort when the CSV
/// reader rejects the input outright.
fn split_lines(text: &str) -> Vec<Vec<String>> {
    let delimiter = elect_delimiter(text);
    debug!("elected delimiter {delimiter:?} for line splitting");
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(delimiter).map(str::to_string).collect())
        .collect()
}

/// Chooses the delimiter maximizing `(lines yielding >1 column, modal column
/// count)` across the candidate set.
fn elect_delimiter(text: &str) -> char {
    let lines: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();

    CANDIDATE_DELIMITERS
        .into_iter()
        .map(|candidate| {
            let counts: Vec<usize> = lines
                .iter()
                .map(|line| line.split(candidate).count())
                .collect();
            let multi_lines = counts.iter().filter(|&&count| count > 1).count();
            let modal = counts
                .iter()
                .copied()
                .counts()
                .into_iter()
                .max_by_key(|&(count, freq)| (freq, count))
                .map(|(count, _)| count)
                .unwrap_or(1);
            (multi_lines, modal, candidate)
        })
        .max_by_key(|&(multi, modal, _)| (multi, modal))
        .map(|(_, _, candidate)| candidate)
        .unwrap_or('\t')
}

/// Applies continuation-row repair and width normalization. Returns the
/// repaired records and the number of continuation merges performed.
///
/// The expected width comes from the first record that actually splits into
/// columns, so a single-cell title banner above the header cannot collapse
/// the sheet.
fn repair_records(records: Vec<Vec<String>>) -> (Vec<Vec<String>>, usize) {
    let expected_width = records
        .iter()
        .map(Vec::len)
        .find(|&len| len > 1)
        .or_else(|| records.first().map(Vec::len))
        .unwrap_or(0);

    let mut repaired: Vec<Vec<String>> = Vec::with_capacity(records.len());
    let mut merges = 0usize;

    for record in records {
        let non_empty = record.iter().filter(|cell| !cell.trim().is_empty()).count();
        if non_empty == 0 {
            continue;
        }

        if non_empty == 1
            && let Some(previous) = repaired.last_mut()
        {
            // Continuation of the previous record: append to its
            // longest-content column, the likeliest split point.
            let content = record
                .iter()
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
                .join("\n");
            let target = longest_column(previous);
            let cell = &mut previous[target];
            if !cell.is_empty() {
                cell.push('\n');
            }
            cell.push_str(&content);
            merges += 1;
            continue;
        }

        repaired.push(normalize_width(record, expected_width));
    }

    (repaired, merges)
}

fn longest_column(record: &[String]) -> usize {
    record
        .iter()
        .enumerate()
        .max_by_key(|(index, cell)| (cell.chars().count(), std::cmp::Reverse(*index)))
        .map(|(index, _)| index)
        .unwrap_or(0)
}

/// Normalizes a data record to the expected width.
///
/// Shorter records are padded; when the original record was narrower than
/// expected, interior empty cells (spurious tabs) are removed up to the
/// padding count, each removal compensated with a trailing empty so the
/// width is preserved. Wider records collapse interior empties right to
/// left, then concatenate the remaining overflow into the last column.
fn normalize_width(mut record: Vec<String>, width: usize) -> Vec<String> {
    use std::cmp::Ordering;

    match record.len().cmp(&width) {
        Ordering::Equal => record,
        Ordering::Less => {
            let mut shift_budget = width - record.len();
            record.resize(width, String::new());
            while shift_budget > 0 {
                let Some(spurious) = interior_empty_index(&record) else {
                    break;
                };
                record.remove(spurious);
                record.push(String::new());
                shift_budget -= 1;
            }
            record
        }
        Ordering::Greater => {
            let mut index = record.len();
            while record.len() > width && index > 0 {
                index -= 1;
                if record[index].trim().is_empty() {
                    record.remove(index);
                }
            }
            if record.len() > width {
                let overflow = record.split_off(width - 1);
                let joined = overflow
                    .iter()
                    .map(|cell| cell.trim())
                    .filter(|cell| !is_blank_cell(cell))
                    .join(" ");
                record.push(joined);
            }
            record
        }
    }
}

/// First empty cell that still has non-empty content to its right.
fn interior_empty_index(record: &[String]) -> Option<usize> {
    let last_content = record
        .iter()
        .rposition(|cell| !cell.trim().is_empty())?;
    record[..last_content]
        .iter()
        .position(|cell| cell.trim().is_empty())
}
