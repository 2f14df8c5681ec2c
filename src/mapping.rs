//! Column-to-canonical-field mapping: synonym lookup plus sample-driven
//! dynamic inference.
//!
//! The synonym pass is deterministic: headers are normalized and looked up
//! in the dictionary, first assignment wins, duplicate synonym hits stay
//! unmapped. Dynamic inference then fills gaps by scoring every still-free
//! canonical field against each unmapped column, combining a header keyword
//! match with statistical evidence over sample cells. A candidate is only
//! accepted when its score clears `ACCEPT_SCORE` *and* leads the runner-up
//! by `MIN_LEAD`; marginal assignments are worse than no assignment.

use std::collections::BTreeMap;

use log::debug;

use crate::fields::{CanonicalField, lookup_synonym, normalize_header};
use crate::header::is_numeric_cell;
use crate::matrix::is_blank_cell;

/// Canonical field → header-column index. Keys are unique by construction;
/// an index is shared between two fields only through the alias table.
pub type ColumnMap = BTreeMap<CanonicalField, usize>;

pub const ACCEPT_SCORE: f64 = 0.62;
pub const MIN_LEAD: f64 = 0.12;
const KEYWORD_SCORE: f64 = 0.62;

#[derive(Debug, Clone, Default)]
pub struct MappingOutcome {
    pub column_map: ColumnMap,
    /// Column indices with no canonical assignment, ascending.
    pub unmapped: Vec<usize>,
}

impl MappingOutcome {
    pub fn recompute_unmapped(&mut self, header_count: usize) {
        let mapped: Vec<usize> = self.column_map.values().copied().collect();
        self.unmapped = (0..header_count)
            .filter(|index| !mapped.contains(index))
            .collect();
    }
}

/// Shared capability of all mapping strategies.
pub trait ColumnMapper {
    fn map_columns(&self, headers: &[String], samples: &[Vec<String>]) -> MappingOutcome;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicMapper;

impl HeuristicMapper {
    /// Deterministic synonym pass only; inference is layered on by the
    /// resolver so it can also run over AI-produced mappings.
    pub fn synonym_pass(&self, headers: &[String]) -> MappingOutcome {
        let mut outcome = MappingOutcome::default();
        for (index, header) in headers.iter().enumerate() {
            let normalized = normalize_header(header);
            match lookup_synonym(&normalized) {
                Some(field) if !outcome.column_map.contains_key(&field) => {
                    outcome.column_map.insert(field, index);
                }
                _ => {}
            }
        }
        outcome.recompute_unmapped(headers.len());
        outcome
    }
}

impl ColumnMapper for HeuristicMapper {
    fn map_columns(&self, headers: &[String], samples: &[Vec<String>]) -> MappingOutcome {
        let mut outcome = self.synonym_pass(headers);
        infer_dynamic(&mut outcome.column_map, headers, samples);
        outcome.recompute_unmapped(headers.len());
        outcome
    }
}

/// Fills mapping gaps by statistical inference. Returns the number of
/// columns assigned.
pub fn infer_dynamic(
    map: &mut ColumnMap,
    headers: &[String],
    samples: &[Vec<String>],
) -> usize {
    let mut inferred = 0;

    for (index, header) in headers.iter().enumerate() {
        if map.values().any(|&mapped| mapped == index) {
            continue;
        }
        let stats = CellStats::collect(samples, index);
        let normalized = normalize_header(header);

        let mut scores: Vec<(CanonicalField, f64)> = CanonicalField::ALL
            .into_iter()
            .filter(|field| !map.contains_key(field))
            .map(|field| (field, score_candidate(field, &normalized, &stats)))
            .collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));

        let Some(&(field, best)) = scores.first() else {
            continue;
        };
        let runner_up = scores.get(1).map(|&(_, score)| score).unwrap_or(0.0);
        if best >= ACCEPT_SCORE && best - runner_up >= MIN_LEAD {
            debug!(
                "inferred column {index} ('{header}') as {field} (score {best:.2}, runner-up {runner_up:.2})"
            );
            map.insert(field, index);
            inferred += 1;
        }
    }

    inferred
}

fn score_candidate(field: CanonicalField, normalized_header: &str, stats: &CellStats) -> f64 {
    let mut score = 0.0;
    if field
        .keywords()
        .iter()
        .any(|keyword| normalized_header.contains(keyword))
    {
        score += KEYWORD_SCORE;
    }
    score += statistical_evidence(field, stats);
    score
}

/// Field-specific evidence weights. Fields without a distinctive cell shape
/// rely on their header keyword alone.
fn statistical_evidence(field: CanonicalField, stats: &CellStats) -> f64 {
    use CanonicalField::*;
    match field {
        Endpoint => (stats.url_ratio + stats.path_ratio).min(1.0) * 0.75,
        Method => stats.http_method_ratio * 0.90,
        StatusCode => stats.http_status_ratio * 0.85,
        Status => stats.status_ratio * 0.80,
        Priority => stats.priority_ratio * 0.85,
        RequiredOptional => stats.required_ratio * 0.85,
        Action => stats.action_ratio * 0.80,
        Id | No => stats.numeric_ratio * 0.65,
        Instructions => stats.multiline_ratio * 0.50 + stats.long_text_ratio * 0.30,
        Description => stats.long_text_ratio * 0.55,
        Notes => stats.note_ratio * 0.40,
        _ => 0.0,
    }
}

/// Ratios computed over the non-blank sample cells of one column.
#[derive(Debug, Clone, Default)]
pub struct CellStats {
    pub samples: usize,
    pub url_ratio: f64,
    pub path_ratio: f64,
    pub numeric_ratio: f64,
    pub long_text_ratio: f64,
    pub multiline_ratio: f64,
    pub status_ratio: f64,
    pub priority_ratio: f64,
    pub required_ratio: f64,
    pub action_ratio: f64,
    pub note_ratio: f64,
    pub http_method_ratio: f64,
    pub http_status_ratio: f64,
}

const STATUS_VALUES: [&str; 17] = [
    "open", "closed", "done", "pass", "passed", "fail", "failed", "todo", "in progress", "wip",
    "blocked", "ok", "ng", "完了", "未着手", "対応中", "保留",
];
const PRIORITY_VALUES: [&str; 14] = [
    "high", "medium", "low", "critical", "major", "minor", "p0", "p1", "p2", "p3", "p4", "高",
    "中", "低",
];
const REQUIRED_VALUES: [&str; 11] = [
    "required", "optional", "yes", "no", "y", "n", "must", "必須", "任意", "○", "×",
];
const HTTP_METHODS: [&str; 7] = ["get", "post", "put", "delete", "patch", "head", "options"];
const ACTION_KEYWORDS: [&str; 13] = [
    "click", "tap", "input", "enter", "select", "press", "open", "navigate", "クリック", "タップ",
    "入力", "押下", "選択",
];

impl CellStats {
    pub fn collect(samples: &[Vec<String>], column: usize) -> Self {
        let cells: Vec<&str> = samples
            .iter()
            .filter_map(|row| row.get(column))
            .map(String::as_str)
            .filter(|cell| !is_blank_cell(cell))
            .collect();

        let mut stats = CellStats {
            samples: cells.len(),
            ..CellStats::default()
        };
        if cells.is_empty() {
            return stats;
        }

        let total = cells.len() as f64;
        let ratio = |count: usize| count as f64 / total;

        stats.url_ratio = ratio(
            cells
                .iter()
                .filter(|cell| cell.starts_with("http://") || cell.starts_with("https://"))
                .count(),
        );
        stats.path_ratio = ratio(cells.iter().filter(|cell| cell.starts_with('/')).count());
        stats.numeric_ratio = ratio(cells.iter().filter(|cell| is_numeric_cell(cell)).count());
        stats.long_text_ratio =
            ratio(cells.iter().filter(|cell| cell.chars().count() > 80).count());
        stats.multiline_ratio = ratio(cells.iter().filter(|cell| cell.contains('\n')).count());
        stats.status_ratio = keyword_set_ratio(&cells, &STATUS_VALUES);
        stats.priority_ratio = keyword_set_ratio(&cells, &PRIORITY_VALUES);
        stats.required_ratio = keyword_set_ratio(&cells, &REQUIRED_VALUES);
        stats.http_method_ratio = keyword_set_ratio(&cells, &HTTP_METHODS);
        stats.http_status_ratio = ratio(
            cells
                .iter()
                .filter(|cell| is_http_status_code(cell))
                .count(),
        );
        stats.action_ratio = ratio(
            cells
                .iter()
                .filter(|cell| {
                    let lowered = cell.to_lowercase();
                    ACTION_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
                })
                .count(),
        );
        // Free-form but short prose reads as a note column.
        stats.note_ratio = ratio(
            cells
                .iter()
                .filter(|cell| {
                    let len = cell.chars().count();
                    (10..=80).contains(&len) && !is_numeric_cell(cell)
                })
                .count(),
        );
        stats
    }
}

fn keyword_set_ratio(cells: &[&str], values: &[&str]) -> f64 {
    let hits = cells
        .iter()
        .filter(|cell| {
            let lowered = cell.trim().to_lowercase();
            values.contains(&lowered.as_str())
        })
        .count();
    hits as f64 / cells.len() as f64
}

fn is_http_status_code(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.len() == 3
        && trimmed.chars().all(|c| c.is_ascii_digit())
        && matches!(trimmed.chars().next(), Some('1'..='5'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn synonym_pass_maps_first_occurrence_and_skips_duplicates() {
        let mapper = HeuristicMapper;
        let outcome = mapper.synonym_pass(&headers(&["ID", "Title", "Summary", "Notes"]));
        assert_eq!(outcome.column_map[&CanonicalField::Id], 0);
        assert_eq!(outcome.column_map[&CanonicalField::Title], 1);
        assert_eq!(outcome.column_map[&CanonicalField::Notes], 3);
        // "Summary" is a Title synonym but Title is taken: column 2 stays
        // unmapped.
        assert_eq!(outcome.unmapped, vec![2]);
    }

    #[test]
    fn japanese_headers_map_through_the_dictionary() {
        let mapper = HeuristicMapper;
        let outcome = mapper.synonym_pass(&headers(&["番号", "項目名", "期待結果", "備考"]));
        assert_eq!(outcome.column_map[&CanonicalField::No], 0);
        assert_eq!(outcome.column_map[&CanonicalField::ItemName], 1);
        assert_eq!(outcome.column_map[&CanonicalField::Expected], 2);
        assert_eq!(outcome.column_map[&CanonicalField::Notes], 3);
    }

    #[test]
    fn inference_accepts_a_clear_statistical_winner() {
        let mut map = ColumnMap::new();
        let hdrs = headers(&["HTTP Verb"]);
        let samples = rows(&[&["GET"], &["POST"], &["DELETE"], &["GET"]]);
        let inferred = infer_dynamic(&mut map, &hdrs, &samples);
        assert_eq!(inferred, 1);
        assert_eq!(map[&CanonicalField::Method], 0);
    }

    #[test]
    fn inference_rejects_marginal_candidates_without_a_lead() {
        // A purely numeric column with an uninformative header is claimable
        // by both `id` and `no` at the same score: the two-gap rule rejects
        // both.
        let mut map = ColumnMap::new();
        let hdrs = headers(&["Value"]);
        let samples = rows(&[&["1"], &["2"], &["3"]]);
        assert_eq!(infer_dynamic(&mut map, &hdrs, &samples), 0);
        assert!(map.is_empty());
    }

    #[test]
    fn keyword_breaks_the_numeric_tie() {
        let mut map = ColumnMap::new();
        let hdrs = headers(&["Test No."]);
        let samples = rows(&[&["1"], &["2"], &["3"]]);
        assert_eq!(infer_dynamic(&mut map, &hdrs, &samples), 1);
        assert_eq!(map[&CanonicalField::No], 0);
    }

    #[test]
    fn inference_never_reassigns_a_taken_field_or_column() {
        let mapper = HeuristicMapper;
        let hdrs = headers(&["Status", "Condition"]);
        let samples = rows(&[&["open", "open"], &["done", "closed"]]);
        let outcome = mapper.map_columns(&hdrs, &samples);
        // Column 0 took `status` via synonym; column 1's status-like cells
        // cannot claim it again.
        assert_eq!(outcome.column_map[&CanonicalField::Status], 0);
        assert_eq!(
            outcome.column_map.values().filter(|&&idx| idx == 0).count(),
            1
        );
    }

    #[test]
    fn http_status_cells_are_detected() {
        assert!(is_http_status_code("200"));
        assert!(is_http_status_code("404"));
        assert!(!is_http_status_code("999"));
        assert!(!is_http_status_code("20"));
        assert!(!is_http_status_code("abc"));
    }

    #[test]
    fn stats_ignore_blank_and_placeholder_cells() {
        let samples = rows(&[&["-"], &[""], &["GET"]]);
        let stats = CellStats::collect(&samples, 0);
        assert_eq!(stats.samples, 1);
        assert_eq!(stats.http_method_ratio, 1.0);
    }
}
