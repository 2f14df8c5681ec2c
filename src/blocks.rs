//! Block detection over wide sheets.
//!
//! Multilingual exports often place several independent tables side by side
//! in one sheet. A column is *active* when it has at least two non-empty
//! cells and either content in the top ten rows or a fill density of 20% or
//! more; contiguous runs of active columns at least two wide become
//! candidate blocks. Each block is tightened to its populated row range and
//! renormalized. Blocks too small to carry a header plus data fall away; if
//! nothing qualifies the whole matrix is the single block.

use log::debug;

use crate::matrix::{CellMatrix, is_blank_cell};

const MIN_ACTIVE_CELLS: usize = 2;
const TOP_ROWS: usize = 10;
const MIN_DENSITY: f64 = 0.20;
const MIN_BLOCK_WIDTH: usize = 2;

#[derive(Debug, Clone)]
pub struct Block {
    pub matrix: CellMatrix,
    /// Column range `[start, end)` in the source matrix.
    pub columns: (usize, usize),
    /// Row range `[start, end)` in the source matrix.
    pub rows: (usize, usize),
}

pub fn detect_blocks(matrix: &CellMatrix) -> Vec<Block> {
    if matrix.is_empty() {
        return Vec::new();
    }

    let active: Vec<bool> = (0..matrix.column_count())
        .map(|col| is_active_column(matrix, col))
        .collect();

    let mut blocks = Vec::new();
    let mut run_start: Option<usize> = None;
    for (col, &is_active) in active.iter().chain(std::iter::once(&false)).enumerate() {
        match (is_active, run_start) {
            (true, None) => run_start = Some(col),
            (false, Some(start)) => {
                run_start = None;
                if col - start >= MIN_BLOCK_WIDTH
                    && let Some(block) = build_block(matrix, start, col)
                {
                    blocks.push(block);
                }
            }
            _ => {}
        }
    }

    if blocks.is_empty() {
        debug!("no qualifying blocks; using the whole matrix");
        return vec![Block {
            matrix: matrix.clone(),
            columns: (0, matrix.column_count()),
            rows: (0, matrix.row_count()),
        }];
    }

    debug!("detected {} block(s)", blocks.len());
    blocks
}

fn is_active_column(matrix: &CellMatrix, col: usize) -> bool {
    let non_empty = matrix.non_empty_in_column(col);
    if non_empty < MIN_ACTIVE_CELLS {
        return false;
    }
    let top_content = matrix
        .column(col)
        .take(TOP_ROWS)
        .any(|cell| !is_blank_cell(cell));
    let density = non_empty as f64 / matrix.row_count() as f64;
    top_content || density >= MIN_DENSITY
}

/// Tightens the candidate column run to its populated row range, then
/// renormalizes. Returns `None` when the region cannot carry header + data.
fn build_block(matrix: &CellMatrix, col_start: usize, col_end: usize) -> Option<Block> {
    let populated: Vec<usize> = (0..matrix.row_count())
        .filter(|&row| {
            (col_start..col_end)
                .any(|col| matrix.cell(row, col).is_some_and(|cell| !is_blank_cell(cell)))
        })
        .collect();
    let (&first, &last) = (populated.first()?, populated.last()?);

    let sliced = matrix.slice(first, last + 1, col_start, col_end);
    if sliced.row_count() < 2 || sliced.column_count() < 2 {
        return None;
    }
    Some(Block {
        matrix: sliced,
        columns: (col_start, col_end),
        rows: (first, last + 1),
    })
}

/// A scored candidate for block selection.
#[derive(Debug, Clone, Copy)]
pub struct BlockCandidate {
    /// Header-detection confidence mapped to `[0, 1]`.
    pub quality: f64,
    pub rows: usize,
    pub cols: usize,
}

const WIDE_COLS: usize = 4;
const NARROW_COLS: usize = 2;
const COMPARABLE_QUALITY: f64 = 0.15;

/// Picks the block to convert. Narrow blocks are ignored outright when any
/// wide structured block exists; among the survivors, comparable quality is
/// broken by width and then by row count, otherwise quality wins.
pub fn select_block(candidates: &[BlockCandidate]) -> usize {
    debug_assert!(!candidates.is_empty());
    if candidates.len() == 1 {
        return 0;
    }

    let wide_exists = candidates
        .iter()
        .any(|c| c.cols >= WIDE_COLS && c.rows >= 2);
    let eligible: Vec<usize> = (0..candidates.len())
        .filter(|&i| !wide_exists || candidates[i].cols > NARROW_COLS)
        .collect();
    let eligible = if eligible.is_empty() {
        (0..candidates.len()).collect()
    } else {
        eligible
    };

    let mut best = eligible[0];
    for &index in &eligible[1..] {
        if prefers(&candidates[index], &candidates[best]) {
            best = index;
        }
    }
    best
}

fn prefers(candidate: &BlockCandidate, incumbent: &BlockCandidate) -> bool {
    if (candidate.quality - incumbent.quality).abs() <= COMPARABLE_QUALITY {
        (candidate.cols, candidate.rows) > (incumbent.cols, incumbent.rows)
    } else {
        candidate.quality > incumbent.quality
    }
}
