//! # Geometry & Grid Primitives
//!
//! Rectangles in page-local pixel units, grid placements with row/column
//! spans, and the span math that turns a placement into pixels. All pure
//! functions, no state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in page-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Shrink by `inset` on every side. Never produces negative sizes.
    pub fn inset(&self, inset: f64) -> Rect {
        Rect {
            x: self.x + inset,
            y: self.y + inset,
            width: (self.width - 2.0 * inset).max(0.0),
            height: (self.height - 2.0 * inset).max(0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Dimensions of a template grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

/// A single grid cell, zero-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

/// One image's assigned block of cells within a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Index into the ordered image list the template is applied to.
    pub image_index: usize,
    pub row: usize,
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
}

impl Placement {
    pub fn new(image_index: usize, row: usize, col: usize, row_span: usize, col_span: usize) -> Self {
        Self {
            image_index,
            row,
            col,
            row_span,
            col_span,
        }
    }

    /// Exclusive end row.
    pub fn row_end(&self) -> usize {
        self.row + self.row_span
    }

    /// Exclusive end column.
    pub fn col_end(&self) -> usize {
        self.col + self.col_span
    }

    pub fn area(&self) -> usize {
        self.row_span * self.col_span
    }

    /// Spans are at least one and the block stays inside the grid.
    pub fn fits(&self, grid: GridSize) -> bool {
        self.row_span >= 1
            && self.col_span >= 1
            && self.row_end() <= grid.rows
            && self.col_end() <= grid.cols
    }

    /// Iterate the cells covered by this placement, row-major.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (self.row..self.row_end())
            .flat_map(move |row| (self.col..self.col_end()).map(move |col| GridCell { row, col }))
    }
}

/// The set of cells a placement occupies.
pub fn cells_of(placement: &Placement) -> BTreeSet<GridCell> {
    placement.cells().collect()
}

/// Map a placement to pixels by dividing `area` proportionally into
/// `grid.cols` columns and `grid.rows` rows.
pub fn rect_of(placement: &Placement, grid: GridSize, area: &Rect) -> Rect {
    rect_of_with_gap(placement, grid, area, 0.0)
}

/// Like [`rect_of`], with a fixed gap between adjacent tracks.
///
/// Gaps inside a span are absorbed into the placement, so a block spanning
/// two columns is `2 * cell + gap` wide.
pub fn rect_of_with_gap(placement: &Placement, grid: GridSize, area: &Rect, gap: f64) -> Rect {
    let cols = grid.cols.max(1);
    let rows = grid.rows.max(1);
    let cell_w = track_size(area.width, cols, gap);
    let cell_h = track_size(area.height, rows, gap);

    Rect {
        x: area.x + track_offset(placement.col, cell_w, gap),
        y: area.y + track_offset(placement.row, cell_h, gap),
        width: span_size(placement.col_span, cell_w, gap),
        height: span_size(placement.row_span, cell_h, gap),
    }
}

/// Size of one track when `available` is split into `count` tracks.
fn track_size(available: f64, count: usize, gap: f64) -> f64 {
    let total_gap = gap * count.saturating_sub(1) as f64;
    ((available - total_gap) / count as f64).max(0.0)
}

fn track_offset(index: usize, track: f64, gap: f64) -> f64 {
    index as f64 * (track + gap)
}

fn span_size(span: usize, track: f64, gap: f64) -> f64 {
    let span = span.max(1);
    span as f64 * track + (span - 1) as f64 * gap
}

/// Tolerance-aware half-open overlap of `[a_start, a_end)` and `[b_start, b_end)`.
pub fn intervals_overlap(a_start: f64, a_end: f64, b_start: f64, b_end: f64, tolerance: f64) -> bool {
    !(a_end <= b_start + tolerance || a_start >= b_end - tolerance)
}

/// Whether two rectangles overlap by more than `tolerance` on both axes.
pub fn intersects(a: &Rect, b: &Rect, tolerance: f64) -> bool {
    intervals_overlap(a.x, a.right(), b.x, b.right(), tolerance)
        && intervals_overlap(a.y, a.bottom(), b.y, b.bottom(), tolerance)
}

/// Length of the intersection of two closed intervals (zero if disjoint).
pub fn overlap_length(a_start: f64, a_end: f64, b_start: f64, b_end: f64) -> f64 {
    (a_end.min(b_end) - a_start.max(b_start)).max(0.0)
}
