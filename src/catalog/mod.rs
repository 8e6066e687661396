//! # Layout Template Catalog
//!
//! Maps `(page aspect class, image count)` to a ranked list of grid
//! templates. Templates are validated once, when the catalog is built;
//! anything the validator rejects is dropped with a warning, and a bucket
//! that ends up empty is a configuration error. A built catalog is an
//! immutable value handed to the engine, never a global.
//!
//! ## Ranking
//!
//! Within a bucket templates are ordered by a balance score (lower first):
//! how far each placement is from a square tile on a reference page of that
//! aspect, plus how uneven the placement areas are, plus the fraction of
//! empty cells. Ties fall back to the template id, so ordering is stable.
//!
//! ## Adaptation
//!
//! When no bucket exists for an exact count, templates from the nearest
//! supported count are adapted (see [`adapt`]):
//! - fewer images: drop the last placement and let a neighbour that shares
//!   a full edge absorb its cells;
//! - more images: split the last placement that spans more than one cell,
//!   doubling the grid resolution first if every placement is a single cell.

pub mod builtin;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};
use crate::geometry::{GridSize, Placement};
use crate::validate::validate;

/// Coarse page shape used to bucket templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageAspectClass {
    Landscape,
    Portrait,
    Square,
}

impl PageAspectClass {
    pub const ALL: [PageAspectClass; 3] = [
        PageAspectClass::Landscape,
        PageAspectClass::Portrait,
        PageAspectClass::Square,
    ];

    /// Bucket a page by its width/height ratio. Ratios within roughly 15%
    /// of 1:1 count as square.
    pub fn classify(width: f64, height: f64) -> Self {
        if height <= 0.0 {
            return PageAspectClass::Landscape;
        }
        let ratio = width / height;
        if ratio > 1.15 {
            PageAspectClass::Landscape
        } else if ratio < 0.87 {
            PageAspectClass::Portrait
        } else {
            PageAspectClass::Square
        }
    }

    /// (width, height) of the page used to score templates for this class.
    fn reference_size(self) -> (f64, f64) {
        match self {
            PageAspectClass::Landscape => (3.0, 2.0),
            PageAspectClass::Portrait => (2.0, 3.0),
            PageAspectClass::Square => (1.0, 1.0),
        }
    }
}

impl fmt::Display for PageAspectClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageAspectClass::Landscape => "landscape",
            PageAspectClass::Portrait => "portrait",
            PageAspectClass::Square => "square",
        };
        f.write_str(name)
    }
}

/// A fixed grid and one placement per image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutTemplate {
    pub id: String,
    pub grid: GridSize,
    pub placements: Vec<Placement>,
}

impl LayoutTemplate {
    pub fn image_count(&self) -> usize {
        self.placements.len()
    }

    /// Placement for the `index`-th image, if the template has one.
    pub fn placement_for(&self, index: usize) -> Option<&Placement> {
        self.placements.iter().find(|p| p.image_index == index)
    }

    /// Parse an ASCII-art template. Each letter is one image (`A` is image 0,
    /// `B` image 1, ...) and `.` is an empty cell. Every letter must fill a
    /// rectangle and letters must be contiguous from `A`.
    ///
    /// ```text
    /// AAB
    /// AAC
    /// ```
    pub fn from_rows(id: &str, rows: &[&str]) -> Result<Self> {
        let bad = |msg: String| LayoutError::Config(format!("template '{id}': {msg}"));

        let height = rows.len();
        let width = rows.first().map(|r| r.chars().count()).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(bad("empty pattern".to_string()));
        }

        // letter → (min_row, min_col, max_row, max_col, cell count)
        let mut bounds: BTreeMap<char, (usize, usize, usize, usize, usize)> = BTreeMap::new();
        for (r, line) in rows.iter().enumerate() {
            if line.chars().count() != width {
                return Err(bad(format!("row {r} has a different width")));
            }
            for (c, ch) in line.chars().enumerate() {
                if ch == '.' {
                    continue;
                }
                if !ch.is_ascii_uppercase() {
                    return Err(bad(format!("unexpected '{ch}'")));
                }
                let entry = bounds.entry(ch).or_insert((r, c, r, c, 0));
                entry.0 = entry.0.min(r);
                entry.1 = entry.1.min(c);
                entry.2 = entry.2.max(r);
                entry.3 = entry.3.max(c);
                entry.4 += 1;
            }
        }

        let mut placements = Vec::with_capacity(bounds.len());
        for (i, (ch, (r0, c0, r1, c1, count))) in bounds.into_iter().enumerate() {
            if (ch as u8 - b'A') as usize != i {
                return Err(bad(format!("letters must run from A without gaps, found '{ch}'")));
            }
            let row_span = r1 - r0 + 1;
            let col_span = c1 - c0 + 1;
            if row_span * col_span != count {
                return Err(bad(format!("'{ch}' is not a rectangle")));
            }
            placements.push(Placement::new(i, r0, c0, row_span, col_span));
        }

        Ok(LayoutTemplate {
            id: id.to_string(),
            grid: GridSize::new(height, width),
            placements,
        })
    }

    /// `count` images filled row-major into `cols` columns. When the last
    /// row is short, its final image stretches over the leftover cells.
    pub fn uniform(count: usize, cols: usize) -> Self {
        let cols = cols.max(1);
        let rows = count.div_ceil(cols).max(1);
        let mut placements = Vec::with_capacity(count);
        for i in 0..count {
            placements.push(Placement::new(i, i / cols, i % cols, 1, 1));
        }
        let leftover = rows * cols - count;
        if let Some(last) = placements.last_mut() {
            last.col_span += leftover;
        }
        LayoutTemplate {
            id: format!("grid-{rows}x{cols}"),
            grid: GridSize::new(rows, cols),
            placements,
        }
    }

    /// Mirror across the main diagonal (rows become columns).
    pub fn transpose(&self, id: &str) -> Self {
        LayoutTemplate {
            id: id.to_string(),
            grid: GridSize::new(self.grid.cols, self.grid.rows),
            placements: self
                .placements
                .iter()
                .map(|p| Placement::new(p.image_index, p.col, p.row, p.col_span, p.row_span))
                .collect(),
        }
    }

    /// Whether no grid row crosses more than `max_per_row` placements and
    /// no grid column crosses more than `max_per_column`.
    pub fn fits_track_limits(&self, max_per_row: usize, max_per_column: usize) -> bool {
        let in_row = |r: usize| self.placements.iter().filter(|p| p.row <= r && r < p.row_end()).count();
        let in_col = |c: usize| self.placements.iter().filter(|p| p.col <= c && c < p.col_end()).count();
        (0..self.grid.rows).all(|r| in_row(r) <= max_per_row)
            && (0..self.grid.cols).all(|c| in_col(c) <= max_per_column)
    }

    /// Geometry-only identity, used to drop duplicate templates.
    fn signature(&self) -> (GridSize, Vec<(usize, usize, usize, usize, usize)>) {
        let mut cells: Vec<_> = self
            .placements
            .iter()
            .map(|p| (p.image_index, p.row, p.col, p.row_span, p.col_span))
            .collect();
        cells.sort_unstable();
        (self.grid, cells)
    }
}

/// Lower is more balanced.
pub fn balance_score(template: &LayoutTemplate, aspect: PageAspectClass) -> f64 {
    let n = template.placements.len();
    if n == 0 || template.grid.cell_count() == 0 {
        return f64::INFINITY;
    }
    let (ref_w, ref_h) = aspect.reference_size();
    let cell_w = ref_w / template.grid.cols as f64;
    let cell_h = ref_h / template.grid.rows as f64;

    let shape = template
        .placements
        .iter()
        .map(|p| {
            let w = p.col_span as f64 * cell_w;
            let h = p.row_span as f64 * cell_h;
            (w / h).ln().abs()
        })
        .sum::<f64>()
        / n as f64;

    let areas: Vec<f64> = template.placements.iter().map(|p| p.area() as f64).collect();
    let mean = areas.iter().sum::<f64>() / n as f64;
    let variance = areas.iter().map(|a| (a - mean).powi(2)).sum::<f64>() / n as f64;
    let unevenness = variance.sqrt() / mean;

    let used: usize = template.placements.iter().map(|p| p.area()).sum();
    let empty = 1.0 - used as f64 / template.grid.cell_count() as f64;

    shape + 0.5 * unevenness + empty.max(0.0)
}

/// Adapt `template` to hold exactly `target` images.
///
/// The result may still fail validation (a merge can leave a hole);
/// callers validate before use.
pub fn adapt(template: &LayoutTemplate, target: usize) -> LayoutTemplate {
    let mut grid = template.grid;
    let mut placements = template.placements.clone();
    placements.sort_by_key(|p| p.image_index);

    while placements.len() > target {
        let Some(dropped) = placements.pop() else {
            break;
        };
        if let Some(neighbour) = placements.iter_mut().find(|q| shares_full_edge(q, &dropped)) {
            absorb(neighbour, &dropped);
        }
    }

    while placements.len() < target {
        let next_index = placements.len();
        let splittable = placements
            .iter()
            .rposition(|p| p.row_span > 1 || p.col_span > 1);
        match splittable {
            Some(pos) => {
                let p = placements[pos];
                let (kept, split) = if p.col_span >= p.row_span {
                    let right = p.col_span / 2;
                    let left = p.col_span - right;
                    (
                        Placement::new(p.image_index, p.row, p.col, p.row_span, left),
                        Placement::new(next_index, p.row, p.col + left, p.row_span, right),
                    )
                } else {
                    let lower = p.row_span / 2;
                    let upper = p.row_span - lower;
                    (
                        Placement::new(p.image_index, p.row, p.col, upper, p.col_span),
                        Placement::new(next_index, p.row + upper, p.col, lower, p.col_span),
                    )
                };
                placements[pos] = kept;
                placements.push(split);
            }
            None => {
                // Every placement is one cell: double the resolution along
                // the shorter axis so each block becomes splittable.
                if grid.cols <= grid.rows {
                    grid.cols *= 2;
                    for p in &mut placements {
                        p.col *= 2;
                        p.col_span *= 2;
                    }
                } else {
                    grid.rows *= 2;
                    for p in &mut placements {
                        p.row *= 2;
                        p.row_span *= 2;
                    }
                }
            }
        }
    }

    LayoutTemplate {
        id: format!("{}~{}", template.id, target),
        grid,
        placements,
    }
}

/// `a` and `b` touch along an entire side, so their union is a rectangle.
fn shares_full_edge(a: &Placement, b: &Placement) -> bool {
    let same_rows = a.row == b.row && a.row_span == b.row_span;
    let same_cols = a.col == b.col && a.col_span == b.col_span;
    (same_rows && (a.col_end() == b.col || b.col_end() == a.col))
        || (same_cols && (a.row_end() == b.row || b.row_end() == a.row))
}

fn absorb(into: &mut Placement, other: &Placement) {
    let row = into.row.min(other.row);
    let col = into.col.min(other.col);
    into.row_span = into.row_end().max(other.row_end()) - row;
    into.col_span = into.col_end().max(other.col_end()) - col;
    into.row = row;
    into.col = col;
}

/// Collects templates, validates and ranks them into a [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entries: Vec<(PageAspectClass, LayoutTemplate)>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, aspect: PageAspectClass, template: LayoutTemplate) -> Self {
        self.entries.push((aspect, template));
        self
    }

    /// Register a template for every aspect class.
    pub fn add_everywhere(mut self, template: LayoutTemplate) -> Self {
        for aspect in PageAspectClass::ALL {
            self.entries.push((aspect, template.clone()));
        }
        self
    }

    /// Validate every template, drop the broken ones, rank the rest.
    ///
    /// Fails when a bucket loses all of its templates, when ids collide
    /// inside a bucket, or when an aspect class ends up with no buckets.
    pub fn build(self) -> Result<Catalog> {
        let mut buckets: BTreeMap<(PageAspectClass, usize), Vec<LayoutTemplate>> = BTreeMap::new();
        let mut requested: BTreeSet<(PageAspectClass, usize)> = BTreeSet::new();
        let mut dropped = 0usize;

        for (aspect, template) in self.entries {
            let key = (aspect, template.image_count());
            requested.insert(key);
            let report = validate(&template);
            if !report.is_valid {
                log::warn!(
                    "Dropping template '{}' ({} images, {}): efficiency {:.2}, {} overlaps, {} empty cells",
                    template.id,
                    key.1,
                    aspect,
                    report.efficiency,
                    report.overlaps.len(),
                    report.empty_cells
                );
                dropped += 1;
                continue;
            }
            let bucket = buckets.entry(key).or_default();
            if bucket.iter().any(|t| t.id == template.id) {
                return Err(LayoutError::Config(format!(
                    "duplicate template id '{}' for {} pages with {} images",
                    template.id, aspect, key.1
                )));
            }
            if bucket.iter().any(|t| t.signature() == template.signature()) {
                continue;
            }
            bucket.push(template);
        }

        for key in &requested {
            if !buckets.contains_key(key) {
                return Err(LayoutError::Config(format!(
                    "no valid template for {} pages with {} images",
                    key.0, key.1
                )));
            }
        }
        for aspect in PageAspectClass::ALL {
            if !buckets.keys().any(|(a, _)| *a == aspect) {
                return Err(LayoutError::Config(format!("no templates for {aspect} pages")));
            }
        }

        for ((aspect, _), bucket) in buckets.iter_mut() {
            bucket.sort_by(|a, b| {
                balance_score(a, *aspect)
                    .total_cmp(&balance_score(b, *aspect))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }

        let total: usize = buckets.values().map(Vec::len).sum();
        log::info!(
            "Template catalog ready: {} templates in {} buckets ({} dropped)",
            total,
            buckets.len(),
            dropped
        );

        Ok(Catalog {
            buckets: buckets.into_iter().map(|(key, bucket)| (key, Arc::from(bucket))).collect(),
            adapted: Arc::default(),
        })
    }
}

/// A shared, ranked template list.
pub type Bucket = Arc<[LayoutTemplate]>;

/// Validated, ranked templates. Immutable once built; adapted buckets are
/// computed on first use and cached.
#[derive(Debug, Clone)]
pub struct Catalog {
    buckets: BTreeMap<(PageAspectClass, usize), Bucket>,
    adapted: Arc<Mutex<HashMap<(PageAspectClass, usize), Bucket>>>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Catalog> {
        builtin::register(CatalogBuilder::new())?.build()
    }

    /// Exact bucket lookup, best-ranked first. Empty if no such bucket.
    pub fn templates_for(&self, aspect: PageAspectClass, count: usize) -> &[LayoutTemplate] {
        self.buckets
            .get(&(aspect, count))
            .map(|bucket| &bucket[..])
            .unwrap_or(&[])
    }

    /// Image counts with an exact bucket for `aspect`, ascending.
    pub fn supported_counts(&self, aspect: PageAspectClass) -> Vec<usize> {
        self.buckets
            .keys()
            .filter(|(a, _)| *a == aspect)
            .map(|(_, n)| *n)
            .collect()
    }

    pub fn template_count(&self) -> usize {
        self.buckets.values().map(|bucket| bucket.len()).sum()
    }

    /// Every usable template for `count` images, best-ranked first.
    ///
    /// Falls back to adapting the nearest supported count (ties prefer the
    /// smaller count) and keeps only adapted templates that validate.
    /// Adapted buckets are cached per `(aspect, count)`.
    pub fn candidates(&self, aspect: PageAspectClass, count: usize) -> Result<Bucket> {
        if count == 0 {
            return Err(LayoutError::NoTemplate { count });
        }
        if let Some(exact) = self.buckets.get(&(aspect, count)) {
            return Ok(Arc::clone(exact));
        }
        if let Some(cached) = self.adapted.lock().get(&(aspect, count)) {
            return Ok(Arc::clone(cached));
        }

        let mut counts = self.supported_counts(aspect);
        counts.sort_by_key(|n| (n.abs_diff(count), *n));

        for nearest in counts {
            let adapted: Vec<LayoutTemplate> = self
                .templates_for(aspect, nearest)
                .iter()
                .map(|t| adapt(t, count))
                .filter(|t| validate(t).is_valid)
                .collect();
            if !adapted.is_empty() {
                log::debug!(
                    "Adapted {} templates from {} to {} images ({})",
                    adapted.len(),
                    nearest,
                    count,
                    aspect
                );
                let bucket: Bucket = Arc::from(adapted);
                self.adapted.lock().insert((aspect, count), Arc::clone(&bucket));
                return Ok(bucket);
            }
        }

        Err(LayoutError::NoTemplate { count })
    }

    /// Best-ranked usable template for `count` images.
    pub fn best(&self, aspect: PageAspectClass, count: usize) -> Result<LayoutTemplate> {
        self.candidates(aspect, count)?
            .first()
            .cloned()
            .ok_or(LayoutError::NoTemplate { count })
    }
}
