//! # Layout Validator
//!
//! Rejects geometrically broken templates. A template is valid when no two
//! placements share a cell, every placement stays inside the grid, and the
//! grid is used efficiently enough:
//!
//! - `efficiency = used_cells / (rows * cols) >= 0.70`
//! - `empty_cells <= 0.5 * image_count`
//!
//! The catalog runs this on every template at build time. The same overlap
//! scan is reused on live pages by [`crate::model::AlbumState::check_invariants`].

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::catalog::LayoutTemplate;
use crate::geometry::{GridCell, GridSize, Placement};

/// Minimum fraction of grid cells that must be covered.
pub const MIN_EFFICIENCY: f64 = 0.70;

/// Maximum empty cells allowed per placed image.
pub const MAX_EMPTY_PER_IMAGE: f64 = 0.5;

/// Two placements claiming the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlap {
    /// Image index of the placement that claimed the cell first.
    pub first: usize,
    /// Image index of the later writer.
    pub second: usize,
}

/// Outcome of validating one template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub efficiency: f64,
    pub used_cells: usize,
    pub empty_cells: usize,
    /// Every distinct offending pair, not just the first one found.
    pub overlaps: Vec<Overlap>,
    /// Image indices of placements that leave the grid or have a zero span.
    pub out_of_bounds: Vec<usize>,
    /// Image indices that are missing or duplicated in `0..placements.len()`.
    pub bad_indices: Vec<usize>,
}

/// Validate a catalog template.
pub fn validate(template: &LayoutTemplate) -> ValidationReport {
    validate_placements(template.grid, &template.placements)
}

/// Validate a bare grid + placement list.
pub fn validate_placements(grid: GridSize, placements: &[Placement]) -> ValidationReport {
    let out_of_bounds: Vec<usize> = placements
        .iter()
        .filter(|p| !p.fits(grid))
        .map(|p| p.image_index)
        .collect();

    let overlaps = find_overlaps(placements.iter().filter(|p| p.fits(grid)));

    let mut seen = BTreeSet::new();
    let mut bad_indices = Vec::new();
    for p in placements {
        if p.image_index >= placements.len() || !seen.insert(p.image_index) {
            bad_indices.push(p.image_index);
        }
    }

    // Union of covered cells; overlapping cells count once.
    let used: BTreeSet<GridCell> = placements
        .iter()
        .filter(|p| p.fits(grid))
        .flat_map(|p| p.cells().collect::<Vec<_>>())
        .collect();
    let total = grid.cell_count();
    let used_cells = used.len();
    let empty_cells = total.saturating_sub(used_cells);
    let efficiency = if total == 0 {
        0.0
    } else {
        used_cells as f64 / total as f64
    };

    let image_count = placements.len();
    let is_valid = image_count > 0
        && total > 0
        && overlaps.is_empty()
        && out_of_bounds.is_empty()
        && bad_indices.is_empty()
        && efficiency >= MIN_EFFICIENCY
        && empty_cells as f64 <= MAX_EMPTY_PER_IMAGE * image_count as f64;

    ValidationReport {
        is_valid,
        efficiency,
        used_cells,
        empty_cells,
        overlaps,
        out_of_bounds,
        bad_indices,
    }
}

/// Scan placements into an occupancy map and collect every pair that
/// writes the same cell twice.
pub fn find_overlaps<'a>(placements: impl IntoIterator<Item = &'a Placement>) -> Vec<Overlap> {
    let mut occupied: HashMap<GridCell, usize> = HashMap::new();
    let mut pairs = BTreeSet::new();

    for p in placements {
        for cell in p.cells() {
            match occupied.get(&cell) {
                Some(&owner) if owner != p.image_index => {
                    pairs.insert(Overlap {
                        first: owner,
                        second: p.image_index,
                    });
                }
                Some(_) => {}
                None => {
                    occupied.insert(cell, p.image_index);
                }
            }
        }
    }

    pairs.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(rows: usize, cols: usize, placements: Vec<Placement>) -> LayoutTemplate {
        LayoutTemplate {
            id: "t".to_string(),
            grid: GridSize::new(rows, cols),
            placements,
        }
    }

    #[test]
    fn full_grid_is_valid() {
        let t = template(
            1,
            2,
            vec![Placement::new(0, 0, 0, 1, 1), Placement::new(1, 0, 1, 1, 1)],
        );
        let report = validate(&t);
        assert!(report.is_valid);
        assert!((report.efficiency - 1.0).abs() < 0.001);
        assert_eq!(report.empty_cells, 0);
    }

    #[test]
    fn detects_every_overlapping_pair() {
        // A covers the whole 2x2 grid; B and C both sit inside it.
        let t = template(
            2,
            2,
            vec![
                Placement::new(0, 0, 0, 2, 2),
                Placement::new(1, 0, 0, 1, 1),
                Placement::new(2, 1, 1, 1, 1),
            ],
        );
        let report = validate(&t);
        assert!(!report.is_valid);
        assert_eq!(
            report.overlaps,
            vec![
                Overlap { first: 0, second: 1 },
                Overlap { first: 0, second: 2 },
            ]
        );
    }

    #[test]
    fn low_efficiency_is_rejected() {
        // 2 images in a 2x2 grid: 50% used
        let t = template(
            2,
            2,
            vec![Placement::new(0, 0, 0, 1, 1), Placement::new(1, 1, 1, 1, 1)],
        );
        let report = validate(&t);
        assert!(!report.is_valid);
        assert!((report.efficiency - 0.5).abs() < 0.001);
        assert_eq!(report.empty_cells, 2);
    }

    #[test]
    fn one_hole_for_three_images_is_allowed() {
        let t = template(
            2,
            2,
            vec![
                Placement::new(0, 0, 0, 1, 1),
                Placement::new(1, 0, 1, 1, 1),
                Placement::new(2, 1, 0, 1, 1),
            ],
        );
        let report = validate(&t);
        assert!(report.is_valid);
        assert!((report.efficiency - 0.75).abs() < 0.001);
    }

    #[test]
    fn too_many_holes_per_image_is_rejected() {
        // 2 images over 5 of 7 cells: efficiency 0.71 passes, 2 holes > 1 allowed
        let t = template(
            1,
            7,
            vec![Placement::new(0, 0, 0, 1, 3), Placement::new(1, 0, 3, 1, 2)],
        );
        let report = validate(&t);
        assert!(report.efficiency >= MIN_EFFICIENCY);
        assert_eq!(report.empty_cells, 2);
        assert!(!report.is_valid);
    }

    #[test]
    fn out_of_bounds_placement_is_reported() {
        let t = template(1, 2, vec![Placement::new(0, 0, 1, 1, 2)]);
        let report = validate(&t);
        assert!(!report.is_valid);
        assert_eq!(report.out_of_bounds, vec![0]);
    }

    #[test]
    fn duplicate_image_indices_are_reported() {
        let t = template(
            1,
            2,
            vec![Placement::new(0, 0, 0, 1, 1), Placement::new(0, 0, 1, 1, 1)],
        );
        let report = validate(&t);
        assert!(!report.is_valid);
        assert_eq!(report.bad_indices, vec![0]);
    }
}
