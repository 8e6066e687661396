//! Built-in template table.
//!
//! Two sources feed the catalog: hand-drawn "feature" layouts with one or
//! more large tiles, and generated uniform grids for every column count up
//! to [`MAX_TRACKS`]. Feature layouts are also registered transposed, so
//! portrait pages get tall heroes. Ranking per aspect class happens in
//! [`super::CatalogBuilder::build`].

use super::{CatalogBuilder, LayoutTemplate};
use crate::error::Result;

/// Largest image count with an exact bucket; larger counts are adapted.
pub const MAX_BUILTIN_IMAGES: usize = 24;

/// Maximum rows or columns in a generated grid.
pub const MAX_TRACKS: usize = 6;

/// (id, rows). Letters are images, `.` is an empty cell.
const FEATURE_LAYOUTS: &[(&str, &[&str])] = &[
    ("hero-3", &["AAB", "AAC"]),
    ("banner-3", &["AA", "BC"]),
    ("corner-3", &["AB", "C."]),
    ("hero-4", &["AAB", "AAC", "AAD"]),
    ("banner-4", &["AAA", "BCD"]),
    ("hero-5", &["AAB", "AAC", "DDE"]),
    ("pairs-5", &["AABB", "CDEE"]),
    ("hero-6", &["AAB", "AAC", "DEF"]),
    ("duo-6", &["AABB", "AABB", "CDEF"]),
    ("hero-7", &["AABC", "AADE", "FFGG"]),
    ("hero-8", &["AABC", "AADE", "FGHH"]),
    ("hero-9", &["AABC", "AADE", "FGHI"]),
    ("duo-10", &["AABBC", "AABBD", "EFGHI", "JJ..."]),
];

/// Register every built-in template on `builder`.
pub fn register(mut builder: CatalogBuilder) -> Result<CatalogBuilder> {
    for (id, rows) in FEATURE_LAYOUTS {
        let template = LayoutTemplate::from_rows(id, rows)?;
        let transposed = template.transpose(&format!("{id}-t"));
        builder = builder.add_everywhere(template).add_everywhere(transposed);
    }

    for count in 1..=MAX_BUILTIN_IMAGES {
        for cols in 1..=MAX_TRACKS.min(count) {
            let rows = count.div_ceil(cols);
            if rows > MAX_TRACKS {
                continue;
            }
            builder = builder.add_everywhere(LayoutTemplate::uniform(count, cols));
        }
    }

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate;

    #[test]
    fn feature_layouts_parse_and_validate() {
        for (id, rows) in FEATURE_LAYOUTS {
            let t = LayoutTemplate::from_rows(id, rows).unwrap();
            let report = validate(&t);
            assert!(report.is_valid, "{id} invalid: {report:?}");
        }
    }

    #[test]
    fn every_count_has_a_generated_grid() {
        for count in 1..=MAX_BUILTIN_IMAGES {
            let any = (1..=MAX_TRACKS.min(count)).any(|cols| count.div_ceil(cols) <= MAX_TRACKS);
            assert!(any, "no grid for {count}");
        }
    }
}
