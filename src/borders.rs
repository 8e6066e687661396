//! # Border Adjacency Resolver
//!
//! Decides which edges of each image touch a neighbour, so a renderer can
//! draw dividers there. An edge is bordered when
//!
//! 1. it is not within `tolerance` of the page boundary on that side, and
//! 2. another image's opposite edge lies within `tolerance` of it, and
//! 3. the two edges overlap along the perpendicular axis.
//!
//! Resolution is pure: it reads rectangles and nothing else, so running it
//! twice on unchanged geometry gives identical flags regardless of image order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{overlap_length, Rect};
use crate::model::{ImageId, Page};

/// Default distance, in pixels, under which two edges count as touching.
pub const DEFAULT_TOLERANCE: f64 = 1.0;

/// Perpendicular overlap below this is float noise from corner contact.
const MIN_SHARED_LENGTH: f64 = 1e-6;

/// Per-edge divider flags for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Borders {
    pub top: bool,
    pub right: bool,
    pub bottom: bool,
    pub left: bool,
}

impl Borders {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.top || self.right || self.bottom || self.left
    }
}

/// Compute border flags for every image on `page`.
pub fn resolve_borders(page: &Page, tolerance: f64) -> BTreeMap<ImageId, Borders> {
    let rects: Vec<(ImageId, Rect)> = page.image_rects();
    let bounds = page.rect();
    rects
        .iter()
        .map(|(id, rect)| (*id, borders_for(*id, rect, &rects, &bounds, tolerance)))
        .collect()
}

/// Recompute and store border flags on `page` in place.
pub fn apply_borders(page: &mut Page, tolerance: f64) {
    let resolved = resolve_borders(page, tolerance);
    for image in &mut page.images {
        image.borders = resolved.get(&image.image_id).copied().unwrap_or_default();
    }
}

fn borders_for(id: ImageId, rect: &Rect, all: &[(ImageId, Rect)], bounds: &Rect, tol: f64) -> Borders {
    let near = |a: f64, b: f64| (a - b).abs() <= tol;
    let others = || all.iter().filter(move |(other, _)| *other != id).map(|(_, r)| r);

    let shares_x = |o: &Rect| overlap_length(rect.x, rect.right(), o.x, o.right()) > MIN_SHARED_LENGTH;
    let shares_y = |o: &Rect| overlap_length(rect.y, rect.bottom(), o.y, o.bottom()) > MIN_SHARED_LENGTH;

    Borders {
        top: !near(rect.y, bounds.y) && others().any(|o| near(o.bottom(), rect.y) && shares_x(o)),
        bottom: !near(rect.bottom(), bounds.bottom())
            && others().any(|o| near(o.y, rect.bottom()) && shares_x(o)),
        left: !near(rect.x, bounds.x) && others().any(|o| near(o.right(), rect.x) && shares_y(o)),
        right: !near(rect.right(), bounds.right())
            && others().any(|o| near(o.x, rect.right()) && shares_y(o)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Placement;
    use crate::model::{PageId, PageImagePlacement};

    fn page_with(rects: &[(u64, Rect)]) -> Page {
        let mut page = Page::new(PageId(1), 400.0, 200.0, "white");
        for (i, (id, r)) in rects.iter().enumerate() {
            page.images.push(PageImagePlacement {
                image_id: ImageId(*id),
                x: r.x,
                y: r.y,
                preview_width: r.width,
                preview_height: r.height,
                cell: Placement::new(i, 0, i, 1, 1),
                borders: Borders::none(),
            });
        }
        page
    }

    #[test]
    fn side_by_side_images_border_each_other() {
        let page = page_with(&[
            (1, Rect::new(0.0, 0.0, 200.0, 200.0)),
            (2, Rect::new(200.0, 0.0, 200.0, 200.0)),
        ]);
        let b = resolve_borders(&page, DEFAULT_TOLERANCE);
        assert_eq!(
            b[&ImageId(1)],
            Borders {
                right: true,
                ..Borders::none()
            }
        );
        assert_eq!(
            b[&ImageId(2)],
            Borders {
                left: true,
                ..Borders::none()
            }
        );
    }

    #[test]
    fn gap_larger_than_tolerance_means_no_border() {
        let page = page_with(&[
            (1, Rect::new(20.0, 20.0, 170.0, 160.0)),
            (2, Rect::new(200.0, 20.0, 170.0, 160.0)),
        ]);
        let b = resolve_borders(&page, DEFAULT_TOLERANCE);
        assert!(!b[&ImageId(1)].any());
        assert!(!b[&ImageId(2)].any());
    }

    #[test]
    fn corner_contact_is_not_adjacency() {
        let page = page_with(&[
            (1, Rect::new(0.0, 0.0, 100.0, 100.0)),
            (2, Rect::new(100.0, 100.0, 100.0, 100.0)),
        ]);
        let b = resolve_borders(&page, DEFAULT_TOLERANCE);
        assert!(!b[&ImageId(1)].any());
        assert!(!b[&ImageId(2)].any());
    }

    #[test]
    fn stacked_images_within_tolerance() {
        let page = page_with(&[
            (1, Rect::new(50.0, 10.0, 100.0, 90.0)),
            (2, Rect::new(50.0, 100.5, 100.0, 90.0)),
        ]);
        let b = resolve_borders(&page, DEFAULT_TOLERANCE);
        assert!(b[&ImageId(1)].bottom);
        assert!(b[&ImageId(2)].top);
        assert!(!b[&ImageId(1)].top);
    }

    #[test]
    fn resolution_is_idempotent_and_order_independent() {
        let rects = [
            (1, Rect::new(0.0, 0.0, 200.0, 100.0)),
            (2, Rect::new(0.0, 100.0, 200.0, 100.0)),
            (3, Rect::new(200.0, 0.0, 200.0, 200.0)),
        ];
        let page = page_with(&rects);
        let first = resolve_borders(&page, DEFAULT_TOLERANCE);
        assert_eq!(first, resolve_borders(&page, DEFAULT_TOLERANCE));

        let mut reversed = rects;
        reversed.reverse();
        assert_eq!(first, resolve_borders(&page_with(&reversed), DEFAULT_TOLERANCE));
        assert!(first[&ImageId(3)].left);
        assert!(first[&ImageId(1)].right && first[&ImageId(1)].bottom);
    }
}
