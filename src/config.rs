//! Engine settings.
//!
//! Deserialized from camelCase JSON with every field defaulted, so an
//! empty object is a usable configuration. [`EngineConfig::validate`]
//! enforces the accepted ranges before the engine ever sees the values.

use serde::{Deserialize, Serialize};

use crate::borders::DEFAULT_TOLERANCE;
use crate::error::{LayoutError, Result};
use crate::geometry::Rect;

pub const MARGIN_RANGE: (f64, f64) = (5.0, 50.0);
pub const GAP_RANGE: (f64, f64) = (0.0, 30.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Page size in pixels.
    pub page_width: f64,
    pub page_height: f64,
    pub max_images_per_row: usize,
    pub max_number_of_rows: usize,
    /// Scalar cap; when set it replaces `rows * cols` as page capacity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_images_per_page: Option<usize>,
    pub page_margin_px: f64,
    pub image_gap_px: f64,
    /// Edge distance under which two images count as touching.
    pub border_tolerance: f64,
    /// Undo depth kept before the oldest entries are discarded.
    pub history_limit: usize,
    /// Stop creating pages during auto-arrange once this many exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<usize>,
    pub default_color_id: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_width: 1000.0,
            page_height: 700.0,
            max_images_per_row: 3,
            max_number_of_rows: 2,
            max_images_per_page: None,
            page_margin_px: 20.0,
            image_gap_px: 10.0,
            border_tolerance: DEFAULT_TOLERANCE,
            history_limit: 100,
            max_pages: None,
            default_color_id: "white".to_string(),
        }
    }
}

impl EngineConfig {
    /// Maximum images one page may hold.
    pub fn capacity(&self) -> usize {
        self.max_images_per_page
            .unwrap_or(self.max_images_per_row.saturating_mul(self.max_number_of_rows))
    }

    /// Area inside the page margin where images are laid out.
    pub fn content_rect(&self, page_width: f64, page_height: f64) -> Rect {
        Rect::new(0.0, 0.0, page_width, page_height).inset(self.page_margin_px)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(LayoutError::Config(msg));

        if !(self.page_width > 0.0 && self.page_height > 0.0) {
            return fail(format!(
                "page size must be positive, got {}x{}",
                self.page_width, self.page_height
            ));
        }
        if self.max_images_per_row == 0 || self.max_number_of_rows == 0 {
            return fail("maxImagesPerRow and maxNumberOfRows must be at least 1".to_string());
        }
        if self
            .max_images_per_row
            .checked_mul(self.max_number_of_rows)
            .is_none()
        {
            return fail(format!(
                "maxImagesPerRow x maxNumberOfRows overflows ({} x {})",
                self.max_images_per_row, self.max_number_of_rows
            ));
        }
        if self.max_images_per_page == Some(0) {
            return fail("maxImagesPerPage must be at least 1".to_string());
        }
        if self.max_pages == Some(0) {
            return fail("maxPages must be at least 1".to_string());
        }
        if !(MARGIN_RANGE.0..=MARGIN_RANGE.1).contains(&self.page_margin_px) {
            return fail(format!(
                "pageMarginPx must be in [{}, {}], got {}",
                MARGIN_RANGE.0, MARGIN_RANGE.1, self.page_margin_px
            ));
        }
        if !(GAP_RANGE.0..=GAP_RANGE.1).contains(&self.image_gap_px) {
            return fail(format!(
                "imageGapPx must be in [{}, {}], got {}",
                GAP_RANGE.0, GAP_RANGE.1, self.image_gap_px
            ));
        }
        if self.content_rect(self.page_width, self.page_height).is_empty() {
            return fail("page margins leave no room for images".to_string());
        }
        if !(self.border_tolerance >= 0.0) {
            return fail("borderTolerance must not be negative".to_string());
        }
        if self.history_limit == 0 {
            return fail("historyLimit must be at least 1".to_string());
        }
        Ok(())
    }
}
