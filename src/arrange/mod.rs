//! # Arrangement Engine
//!
//! Assigns images to pages and pages to templates. Every function here
//! works on an [`AlbumState`] in place and may leave it half-modified when
//! it returns an error; [`crate::session::Session`] runs them on a copy and
//! only commits on success.
//!
//! ## Page lifecycle
//!
//! A page is `Empty`, `PartiallyFilled` or `Full` depending on how many
//! images it holds relative to [`EngineConfig::capacity`]. Any change to a
//! page's image set re-runs its layout: the catalog's best template for the
//! new count, rendered into the page's content area, then border resolution.

pub mod randomize;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;

use crate::borders::{apply_borders, Borders};
use crate::catalog::{Bucket, Catalog, LayoutTemplate, PageAspectClass};
use crate::config::EngineConfig;
use crate::error::{LayoutError, Result};
use crate::geometry::{rect_of_with_gap, Placement};
use crate::model::{AlbumState, Container, FillState, Image, ImageId, Page, PageId, PageImagePlacement};

pub use randomize::RandomStyle;

/// Shared flag a host sets to abandon a long-running arrangement before it
/// commits.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(LayoutError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// "Layout 2 of 5" style position within a page's candidate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutIndicator {
    /// Zero-based.
    pub index: usize,
    pub total: usize,
    /// The page shows a randomized layout that is not in the list.
    pub custom: bool,
}

impl fmt::Display for LayoutIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.custom {
            write!(f, "Custom layout ({} available)", self.total)
        } else {
            write!(f, "Layout {} of {}", self.index + 1, self.total)
        }
    }
}

/// What a global auto-arrange did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrangeSummary {
    pub placed: usize,
    pub pages_created: usize,
    /// Images left in the pool because the page limit was reached.
    pub remaining: usize,
}

/// Layout operations bound to one catalog and configuration.
#[derive(Debug, Clone, Copy)]
pub struct Arranger<'a> {
    catalog: &'a Catalog,
    config: &'a EngineConfig,
}

impl<'a> Arranger<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a EngineConfig) -> Self {
        Self { catalog, config }
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    /// Ranked templates usable for the page's current image count.
    ///
    /// Without a scalar page cap, templates that put more than
    /// `max_images_per_row` images across a row or more than
    /// `max_number_of_rows` down a column are left out, unless that would
    /// leave nothing.
    pub fn candidates_for(&self, page: &Page) -> Result<Bucket> {
        let aspect = PageAspectClass::classify(page.width, page.height);
        let candidates = self.catalog.candidates(aspect, page.len())?;
        if self.config.max_images_per_page.is_some() {
            return Ok(candidates);
        }

        let (per_row, per_column) = (self.config.max_images_per_row, self.config.max_number_of_rows);
        if candidates.iter().all(|t| t.fits_track_limits(per_row, per_column)) {
            return Ok(candidates);
        }
        let within: Vec<LayoutTemplate> = candidates
            .iter()
            .filter(|t| t.fits_track_limits(per_row, per_column))
            .cloned()
            .collect();
        if within.is_empty() {
            log::debug!(
                "No {} template for {} images fits {}x{} limits, using all",
                aspect,
                page.len(),
                per_row,
                per_column
            );
            return Ok(candidates);
        }
        Ok(Bucket::from(within))
    }

    /// Resolve `template` to pixels on `page`. Image `i` in page order takes
    /// the placement whose `image_index` is `i`.
    pub fn render(&self, page: &mut Page, template: &LayoutTemplate) -> Result<()> {
        if template.image_count() != page.len() {
            return Err(LayoutError::Invariant(format!(
                "template '{}' holds {} images, page {} has {}",
                template.id,
                template.image_count(),
                page.id,
                page.len()
            )));
        }
        let content = self.config.content_rect(page.width, page.height);
        for (index, image) in page.images.iter_mut().enumerate() {
            let cell = *template
                .placement_for(index)
                .ok_or_else(|| LayoutError::Invariant(format!("template '{}' has no placement {index}", template.id)))?;
            let rect = rect_of_with_gap(&cell, template.grid, &content, self.config.image_gap_px);
            image.x = rect.x;
            image.y = rect.y;
            image.preview_width = rect.width;
            image.preview_height = rect.height;
            image.cell = cell;
        }
        page.grid = Some(template.grid);
        page.current_template_id = Some(template.id.clone());
        apply_borders(page, self.config.border_tolerance);
        Ok(())
    }

    /// Re-template a page with its best-ranked template. Empty pages are
    /// reset to having no grid.
    pub fn relayout(&self, page: &mut Page) -> Result<()> {
        page.template_cycle_index = 0;
        if page.is_empty() {
            page.grid = None;
            page.current_template_id = None;
            return Ok(());
        }
        let candidates = self.candidates_for(page)?;
        let best = candidates
            .first()
            .ok_or(LayoutError::NoTemplate { count: page.len() })?;
        log::debug!("Page {}: {} images → template '{}'", page.id, page.len(), best.id);
        self.render(page, best)
    }

    /// Re-render a page keeping its current template when it still
    /// applies, otherwise fall back to [`Arranger::relayout`].
    pub fn rerender(&self, page: &mut Page) -> Result<()> {
        if page.is_empty() {
            return self.relayout(page);
        }
        let candidates = self.candidates_for(page)?;
        let current = page.current_template_id.as_deref();
        match candidates.iter().position(|t| Some(t.id.as_str()) == current) {
            Some(index) => {
                page.template_cycle_index = index;
                self.render(page, &candidates[index])
            }
            None => self.relayout(page),
        }
    }

    pub fn new_page(&self, state: &mut AlbumState) -> PageId {
        let id = state.allocate_page_id();
        state.pages.push(Page::new(
            id,
            self.config.page_width,
            self.config.page_height,
            &self.config.default_color_id,
        ));
        log::debug!("Added page {id}");
        id
    }

    /// Fill pages in order from the front of the pool, creating pages as
    /// existing ones fill up. Deterministic: pool order is kept.
    pub fn auto_arrange_all(&self, state: &mut AlbumState) -> Result<ArrangeSummary> {
        self.auto_arrange_all_with(state, &CancelToken::new())
    }

    /// [`Arranger::auto_arrange_all`], checking `cancel` between pages.
    pub fn auto_arrange_all_with(&self, state: &mut AlbumState, cancel: &CancelToken) -> Result<ArrangeSummary> {
        let capacity = self.capacity();
        let mut summary = ArrangeSummary::default();
        let mut touched = BTreeSet::new();

        let mut page_index = 0;
        while !state.pool.is_empty() {
            cancel.check()?;
            if page_index == state.pages.len() {
                if self.config.max_pages.is_some_and(|max| state.pages.len() >= max) {
                    break;
                }
                self.new_page(state);
                summary.pages_created += 1;
            }
            let page = &mut state.pages[page_index];
            let room = capacity.saturating_sub(page.len()).min(state.pool.len());
            if room > 0 {
                for id in state.pool.drain(..room) {
                    push_image(page, id);
                }
                summary.placed += room;
                touched.insert(page_index);
            }
            page_index += 1;
        }

        for index in touched {
            cancel.check()?;
            self.relayout(&mut state.pages[index])?;
        }
        cancel.check()?;

        summary.remaining = state.pool.len();
        log::debug!(
            "Auto-arranged {} images, {} new pages, {} left in pool",
            summary.placed,
            summary.pages_created,
            summary.remaining
        );
        Ok(summary)
    }

    /// Re-template one page with the same images.
    pub fn auto_arrange_page(&self, state: &mut AlbumState, page_id: PageId) -> Result<()> {
        let index = state.page_index(page_id)?;
        let page = &mut state.pages[index];
        if page.is_empty() {
            return Err(LayoutError::NothingToArrange(page_id));
        }
        self.relayout(page)
    }

    /// Step through the page's candidate templates, wrapping both ways.
    /// From a custom layout, stepping forward lands on the first candidate
    /// and stepping back on the last.
    pub fn cycle_layout(&self, state: &mut AlbumState, page_id: PageId, step: isize) -> Result<LayoutIndicator> {
        let index = state.page_index(page_id)?;
        let page = &mut state.pages[index];
        if page.is_empty() {
            return Err(LayoutError::NothingToArrange(page_id));
        }
        let candidates = self.candidates_for(page)?;
        let total = candidates.len();
        let next = if shows_candidate(page, &candidates) {
            (page.template_cycle_index as isize + step).rem_euclid(total as isize) as usize
        } else if step < 0 {
            total - 1
        } else {
            0
        };
        self.render(page, &candidates[next])?;
        page.template_cycle_index = next;
        Ok(LayoutIndicator {
            index: next,
            total,
            custom: false,
        })
    }

    pub fn layout_indicator(&self, state: &AlbumState, page_id: PageId) -> Result<LayoutIndicator> {
        let page = state.page(page_id).ok_or(LayoutError::PageNotFound(page_id))?;
        if page.is_empty() {
            return Ok(LayoutIndicator {
                index: 0,
                total: 0,
                custom: false,
            });
        }
        let candidates = self.candidates_for(page)?;
        let custom = !shows_candidate(page, &candidates);
        Ok(LayoutIndicator {
            index: if custom { 0 } else { page.template_cycle_index },
            total: candidates.len(),
            custom,
        })
    }

    /// Shuffle positions and spans on a page with `style`. The set of
    /// images never changes.
    pub fn randomize_page<R: Rng>(
        &self,
        state: &mut AlbumState,
        page_id: PageId,
        style: RandomStyle,
        rng: &mut R,
    ) -> Result<()> {
        let index = state.page_index(page_id)?;
        if state.pages[index].is_empty() {
            return Err(LayoutError::NothingToArrange(page_id));
        }

        let page = &state.pages[index];
        let images = page
            .image_ids()
            .into_iter()
            .map(|id| state.image(id).cloned().ok_or(LayoutError::ImageNotFound(id)))
            .collect::<Result<Vec<_>>>()?;
        let candidates = self.candidates_for(page)?;
        let content = self.config.content_rect(page.width, page.height);
        let plan = randomize::plan(style, &candidates, &images, self.config, &content, rng)?;

        let page = &mut state.pages[index];
        let old = std::mem::take(&mut page.images);
        page.images = plan.order.iter().map(|&i| old[i].clone()).collect();
        self.render(page, &plan.template)?;
        page.template_cycle_index = candidates
            .iter()
            .position(|t| t.id == plan.template.id)
            .unwrap_or(0);
        log::debug!("Randomized page {page_id} ({style:?}) → '{}'", plan.template.id);
        Ok(())
    }

    /// Check that a move is possible without performing it.
    pub fn check_move(&self, state: &AlbumState, image: ImageId, from: Container, to: Container) -> Result<()> {
        if state.image(image).is_none() {
            return Err(LayoutError::ImageNotFound(image));
        }
        let holds = match from {
            Container::Pool => state.pool.contains(&image),
            Container::Page(id) => state.page(id).ok_or(LayoutError::PageNotFound(id))?.contains(image),
        };
        if !holds {
            return Err(LayoutError::ImageNotInContainer {
                image,
                container: from,
            });
        }
        if let Container::Page(id) = to {
            let page = state.page(id).ok_or(LayoutError::PageNotFound(id))?;
            let capacity = self.capacity();
            if to != from && page.fill_state(capacity) == FillState::Full {
                return Err(LayoutError::PageFull { page: id, capacity });
            }
        }
        Ok(())
    }

    /// Move one image reference between containers, or reorder it within one.
    /// `to_index` is clamped to the destination length.
    pub fn move_image(
        &self,
        state: &mut AlbumState,
        image: ImageId,
        from: Container,
        to: Container,
        to_index: usize,
    ) -> Result<()> {
        self.check_move(state, image, from, to)?;

        match (from, to) {
            (Container::Pool, Container::Pool) => {
                reorder(&mut state.pool, |id| *id == image, to_index);
            }
            (Container::Page(a), Container::Page(b)) if a == b => {
                let index = state.page_index(a)?;
                let page = &mut state.pages[index];
                let cells = cells_in_order(page);
                reorder(&mut page.images, |p| p.image_id == image, to_index);
                self.reassign_cells(page, &cells);
            }
            _ => {
                match from {
                    Container::Pool => state.pool.retain(|id| *id != image),
                    Container::Page(id) => {
                        let index = state.page_index(id)?;
                        state.pages[index].images.retain(|p| p.image_id != image);
                    }
                }
                match to {
                    Container::Pool => {
                        let at = to_index.min(state.pool.len());
                        state.pool.insert(at, image);
                    }
                    Container::Page(id) => {
                        let index = state.page_index(id)?;
                        let page = &mut state.pages[index];
                        let at = to_index.min(page.len());
                        page.images.insert(at, blank_placement(image));
                        self.relayout(page)?;
                    }
                }
                if let Container::Page(id) = from {
                    let index = state.page_index(id)?;
                    self.relayout(&mut state.pages[index])?;
                }
            }
        }
        Ok(())
    }

    /// Delete a page, returning its images to the head of the pool in order.
    pub fn remove_page(&self, state: &mut AlbumState, page_id: PageId) -> Result<()> {
        let index = state.page_index(page_id)?;
        let page = state.pages.remove(index);
        let ids = page.image_ids();
        log::debug!("Removed page {page_id}, {} images back to pool", ids.len());
        state.pool.splice(0..0, ids);
        Ok(())
    }

    /// Return every placed image to the pool, keeping the pages.
    pub fn clear_pages(&self, state: &mut AlbumState) -> Result<()> {
        let mut returned = Vec::new();
        for page in &mut state.pages {
            returned.extend(page.image_ids());
            page.images.clear();
            self.relayout(page)?;
        }
        state.pool.splice(0..0, returned);
        Ok(())
    }

    /// Register uploaded images at the back of the pool.
    pub fn add_images(&self, state: &mut AlbumState, images: Vec<Image>) -> Result<()> {
        for image in images {
            image.check()?;
            if state.image(image.id).is_some() {
                return Err(LayoutError::InvalidImage {
                    id: image.id,
                    reason: "duplicate id".to_string(),
                });
            }
            state.pool.push(image.id);
            state.library.push(image);
        }
        Ok(())
    }

    /// Remove an image from the album entirely.
    pub fn remove_image(&self, state: &mut AlbumState, image: ImageId) -> Result<()> {
        let location = state.locate(image).ok_or(LayoutError::ImageNotFound(image))?;
        match location {
            Container::Pool => state.pool.retain(|id| *id != image),
            Container::Page(id) => {
                let index = state.page_index(id)?;
                let page = &mut state.pages[index];
                page.images.retain(|p| p.image_id != image);
                self.relayout(page)?;
            }
        }
        state.library.retain(|i| i.id != image);
        Ok(())
    }

    /// Set zoom and pan for an image. Scale is clamped to `[1, 5]`.
    pub fn adjust_image(&self, state: &mut AlbumState, image: ImageId, scale: f64, offset_x: f64, offset_y: f64) -> Result<()> {
        let record = state.image_mut(image).ok_or(LayoutError::ImageNotFound(image))?;
        record.scale = scale.clamp(1.0, 5.0);
        record.crop_offset_x = offset_x;
        record.crop_offset_y = offset_y;
        Ok(())
    }

    pub fn set_page_color(&self, state: &mut AlbumState, page_id: PageId, color_id: &str) -> Result<()> {
        let index = state.page_index(page_id)?;
        state.pages[index].color_id = color_id.to_string();
        Ok(())
    }

    /// Give the page's images the same cells in a new order, leaving the
    /// template untouched.
    fn reassign_cells(&self, page: &mut Page, cells: &[Placement]) {
        let Some(grid) = page.grid else {
            return;
        };
        let content = self.config.content_rect(page.width, page.height);
        for (index, (image, cell)) in page.images.iter_mut().zip(cells).enumerate() {
            let cell = Placement { image_index: index, ..*cell };
            let rect = rect_of_with_gap(&cell, grid, &content, self.config.image_gap_px);
            image.x = rect.x;
            image.y = rect.y;
            image.preview_width = rect.width;
            image.preview_height = rect.height;
            image.cell = cell;
        }
        apply_borders(page, self.config.border_tolerance);
    }
}

fn push_image(page: &mut Page, image: ImageId) {
    page.images.push(blank_placement(image));
}

/// Placeholder until the page is laid out again.
fn blank_placement(image: ImageId) -> PageImagePlacement {
    PageImagePlacement {
        image_id: image,
        x: 0.0,
        y: 0.0,
        preview_width: 0.0,
        preview_height: 0.0,
        cell: Placement::new(0, 0, 0, 1, 1),
        borders: Borders::none(),
    }
}

/// Page cells sorted by image index.
fn cells_in_order(page: &Page) -> Vec<Placement> {
    let mut cells: Vec<Placement> = page.images.iter().map(|p| p.cell).collect();
    cells.sort_by_key(|c| c.image_index);
    cells
}

/// Whether the page is rendered with the candidate its cycle index points at.
fn shows_candidate(page: &Page, candidates: &[LayoutTemplate]) -> bool {
    candidates
        .get(page.template_cycle_index)
        .is_some_and(|t| page.current_template_id.as_deref() == Some(t.id.as_str()))
}

/// Move the first element matching `pred` to `to_index` (clamped).
fn reorder<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool, to_index: usize) {
    if let Some(from) = items.iter().position(pred) {
        let item = items.remove(from);
        let at = to_index.min(items.len());
        items.insert(at, item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn setup(count: u64) -> (Catalog, EngineConfig, AlbumState) {
        let catalog = Catalog::builtin().unwrap();
        let config = EngineConfig::default();
        let mut state = AlbumState::new();
        let images = (1..=count).map(|i| Image::new(i, format!("img{i}"), 400, 300)).collect();
        Arranger::new(&catalog, &config).add_images(&mut state, images).unwrap();
        (catalog, config, state)
    }

    #[test]
    fn auto_arrange_fills_to_capacity() {
        let (catalog, config, mut state) = setup(8);
        let arranger = Arranger::new(&catalog, &config);
        let summary = arranger.auto_arrange_all(&mut state).unwrap();
        assert_eq!(summary.placed, 8);
        assert_eq!(summary.pages_created, 2);
        assert_eq!(state.pages[0].len(), 6);
        assert_eq!(state.pages[1].len(), 2);
        assert!(state.pool.is_empty());
        state.check_invariants().unwrap();
    }

    #[test]
    fn auto_arrange_tops_up_existing_pages() {
        let (catalog, config, mut state) = setup(8);
        let arranger = Arranger::new(&catalog, &config);
        let page = arranger.new_page(&mut state);
        arranger
            .move_image(&mut state, ImageId(8), Container::Pool, Container::Page(page), 0)
            .unwrap();
        arranger.auto_arrange_all(&mut state).unwrap();
        assert_eq!(state.pages[0].len(), 6);
        assert_eq!(state.pages[0].images[0].image_id, ImageId(8));
        assert_eq!(state.pages[1].image_ids(), vec![ImageId(6), ImageId(7)]);
    }

    #[test]
    fn max_pages_leaves_remainder_in_pool() {
        let (catalog, mut config, mut state) = setup(14);
        config.max_pages = Some(2);
        let arranger = Arranger::new(&catalog, &config);
        let summary = arranger.auto_arrange_all(&mut state).unwrap();
        assert_eq!(summary.remaining, 2);
        assert_eq!(state.pool, vec![ImageId(13), ImageId(14)]);
    }

    #[test]
    fn cancelled_arrangement_reports_cancelled() {
        let (catalog, config, mut state) = setup(4);
        let token = CancelToken::new();
        token.cancel();
        let err = Arranger::new(&catalog, &config)
            .auto_arrange_all_with(&mut state, &token)
            .unwrap_err();
        assert!(matches!(err, LayoutError::Cancelled));
    }

    #[test]
    fn single_image_fills_content_area() {
        let (catalog, config, mut state) = setup(1);
        let arranger = Arranger::new(&catalog, &config);
        arranger.auto_arrange_all(&mut state).unwrap();
        let page = &state.pages[0];
        let img = &page.images[0];
        let content = config.content_rect(page.width, page.height);
        assert_eq!(page.grid, Some(crate::geometry::GridSize::new(1, 1)));
        assert!((img.x - content.x).abs() < 0.001);
        assert!((img.preview_width - content.width).abs() < 0.001);
        assert!((img.preview_height - content.height).abs() < 0.001);
    }

    #[test]
    fn cycling_wraps_both_ways() {
        let (catalog, config, mut state) = setup(3);
        let arranger = Arranger::new(&catalog, &config);
        arranger.auto_arrange_all(&mut state).unwrap();
        let page = state.pages[0].id;
        let back = arranger.cycle_layout(&mut state, page, -1).unwrap();
        assert_eq!(back.index, back.total - 1);
        let fwd = arranger.cycle_layout(&mut state, page, 1).unwrap();
        assert_eq!(fwd.index, 0);
        assert_eq!(fwd.to_string(), format!("Layout 1 of {}", fwd.total));
    }

    #[test]
    fn candidates_respect_row_and_column_limits() {
        let catalog = Catalog::builtin().unwrap();
        let config = EngineConfig {
            max_images_per_row: 4,
            max_number_of_rows: 1,
            ..EngineConfig::default()
        };
        let arranger = Arranger::new(&catalog, &config);
        let mut page = Page::new(PageId(0), 1000.0, 700.0, "white");
        for i in 1..=4 {
            push_image(&mut page, ImageId(i));
        }
        let candidates = arranger.candidates_for(&page).unwrap();
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|t| t.fits_track_limits(4, 1)));
        arranger.relayout(&mut page).unwrap();
        assert_eq!(page.grid, Some(crate::geometry::GridSize::new(1, 4)));
    }

    #[test]
    fn unreachable_limits_fall_back_to_every_candidate() {
        let catalog = Catalog::builtin().unwrap();
        let config = EngineConfig {
            page_width: 700.0,
            page_height: 1000.0,
            max_images_per_row: 1,
            max_number_of_rows: 8,
            ..EngineConfig::default()
        };
        let arranger = Arranger::new(&catalog, &config);
        let mut page = Page::new(PageId(0), 700.0, 1000.0, "white");
        for i in 1..=8 {
            push_image(&mut page, ImageId(i));
        }
        let candidates = arranger.candidates_for(&page).unwrap();
        let all = catalog.candidates(PageAspectClass::Portrait, 8).unwrap();
        assert_eq!(candidates.len(), all.len());
    }

    #[test]
    fn randomized_layout_outside_the_list_is_custom() {
        let catalog = Catalog::builtin().unwrap();
        let config = EngineConfig {
            page_width: 700.0,
            page_height: 1000.0,
            max_images_per_row: 1,
            max_number_of_rows: 8,
            ..EngineConfig::default()
        };
        let arranger = Arranger::new(&catalog, &config);
        let mut state = AlbumState::new();
        let images = (1..=8).map(|i| Image::new(i, format!("img{i}"), 300, 400)).collect();
        arranger.add_images(&mut state, images).unwrap();
        arranger.auto_arrange_all(&mut state).unwrap();
        let page = state.pages[0].id;
        arranger.cycle_layout(&mut state, page, 1).unwrap();
        arranger.cycle_layout(&mut state, page, 1).unwrap();

        arranger
            .randomize_page(&mut state, page, RandomStyle::GridBased, &mut SmallRng::seed_from_u64(3))
            .unwrap();
        // eight rows is past the catalog's track limit
        assert_eq!(state.pages[0].current_template_id.as_deref(), Some("grid-8x1"));
        let indicator = arranger.layout_indicator(&state, page).unwrap();
        assert!(indicator.custom);
        assert_eq!(indicator.index, 0);
        assert_eq!(indicator.to_string(), format!("Custom layout ({} available)", indicator.total));

        let next = arranger.cycle_layout(&mut state, page, 1).unwrap();
        assert_eq!(next.index, 0);
        let candidates = arranger.candidates_for(&state.pages[0]).unwrap();
        assert_eq!(state.pages[0].current_template_id, Some(candidates[0].id.clone()));
        assert!(!arranger.layout_indicator(&state, page).unwrap().custom);

        arranger
            .randomize_page(&mut state, page, RandomStyle::GridBased, &mut SmallRng::seed_from_u64(4))
            .unwrap();
        let back = arranger.cycle_layout(&mut state, page, -1).unwrap();
        assert_eq!(back.index, back.total - 1);
    }

    #[test]
    fn reorder_within_page_keeps_template() {
        let (catalog, config, mut state) = setup(3);
        let arranger = Arranger::new(&catalog, &config);
        arranger.auto_arrange_all(&mut state).unwrap();
        let page = state.pages[0].id;
        arranger.cycle_layout(&mut state, page, 1).unwrap();
        let template = state.pages[0].current_template_id.clone();
        let first_cell = state.pages[0].images[0].cell;

        arranger
            .move_image(&mut state, ImageId(3), Container::Page(page), Container::Page(page), 0)
            .unwrap();
        assert_eq!(state.pages[0].current_template_id, template);
        assert_eq!(state.pages[0].images[0].image_id, ImageId(3));
        assert_eq!(state.pages[0].images[0].cell, first_cell);
        state.check_invariants().unwrap();
    }

    #[test]
    fn clear_pages_returns_images_in_page_order() {
        let (catalog, config, mut state) = setup(8);
        let arranger = Arranger::new(&catalog, &config);
        arranger.auto_arrange_all(&mut state).unwrap();
        arranger.clear_pages(&mut state).unwrap();
        let expected: Vec<ImageId> = (1..=8).map(ImageId).collect();
        assert_eq!(state.pool, expected);
        assert!(state.pages.iter().all(|p| p.is_empty() && p.grid.is_none()));
    }

    #[test]
    fn duplicate_upload_is_rejected() {
        let (catalog, config, mut state) = setup(2);
        let err = Arranger::new(&catalog, &config)
            .add_images(&mut state, vec![Image::new(1, "again", 10, 10)])
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidImage { .. }));
    }

    #[test]
    fn adjust_clamps_scale() {
        let (catalog, config, mut state) = setup(1);
        Arranger::new(&catalog, &config)
            .adjust_image(&mut state, ImageId(1), 9.0, 4.0, -2.0)
            .unwrap();
        let img = state.image(ImageId(1)).unwrap();
        assert_eq!(img.scale, 5.0);
        assert_eq!(img.crop_offset_y, -2.0);
    }
}
