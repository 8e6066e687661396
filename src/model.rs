//! # Album Model
//!
//! Images, pages and the pool of unplaced images. The one rule the whole
//! crate protects: every image id in the library is held by exactly one
//! container, either the pool or a single page.
//!
//! Pages store resolved pixel placements (what a renderer or exporter
//! paints) alongside the grid cell each placement came from, so occupancy
//! can be re-checked without re-running layout.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::borders::{apply_borders, Borders};
use crate::error::{LayoutError, Result};
use crate::geometry::{intersects, GridSize, Placement, Rect};
use crate::validate::find_overlaps;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub u64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An uploaded image. Pixel data lives elsewhere; `source_ref` is an
/// opaque handle to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: ImageId,
    pub source_ref: String,
    pub natural_width: u32,
    pub natural_height: u32,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub crop_offset_x: f64,
    #[serde(default)]
    pub crop_offset_y: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl Image {
    pub fn new(id: u64, source_ref: impl Into<String>, natural_width: u32, natural_height: u32) -> Self {
        Self {
            id: ImageId(id),
            source_ref: source_ref.into(),
            natural_width,
            natural_height,
            scale: 1.0,
            crop_offset_x: 0.0,
            crop_offset_y: 0.0,
        }
    }

    /// Reject records the engine cannot lay out.
    pub fn check(&self) -> Result<()> {
        if self.natural_width == 0 || self.natural_height == 0 {
            return Err(LayoutError::InvalidImage {
                id: self.id,
                reason: format!(
                    "natural size must be positive, got {}x{}",
                    self.natural_width, self.natural_height
                ),
            });
        }
        Ok(())
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.natural_width as f64 / self.natural_height.max(1) as f64
    }
}

/// One image resolved to pixels on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageImagePlacement {
    pub image_id: ImageId,
    pub x: f64,
    pub y: f64,
    pub preview_width: f64,
    pub preview_height: f64,
    /// Grid block this placement was rendered from.
    pub cell: Placement,
    #[serde(default)]
    pub borders: Borders,
}

impl PageImagePlacement {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.preview_width, self.preview_height)
    }
}

/// How full a page is relative to the active capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillState {
    Empty,
    PartiallyFilled,
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    pub width: f64,
    pub height: f64,
    pub color_id: String,
    /// Order has no visual meaning; it decides which image takes which
    /// placement and where cycling starts.
    pub images: Vec<PageImagePlacement>,
    #[serde(default)]
    pub grid: Option<GridSize>,
    #[serde(default)]
    pub current_template_id: Option<String>,
    #[serde(default)]
    pub template_cycle_index: usize,
}

impl Page {
    pub fn new(id: PageId, width: f64, height: f64, color_id: &str) -> Self {
        Self {
            id,
            width,
            height,
            color_id: color_id.to_string(),
            images: Vec::new(),
            grid: None,
            current_template_id: None,
            template_cycle_index: 0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn image_ids(&self) -> Vec<ImageId> {
        self.images.iter().map(|p| p.image_id).collect()
    }

    pub fn position_of(&self, image: ImageId) -> Option<usize> {
        self.images.iter().position(|p| p.image_id == image)
    }

    pub fn contains(&self, image: ImageId) -> bool {
        self.position_of(image).is_some()
    }

    pub fn image_rects(&self) -> Vec<(ImageId, Rect)> {
        self.images.iter().map(|p| (p.image_id, p.rect())).collect()
    }

    pub fn fill_state(&self, capacity: usize) -> FillState {
        match self.images.len() {
            0 => FillState::Empty,
            n if n >= capacity => FillState::Full,
            _ => FillState::PartiallyFilled,
        }
    }
}

/// Where an image reference lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "page")]
pub enum Container {
    Pool,
    Page(PageId),
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Pool => f.write_str("pool"),
            Container::Page(id) => write!(f, "page {id}"),
        }
    }
}

/// Everything a mutating operation can touch: pages, pool and the image
/// records they refer to. Cloning it is a deep snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumState {
    pub pages: Vec<Page>,
    /// Unplaced images, upload order unless reordered.
    pub pool: Vec<ImageId>,
    /// Every image record, in upload order.
    pub library: Vec<Image>,
    #[serde(default)]
    pub next_page_id: u64,
}

impl AlbumState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self, id: ImageId) -> Option<&Image> {
        self.library.iter().find(|i| i.id == id)
    }

    pub fn image_mut(&mut self, id: ImageId) -> Option<&mut Image> {
        self.library.iter_mut().find(|i| i.id == id)
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn page_index(&self, id: PageId) -> Result<usize> {
        self.pages
            .iter()
            .position(|p| p.id == id)
            .ok_or(LayoutError::PageNotFound(id))
    }

    /// Which container currently holds `image`.
    pub fn locate(&self, image: ImageId) -> Option<Container> {
        if self.pool.contains(&image) {
            return Some(Container::Pool);
        }
        self.pages
            .iter()
            .find(|p| p.contains(image))
            .map(|p| Container::Page(p.id))
    }

    /// Hand out the next page id. Stored in the state so undo restores it.
    pub fn allocate_page_id(&mut self) -> PageId {
        let floor = self.pages.iter().map(|p| p.id.0 + 1).max().unwrap_or(0);
        let id = self.next_page_id.max(floor);
        self.next_page_id = id + 1;
        PageId(id)
    }

    /// Verify ownership and geometry. Any failure is an internal fault.
    pub fn check_invariants(&self) -> Result<()> {
        let mut owners: BTreeMap<ImageId, usize> = BTreeMap::new();
        for id in self.pool.iter().chain(self.pages.iter().flat_map(|p| p.images.iter().map(|i| &i.image_id))) {
            *owners.entry(*id).or_default() += 1;
        }
        for image in &self.library {
            match owners.remove(&image.id) {
                Some(1) => {}
                Some(n) => {
                    return Err(LayoutError::Invariant(format!(
                        "image {} is held by {n} containers",
                        image.id
                    )))
                }
                None => {
                    return Err(LayoutError::Invariant(format!(
                        "image {} is held by no container",
                        image.id
                    )))
                }
            }
        }
        if let Some(stray) = owners.keys().next() {
            return Err(LayoutError::Invariant(format!(
                "image {stray} is placed but not in the library"
            )));
        }

        for page in &self.pages {
            check_page(page)?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a saved state, re-resolving borders and re-checking invariants.
    pub fn from_json(json: &str, border_tolerance: f64) -> Result<Self> {
        let mut state: AlbumState = serde_json::from_str(json)?;
        for page in &mut state.pages {
            apply_borders(page, border_tolerance);
        }
        state.check_invariants()?;
        Ok(state)
    }
}

fn check_page(page: &Page) -> Result<()> {
    if page.images.is_empty() {
        return Ok(());
    }
    let grid = page.grid.ok_or_else(|| {
        LayoutError::Invariant(format!("page {} has images but no grid", page.id))
    })?;
    if let Some(bad) = page.images.iter().find(|i| !i.cell.fits(grid)) {
        return Err(LayoutError::Invariant(format!(
            "image {} on page {} leaves its {}x{} grid",
            bad.image_id, page.id, grid.rows, grid.cols
        )));
    }
    let cells: Vec<Placement> = page.images.iter().map(|i| i.cell).collect();
    let overlaps = find_overlaps(&cells);
    if let Some(o) = overlaps.first() {
        return Err(LayoutError::Invariant(format!(
            "page {} has {} overlapping cell pairs (first: {} and {})",
            page.id,
            overlaps.len(),
            o.first,
            o.second
        )));
    }
    for (i, a) in page.images.iter().enumerate() {
        for b in &page.images[i + 1..] {
            if intersects(&a.rect(), &b.rect(), 0.5) {
                return Err(LayoutError::Invariant(format!(
                    "images {} and {} overlap on page {}",
                    a.image_id, b.image_id, page.id
                )));
            }
        }
    }
    Ok(())
}
