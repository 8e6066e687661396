//! # Editing Session
//!
//! Owns the catalog, configuration, album state and history, and is the
//! only place state changes are committed. Each mutating call:
//!
//! 1. clones the current state,
//! 2. runs the [`Arranger`] operation on the clone,
//! 3. re-checks the ownership and overlap invariants,
//! 4. swaps the clone in and records a history entry.
//!
//! Any error along the way drops the clone, so a failed call leaves the
//! state exactly as it was. Calls that change nothing record no history.
//!
//! The session is single-writer. A host that shares one across threads
//! should wrap it in a mutex so each operation and its history push happen
//! under the same lock.
//!
//! ## Drag and drop
//!
//! [`Session::begin_move`] picks an image up, [`Session::propose_target`]
//! previews a drop without touching state, and [`Session::commit_move`] is
//! the single mutating step.

use rand::Rng;
use serde::Serialize;

use crate::arrange::{ArrangeSummary, Arranger, CancelToken, LayoutIndicator, RandomStyle};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::{ErrorKind, LayoutError, Result};
use crate::history::{History, HistoryEntry};
use crate::model::{AlbumState, Container, Image, ImageId, Page, PageId};

/// An image picked up by [`Session::begin_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveHandle {
    pub image: ImageId,
    pub from: Container,
}

/// Outcome of previewing a drop.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveProposal {
    /// The drop would succeed. `preview` is the destination page as it
    /// would look afterwards (`None` when dropping into the pool).
    Accepted { preview: Option<Page> },
    Rejected { kind: ErrorKind, reason: String },
}

impl MoveProposal {
    pub fn is_accepted(&self) -> bool {
        matches!(self, MoveProposal::Accepted { .. })
    }
}

#[derive(Debug)]
pub struct Session {
    catalog: Catalog,
    config: EngineConfig,
    state: AlbumState,
    history: History,
    pending_move: Option<MoveHandle>,
}

impl Session {
    /// Start an empty album.
    pub fn new(catalog: Catalog, config: EngineConfig) -> Result<Self> {
        Self::with_state(catalog, config, AlbumState::new())
    }

    /// Resume from a saved state. The state must satisfy every invariant.
    pub fn with_state(catalog: Catalog, config: EngineConfig, state: AlbumState) -> Result<Self> {
        config.validate()?;
        state.check_invariants()?;
        let history = History::new(config.history_limit);
        Ok(Self {
            catalog,
            config,
            state,
            history,
            pending_move: None,
        })
    }

    pub fn state(&self) -> &AlbumState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn arranger(&self) -> Arranger<'_> {
        Arranger::new(&self.catalog, &self.config)
    }

    /// Run `op` on a copy of the state and commit it atomically.
    fn transact<T>(
        &mut self,
        description: impl Into<String>,
        op: impl FnOnce(&Arranger<'_>, &mut AlbumState) -> Result<T>,
    ) -> Result<T> {
        let mut next = self.state.clone();
        let arranger = Arranger::new(&self.catalog, &self.config);
        let out = op(&arranger, &mut next)?;
        if next == self.state {
            return Ok(out);
        }
        next.check_invariants()?;

        let description = description.into();
        log::debug!("Commit: {description}");
        let before = std::mem::replace(&mut self.state, next);
        self.history.push(HistoryEntry {
            description,
            before,
            after: self.state.clone(),
        });
        self.pending_move = None;
        Ok(out)
    }

    pub fn add_images(&mut self, images: Vec<Image>) -> Result<()> {
        let description = format!("Add {} images", images.len());
        self.transact(description, |a, s| a.add_images(s, images))
    }

    pub fn remove_image(&mut self, image: ImageId) -> Result<()> {
        self.transact(format!("Remove image {image}"), |a, s| a.remove_image(s, image))
    }

    pub fn adjust_image(&mut self, image: ImageId, scale: f64, offset_x: f64, offset_y: f64) -> Result<()> {
        self.transact(format!("Adjust image {image}"), |a, s| {
            a.adjust_image(s, image, scale, offset_x, offset_y)
        })
    }

    pub fn auto_arrange_all(&mut self) -> Result<ArrangeSummary> {
        self.auto_arrange_all_with(&CancelToken::new())
    }

    /// Auto-arrange that honours `cancel` up to the commit point. A
    /// cancelled run returns [`LayoutError::Cancelled`] and changes nothing.
    pub fn auto_arrange_all_with(&mut self, cancel: &CancelToken) -> Result<ArrangeSummary> {
        self.transact("Auto-arrange all", |a, s| a.auto_arrange_all_with(s, cancel))
    }

    pub fn auto_arrange_page(&mut self, page: PageId) -> Result<()> {
        self.transact(format!("Auto-arrange page {page}"), |a, s| a.auto_arrange_page(s, page))
    }

    pub fn next_layout(&mut self, page: PageId) -> Result<LayoutIndicator> {
        self.transact(format!("Next layout on page {page}"), |a, s| a.cycle_layout(s, page, 1))
    }

    pub fn previous_layout(&mut self, page: PageId) -> Result<LayoutIndicator> {
        self.transact(format!("Previous layout on page {page}"), |a, s| {
            a.cycle_layout(s, page, -1)
        })
    }

    pub fn layout_indicator(&self, page: PageId) -> Result<LayoutIndicator> {
        self.arranger().layout_indicator(&self.state, page)
    }

    pub fn randomize_page<R: Rng>(&mut self, page: PageId, style: RandomStyle, rng: &mut R) -> Result<()> {
        self.transact(format!("Randomize page {page}"), |a, s| {
            a.randomize_page(s, page, style, rng)
        })
    }

    pub fn move_image(&mut self, image: ImageId, from: Container, to: Container, to_index: usize) -> Result<()> {
        self.transact(format!("Move image {image} to {to}"), |a, s| {
            a.move_image(s, image, from, to, to_index)
        })
    }

    pub fn add_page(&mut self) -> Result<PageId> {
        self.transact("Add page", |a, s| Ok(a.new_page(s)))
    }

    pub fn remove_page(&mut self, page: PageId) -> Result<()> {
        self.transact(format!("Remove page {page}"), |a, s| a.remove_page(s, page))
    }

    pub fn clear_pages(&mut self) -> Result<()> {
        self.transact("Clear pages", |a, s| a.clear_pages(s))
    }

    pub fn set_page_color(&mut self, page: PageId, color_id: &str) -> Result<()> {
        self.transact(format!("Color page {page}"), |a, s| a.set_page_color(s, page, color_id))
    }

    /// Pick up an image for dragging.
    pub fn begin_move(&mut self, image: ImageId) -> Result<MoveHandle> {
        let from = self.state.locate(image).ok_or(LayoutError::ImageNotFound(image))?;
        let handle = MoveHandle { image, from };
        self.pending_move = Some(handle);
        Ok(handle)
    }

    /// Preview dropping `handle` at `to`/`to_index`. Never mutates.
    pub fn propose_target(&self, handle: &MoveHandle, to: Container, to_index: usize) -> MoveProposal {
        let mut scratch = self.state.clone();
        let arranger = self.arranger();
        match arranger.move_image(&mut scratch, handle.image, handle.from, to, to_index) {
            Ok(()) => MoveProposal::Accepted {
                preview: match to {
                    Container::Page(id) => scratch.page(id).cloned(),
                    Container::Pool => None,
                },
            },
            Err(e) => MoveProposal::Rejected {
                kind: e.kind(),
                reason: e.to_string(),
            },
        }
    }

    /// Drop the image picked up by [`Session::begin_move`]. On error the
    /// move stays pending so the caller can try another target.
    pub fn commit_move(&mut self, to: Container, to_index: usize) -> Result<()> {
        let handle = self.pending_move.ok_or(LayoutError::NoActiveMove)?;
        self.move_image(handle.image, handle.from, to, to_index)?;
        self.pending_move = None;
        Ok(())
    }

    pub fn cancel_move(&mut self) {
        self.pending_move = None;
    }

    pub fn pending_move(&self) -> Option<MoveHandle> {
        self.pending_move
    }

    pub fn undo(&mut self) -> Result<String> {
        self.pending_move = None;
        let description = self.history.undo(&mut self.state)?.to_string();
        log::debug!("Undo: {description}");
        Ok(description)
    }

    pub fn redo(&mut self) -> Result<String> {
        self.pending_move = None;
        let description = self.history.redo(&mut self.state)?.to_string();
        log::debug!("Redo: {description}");
        Ok(description)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Switch to new settings and re-render every page at the new geometry.
    ///
    /// Rejected without changes if the settings are invalid or any page
    /// holds more images than the new capacity allows. History is cleared,
    /// since older snapshots were laid out for the previous settings.
    pub fn apply_config(&mut self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        let capacity = config.capacity();
        if let Some(page) = self.state.pages.iter().find(|p| p.len() > capacity) {
            return Err(LayoutError::Config(format!(
                "page {} holds {} images, new capacity is {}",
                page.id,
                page.len(),
                capacity
            )));
        }

        let mut next = self.state.clone();
        let arranger = Arranger::new(&self.catalog, &config);
        for page in &mut next.pages {
            page.width = config.page_width;
            page.height = config.page_height;
            arranger.rerender(page)?;
        }
        next.check_invariants()?;

        log::info!(
            "Applied settings: {}x{} pages, capacity {}",
            config.page_width,
            config.page_height,
            capacity
        );
        self.state = next;
        self.history = History::new(config.history_limit);
        self.config = config;
        self.pending_move = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(images: u64) -> Session {
        let mut s = Session::new(Catalog::builtin().unwrap(), EngineConfig::default()).unwrap();
        let imgs = (1..=images).map(|i| Image::new(i, format!("img{i}"), 300, 200)).collect();
        s.add_images(imgs).unwrap();
        s
    }

    #[test]
    fn failed_operation_leaves_state_and_history_alone() {
        let mut s = session(2);
        let before = s.state().clone();
        let undo_len = s.history().undo_len();
        let err = s.remove_page(PageId(99)).unwrap_err();
        assert!(matches!(err, LayoutError::PageNotFound(_)));
        assert_eq!(s.state(), &before);
        assert_eq!(s.history().undo_len(), undo_len);
    }

    #[test]
    fn no_op_records_no_history() {
        let mut s = session(3);
        let len = s.history().undo_len();
        s.move_image(ImageId(1), Container::Pool, Container::Pool, 0).unwrap();
        assert_eq!(s.history().undo_len(), len);
    }

    #[test]
    fn cancelled_arrange_changes_nothing() {
        let mut s = session(10);
        let before = s.state().clone();
        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(s.auto_arrange_all_with(&token), Err(LayoutError::Cancelled)));
        assert_eq!(s.state(), &before);
    }

    #[test]
    fn arrange_on_worker_thread() {
        let mut s = session(10);
        let token = CancelToken::new();
        let handle = std::thread::spawn(move || {
            let summary = s.auto_arrange_all_with(&token).unwrap();
            (s, summary)
        });
        let (s, summary) = handle.join().unwrap();
        assert_eq!(summary.placed, 10);
        assert_eq!(s.state().pages.len(), 2);
    }

    #[test]
    fn drag_protocol_previews_then_commits() {
        let mut s = session(3);
        let page = s.add_page().unwrap();
        let handle = s.begin_move(ImageId(2)).unwrap();
        assert_eq!(handle.from, Container::Pool);

        let before = s.state().clone();
        let proposal = s.propose_target(&handle, Container::Page(page), 0);
        match &proposal {
            MoveProposal::Accepted { preview: Some(p) } => assert_eq!(p.image_ids(), vec![ImageId(2)]),
            other => panic!("unexpected proposal {other:?}"),
        }
        assert_eq!(s.state(), &before, "preview must not mutate");

        s.commit_move(Container::Page(page), 0).unwrap();
        assert_eq!(s.state().page(page).unwrap().image_ids(), vec![ImageId(2)]);
        assert!(s.pending_move().is_none());
        assert!(matches!(s.commit_move(Container::Pool, 0), Err(LayoutError::NoActiveMove)));
    }

    #[test]
    fn proposal_rejects_full_page() {
        let mut s = session(7);
        s.auto_arrange_all().unwrap();
        let full = s.state().pages[0].id;
        let handle = s.begin_move(ImageId(7)).unwrap();
        let proposal = s.propose_target(&handle, Container::Page(full), 0);
        assert!(matches!(
            proposal,
            MoveProposal::Rejected {
                kind: ErrorKind::Capacity,
                ..
            }
        ));
    }

    #[test]
    fn apply_config_rerenders_pages() {
        let mut s = session(4);
        s.auto_arrange_all().unwrap();
        let config = EngineConfig {
            page_width: 600.0,
            page_height: 900.0,
            ..EngineConfig::default()
        };
        s.apply_config(config).unwrap();
        let page = &s.state().pages[0];
        assert_eq!(page.width, 600.0);
        assert!(page.images.iter().all(|i| i.x + i.preview_width <= 600.0));
        assert!(!s.can_undo());
    }

    #[test]
    fn apply_config_rejects_shrinking_below_contents() {
        let mut s = session(6);
        s.auto_arrange_all().unwrap();
        let before = s.state().clone();
        let config = EngineConfig {
            max_images_per_page: Some(4),
            ..EngineConfig::default()
        };
        assert!(s.apply_config(config).is_err());
        assert_eq!(s.state(), &before);
        assert_eq!(s.config().capacity(), 6);
    }
}
