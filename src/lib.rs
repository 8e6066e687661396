//! # pagegrid
//!
//! A page-native image arrangement engine.
//!
//! An album is a set of fixed-size pages and a pool of images. pagegrid
//! fills the pages with non-overlapping grid layouts, automatically or one
//! drag at a time, and keeps every edit undoable. The page is the unit of
//! layout: each page picks a template sized for exactly the images it
//! holds, and the template is re-chosen whenever that set changes.
//!
//! ## Architecture
//!
//! ```text
//!   [catalog]   ranked grid templates per (page aspect, image count)
//!       ↓
//!   [validate]  drops overlapping / wasteful templates at build time
//!       ↓
//!   [arrange]   pool ↔ pages, auto-arrange, cycle, randomize, move
//!       ↓
//!   [borders]   which image edges touch a neighbour
//!       ↓
//!   [session]   atomic commits + [history] undo/redo
//! ```

pub mod error;
pub mod config;
pub mod geometry;
pub mod catalog;
pub mod validate;
pub mod model;
pub mod borders;
pub mod arrange;
pub mod history;
pub mod session;
pub mod source;

pub use error::{ErrorKind, LayoutError, Result};

use serde::{Deserialize, Serialize};

use catalog::Catalog;
use config::EngineConfig;
use model::Image;
use session::Session;

/// Input accepted by [`arrange_json`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumInput {
    #[serde(default)]
    pub config: EngineConfig,
    pub images: Vec<Image>,
}

/// Auto-arrange a fresh album and return the session holding it.
pub fn arrange(input: AlbumInput) -> Result<Session> {
    let mut session = Session::new(Catalog::builtin()?, input.config)?;
    session.add_images(input.images)?;
    session.auto_arrange_all()?;
    Ok(session)
}

/// Auto-arrange an album described as JSON and return the resolved state
/// (pages with pixel placements and borders) as JSON.
pub fn arrange_json(json: &str) -> Result<String> {
    let input: AlbumInput = serde_json::from_str(json)?;
    arrange(input)?.state().to_json()
}
