//! Structured error types for the pagegrid engine.
//!
//! Every public operation returns [`Result`]. Variants group into the broad
//! [`ErrorKind`] categories callers branch on: configuration problems are
//! fatal, capacity and not-found problems are recoverable no-ops.

use thiserror::Error;

use crate::model::{Container, ImageId, PageId};

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// The unified error type returned by all public pagegrid API functions.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Engine settings or the template catalog are unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The catalog cannot supply any template for this image count,
    /// even after adaptation.
    #[error("No template for {count} images")]
    NoTemplate { count: usize },

    /// The destination page already holds as many images as it can.
    #[error("Page {page} is full ({capacity} images)")]
    PageFull { page: PageId, capacity: usize },

    #[error("Image {0} not found")]
    ImageNotFound(ImageId),

    #[error("Page {0} not found")]
    PageNotFound(PageId),

    /// The image exists but is not held by the container the caller named.
    #[error("Image {image} is not in {container}")]
    ImageNotInContainer { image: ImageId, container: Container },

    /// An inbound image record was rejected.
    #[error("Invalid image {id}: {reason}")]
    InvalidImage { id: ImageId, reason: String },

    #[error("Nothing to arrange on page {0}")]
    NothingToArrange(PageId),

    /// Internal logic fault: overlap or ownership breakage detected.
    #[error("Layout invariant violated: {0}")]
    Invariant(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("No move in progress")]
    NoActiveMove,

    /// JSON input failed to parse as album state or input.
    #[error("Failed to parse input: {source}{}", format_hint(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image probe failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Coarse classification of [`LayoutError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Capacity,
    NotFound,
    Invariant,
    Input,
    Cancelled,
    History,
}

impl LayoutError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LayoutError::Config(_) | LayoutError::NoTemplate { .. } => ErrorKind::Configuration,
            LayoutError::PageFull { .. } => ErrorKind::Capacity,
            LayoutError::ImageNotFound(_)
            | LayoutError::PageNotFound(_)
            | LayoutError::ImageNotInContainer { .. } => ErrorKind::NotFound,
            LayoutError::Invariant(_) => ErrorKind::Invariant,
            LayoutError::InvalidImage { .. }
            | LayoutError::NothingToArrange(_)
            | LayoutError::NoActiveMove
            | LayoutError::Parse { .. }
            | LayoutError::Io(_)
            | LayoutError::Image(_) => ErrorKind::Input,
            LayoutError::Cancelled => ErrorKind::Cancelled,
            LayoutError::NothingToUndo | LayoutError::NothingToRedo => ErrorKind::History,
        }
    }

    /// Whether the caller can retry with different arguments.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.kind(),
            ErrorKind::Configuration | ErrorKind::Invariant
        )
    }
}

fn format_hint(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the album schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        LayoutError::Parse { source: e, hint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_carry_hints() {
        let err: LayoutError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,")
            .unwrap_err()
            .into();
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to parse input"));
        assert!(msg.contains("Hint:"), "missing hint in: {msg}");
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn capacity_errors_are_recoverable() {
        let err = LayoutError::PageFull {
            page: PageId(3),
            capacity: 6,
        };
        assert_eq!(err.kind(), ErrorKind::Capacity);
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "Page 3 is full (6 images)");
    }

    #[test]
    fn configuration_errors_are_fatal() {
        assert!(!LayoutError::NoTemplate { count: 40 }.is_recoverable());
        assert!(!LayoutError::Config("bad".into()).is_recoverable());
    }
}
