//! Image intake for the CLI.
//!
//! Turns files on disk into [`Image`] records. Only the header is read to
//! learn the natural size; pixel data is never decoded here and the path
//! itself becomes the opaque `source_ref`.

use std::path::Path;

use crate::error::Result;
use crate::model::Image;

/// Read the natural dimensions of the image at `path`.
pub fn probe_image(id: u64, path: &Path) -> Result<Image> {
    let (width, height) = image::image_dimensions(path)?;
    let record = Image::new(id, path.to_string_lossy(), width, height);
    record.check()?;
    log::debug!("Probed {} ({}x{})", path.display(), width, height);
    Ok(record)
}

/// Probe several files, numbering them from 1 in the order given.
pub fn probe_all<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Image>> {
    paths
        .iter()
        .enumerate()
        .map(|(i, p)| probe_image(i as u64 + 1, p.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LayoutError;

    #[test]
    fn missing_file_is_an_error() {
        let err = probe_image(1, Path::new("/nonexistent/photo.png")).unwrap_err();
        assert!(matches!(err, LayoutError::Image(_)), "{err}");
    }
}
