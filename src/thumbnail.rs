use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};

use crate::Result;

/// Renders a single video frame to an image file.
pub trait FrameExtractor {
    fn extract_frame(&self, video: &Path, offset: Duration, target: &Path) -> Result<()>;
}

impl<T: FrameExtractor + ?Sized> FrameExtractor for &T {
    fn extract_frame(&self, video: &Path, offset: Duration, target: &Path) -> Result<()> {
        (**self).extract_frame(video, offset, target)
    }
}

/// Where the thumbnail of `video` lives inside `container`: the file name
/// encoded as unpadded URL-safe Base64, with a `.jpg` extension.
pub fn thumbnail_path(container: &Path, video: &Path) -> Option<PathBuf> {
    let file_name = video.file_name()?.to_str()?;
    let encoded = general_purpose::URL_SAFE_NO_PAD.encode(file_name.as_bytes());
    Some(container.join(format!("{encoded}.jpg")))
}

/// Returns the thumbnail for `video`, rendering it unless it already exists.
/// A failed render is logged and yields `None`.
pub fn ensure_thumbnail<E: FrameExtractor>(
    extractor: &E,
    container: &Path,
    video: &Path,
    offset: Duration,
) -> Option<PathBuf> {
    let target = thumbnail_path(container, video)?;
    if target.exists() {
        return Some(target);
    }
    match extractor.extract_frame(video, offset, &target) {
        Ok(()) => Some(target),
        Err(e) => {
            log::warn!("no thumbnail for {}: {e}", video.display());
            None
        }
    }
}
