//! Image persistence: `DynamicImage` → `images/page_<N>_image_<M>.png`.
//!
//! PNG is lossless, so what the vision model reads back from disk is exactly
//! what pdfium rendered. Encoding happens in memory; only the final write
//! touches the filesystem.

use crate::error::ExtractError;
use image::DynamicImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name for the `sequence`-th image, found on 1-indexed `page`.
pub fn image_file_name(page: usize, sequence: usize) -> String {
    format!("page_{page}_image_{sequence}.png")
}

/// PNG-encode an image into memory.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Write `img` under `images_dir` and return its path.
///
/// `images_dir` must already exist.
pub async fn persist_image(
    img: &DynamicImage,
    images_dir: &Path,
    page: usize,
    sequence: usize,
) -> Result<PathBuf, ExtractError> {
    let path = images_dir.join(image_file_name(page, sequence));

    let bytes = encode_png(img).map_err(|e| ExtractError::ImageEncodeFailed {
        page,
        detail: e.to_string(),
    })?;

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ExtractError::ImageWriteFailed {
            path: path.clone(),
            source: e,
        })?;

    debug!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}
