//! Raster encoding and PNG files.

use std::path::Path;

use image::DynamicImage;

use crate::IoError;

/// Encode `image` as PNG bytes.
///
/// # Errors
///
/// Returns [`IoError::Encode`] if PNG encoding fails.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, IoError> {
    mocksign_core::raster::encode_png(image).map_err(IoError::Encode)
}

/// Write `image` to `path` as PNG.
///
/// # Errors
///
/// Returns [`IoError::Encode`] if encoding fails and [`IoError::Io`] if
/// the file cannot be written.
pub fn save_png(path: &Path, image: &DynamicImage) -> Result<(), IoError> {
    let bytes = encode_png(image)?;
    std::fs::write(path, bytes).map_err(|e| IoError::io(path, e))?;
    tracing::info!(path = %path.display(), width = image.width(), height = image.height(), "png written");
    Ok(())
}
