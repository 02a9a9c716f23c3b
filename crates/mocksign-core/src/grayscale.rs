//! Grayscale conversion, the first step of the scanner look.

use image::DynamicImage;

/// Convert to single-channel luminance.
///
/// Uses the `image` crate's weighted formula, so green contributes more
/// than red and red more than blue. An image that is already `Luma8`
/// is returned as is.
#[must_use = "returns the grayscale image"]
pub fn grayscale(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(_) => image,
        other => DynamicImage::ImageLuma8(other.to_luma8()),
    }
}
