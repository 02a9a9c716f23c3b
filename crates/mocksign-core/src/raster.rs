//! PNG encoding of rasters handed to the canvas.

use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};

/// Encode `image` as PNG bytes.
///
/// 8-bit luma, luma-alpha, RGB and RGBA images are written as is; other
/// color types are converted to RGBA first.
///
/// # Errors
///
/// Returns the encoder's [`image::ImageError`].
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut png_bytes = Vec::new();
    let encoder = PngEncoder::new(&mut png_bytes);
    let (width, height) = (image.width(), image.height());
    match image {
        DynamicImage::ImageLuma8(img) => {
            encoder.write_image(img.as_raw(), width, height, ExtendedColorType::L8)?;
        }
        DynamicImage::ImageLumaA8(img) => {
            encoder.write_image(img.as_raw(), width, height, ExtendedColorType::La8)?;
        }
        DynamicImage::ImageRgb8(img) => {
            encoder.write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)?;
        }
        DynamicImage::ImageRgba8(img) => {
            encoder.write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)?;
        }
        other => {
            let rgba = other.to_rgba8();
            encoder.write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)?;
        }
    }
    Ok(png_bytes)
}
