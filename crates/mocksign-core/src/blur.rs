//! Gaussian blur for the scanner look.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`], which works on one
//! channel at a time: color images are split into single-channel planes,
//! blurred plane by plane and reassembled. Gaussian blur is linear and
//! separable per channel, so the result is the same as blurring in color
//! space.

use image::{DynamicImage, GrayImage, ImageBuffer, Pixel};

/// Blur `image` with standard deviation `sigma`.
///
/// Non-positive sigma returns the image unchanged, since `imageproc`
/// panics on `sigma <= 0.0`. `Luma8`, `LumaA8`, `Rgb8` and `Rgba8` keep
/// their color type; anything else is blurred as `Rgb8`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: DynamicImage, sigma: f32) -> DynamicImage {
    if sigma <= 0.0 || !sigma.is_finite() {
        return image;
    }

    match image {
        DynamicImage::ImageLuma8(gray) => {
            DynamicImage::ImageLuma8(imageproc::filter::gaussian_blur_f32(&gray, sigma))
        }
        DynamicImage::ImageLumaA8(img) => DynamicImage::ImageLumaA8(blur_planes(&img, sigma)),
        DynamicImage::ImageRgb8(img) => DynamicImage::ImageRgb8(blur_planes(&img, sigma)),
        DynamicImage::ImageRgba8(img) => DynamicImage::ImageRgba8(blur_planes(&img, sigma)),
        other => DynamicImage::ImageRgb8(blur_planes(&other.to_rgb8(), sigma)),
    }
}

/// Blur every channel of an 8-bit image independently.
fn blur_planes<P>(image: &ImageBuffer<P, Vec<u8>>, sigma: f32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = image.dimensions();
    let channels = usize::from(P::CHANNEL_COUNT);

    let blurred: Vec<GrayImage> = (0..channels)
        .map(|c| {
            let plane = GrayImage::from_fn(w, h, |x, y| {
                image::Luma([image.get_pixel(x, y).channels()[c]])
            });
            imageproc::filter::gaussian_blur_f32(&plane, sigma)
        })
        .collect();

    let mut out = image.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        for (c, value) in pixel.channels_mut().iter_mut().enumerate() {
            *value = blurred[c].get_pixel(x, y).0[0];
        }
    }
    out
}
