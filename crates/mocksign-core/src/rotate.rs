//! Small random rotation, imitating a sheet fed slightly askew.

use image::DynamicImage;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use rand::Rng;

/// Draw an angle uniformly from `[-max_degrees, +max_degrees]`.
///
/// Returns `0.0` without touching `rng` when `max_degrees` is not a
/// positive finite number.
pub fn sample_angle<R: Rng + ?Sized>(max_degrees: f32, rng: &mut R) -> f32 {
    if !(max_degrees.is_finite() && max_degrees > 0.0) {
        return 0.0;
    }
    rng.random_range(-max_degrees..=max_degrees)
}

/// Rotate by a random angle of at most `max_degrees` either way.
#[must_use = "returns the rotated image"]
pub fn random_rotate<R: Rng + ?Sized>(
    image: DynamicImage,
    max_degrees: f32,
    rng: &mut R,
) -> DynamicImage {
    let degrees = sample_angle(max_degrees, rng);
    rotate(image, degrees)
}

/// Rotate counter-clockwise by `degrees` about the image center.
///
/// Uses bilinear resampling. The output keeps the input size; corners
/// uncovered by the rotation are filled with white.
#[must_use = "returns the rotated image"]
pub fn rotate(image: DynamicImage, degrees: f32) -> DynamicImage {
    if degrees == 0.0 {
        return image;
    }

    // imageproc rotates clockwise for positive theta.
    let theta = -degrees.to_radians();
    let bilinear = Interpolation::Bilinear;
    match image {
        DynamicImage::ImageLuma8(img) => DynamicImage::ImageLuma8(rotate_about_center(
            &img,
            theta,
            bilinear,
            image::Luma([u8::MAX]),
        )),
        DynamicImage::ImageLumaA8(img) => DynamicImage::ImageLumaA8(rotate_about_center(
            &img,
            theta,
            bilinear,
            image::LumaA([u8::MAX, u8::MAX]),
        )),
        DynamicImage::ImageRgba8(img) => DynamicImage::ImageRgba8(rotate_about_center(
            &img,
            theta,
            bilinear,
            image::Rgba([u8::MAX; 4]),
        )),
        other => DynamicImage::ImageRgb8(rotate_about_center(
            &other.to_rgb8(),
            theta,
            bilinear,
            image::Rgb([u8::MAX; 3]),
        )),
    }
}
