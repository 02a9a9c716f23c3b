//! Salt noise: scattered pixels of random intensity, like dust on the
//! scanner glass.

use image::{DynamicImage, ImageBuffer, Pixel};
use rand::Rng;

/// Per-pixel corruption probability for a given noise strength.
///
/// The strength is a density in per-mille: `strength / 1000`, clamped to
/// `[0, 1]`.
#[must_use]
pub fn corruption_probability(strength: f32) -> f64 {
    let p = f64::from(strength) / 1000.0;
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

/// Replace each pixel, independently with probability
/// [`corruption_probability(strength)`](corruption_probability), by a
/// uniformly drawn intensity.
///
/// The same intensity is written to every color channel of a hit pixel;
/// alpha is left alone.
#[must_use = "returns the noisy image"]
pub fn salt_noise<R: Rng + ?Sized>(image: DynamicImage, strength: f32, rng: &mut R) -> DynamicImage {
    let probability = corruption_probability(strength);
    if probability <= 0.0 {
        return image;
    }

    match image {
        DynamicImage::ImageLuma8(mut img) => {
            sprinkle(&mut img, 1, probability, rng);
            DynamicImage::ImageLuma8(img)
        }
        DynamicImage::ImageLumaA8(mut img) => {
            sprinkle(&mut img, 1, probability, rng);
            DynamicImage::ImageLumaA8(img)
        }
        DynamicImage::ImageRgba8(mut img) => {
            sprinkle(&mut img, 3, probability, rng);
            DynamicImage::ImageRgba8(img)
        }
        other => {
            let mut img = other.to_rgb8();
            sprinkle(&mut img, 3, probability, rng);
            DynamicImage::ImageRgb8(img)
        }
    }
}

fn sprinkle<P, R>(
    image: &mut ImageBuffer<P, Vec<u8>>,
    color_channels: usize,
    probability: f64,
    rng: &mut R,
) where
    P: Pixel<Subpixel = u8>,
    R: Rng + ?Sized,
{
    for pixel in image.pixels_mut() {
        if rng.random_bool(probability) {
            let intensity: u8 = rng.random();
            for channel in pixel.channels_mut().iter_mut().take(color_channels) {
                *channel = intensity;
            }
        }
    }
}
