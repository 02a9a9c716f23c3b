//! Histogram-stretching autocontrast.
//!
//! Scanners crush the paper to white and the ink to black. This filter
//! imitates that: per color channel, `cutoff` percent of the darkest and
//! of the lightest pixels are discarded from the histogram and the
//! remaining range is stretched linearly to `0..=255`.

use image::{DynamicImage, ImageBuffer, Pixel};

/// Stretch contrast after clipping `cutoff` percent at each end.
///
/// Alpha channels are not stretched. A channel whose clipped histogram
/// collapses to a single value is left unchanged.
#[must_use = "returns the contrast-stretched image"]
pub fn autocontrast(image: DynamicImage, cutoff: f32) -> DynamicImage {
    match image {
        DynamicImage::ImageLuma8(mut img) => {
            stretch(&mut img, 1, cutoff);
            DynamicImage::ImageLuma8(img)
        }
        DynamicImage::ImageLumaA8(mut img) => {
            stretch(&mut img, 1, cutoff);
            DynamicImage::ImageLumaA8(img)
        }
        DynamicImage::ImageRgba8(mut img) => {
            stretch(&mut img, 3, cutoff);
            DynamicImage::ImageRgba8(img)
        }
        other => {
            let mut img = other.to_rgb8();
            stretch(&mut img, 3, cutoff);
            DynamicImage::ImageRgb8(img)
        }
    }
}

fn stretch<P>(image: &mut ImageBuffer<P, Vec<u8>>, color_channels: usize, cutoff: f32)
where
    P: Pixel<Subpixel = u8>,
{
    for c in 0..color_channels {
        let mut histogram = [0_u64; 256];
        for pixel in image.pixels() {
            histogram[usize::from(pixel.channels()[c])] += 1;
        }
        let lut = stretch_lut(&histogram, cutoff);
        for pixel in image.pixels_mut() {
            let value = &mut pixel.channels_mut()[c];
            *value = lut[usize::from(*value)];
        }
    }
}

/// Build the lookup table for one channel's histogram.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn stretch_lut(histogram: &[u64; 256], cutoff: f32) -> [u8; 256] {
    let mut identity = [0_u8; 256];
    for (i, v) in identity.iter_mut().enumerate() {
        *v = i as u8;
    }

    let mut trimmed = *histogram;
    let total: u64 = trimmed.iter().sum();
    let cutoff = if cutoff.is_finite() { f64::from(cutoff.max(0.0)) } else { 0.0 };
    let cut = (total as f64 * cutoff / 100.0).floor() as u64;
    trim(trimmed.iter_mut(), cut);
    trim(trimmed.iter_mut().rev(), cut);

    let lo = trimmed.iter().position(|&n| n > 0);
    let hi = trimmed.iter().rposition(|&n| n > 0);
    let (Some(lo), Some(hi)) = (lo, hi) else {
        return identity;
    };
    if hi <= lo {
        return identity;
    }

    let span = (hi - lo) as f64;
    let mut lut = [0_u8; 256];
    for (i, v) in lut.iter_mut().enumerate() {
        *v = ((i as f64 - lo as f64) * 255.0 / span).clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Remove `cut` samples from the bins in iteration order.
fn trim<'a>(bins: impl Iterator<Item = &'a mut u64>, mut cut: u64) {
    for bin in bins {
        if cut == 0 {
            break;
        }
        let taken = cut.min(*bin);
        *bin -= taken;
        cut -= taken;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::cast_possible_truncation)]
    fn ramp(lo: u8, hi: u8) -> image::GrayImage {
        let span = u32::from(hi - lo) + 1;
        image::GrayImage::from_fn(span, 1, |x, _| image::Luma([lo + x as u8]))
    }

    #[test]
    fn zero_cutoff_stretches_to_full_range() {
        let out = autocontrast(DynamicImage::ImageLuma8(ramp(100, 150)), 0.0).to_luma8();
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(50, 0).0[0], 255);
    }

    #[test]
    fn uniform_channel_is_unchanged() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(5, 5, image::Luma([90])));
        assert_eq!(autocontrast(img.clone(), 2.0), img);
    }

    #[test]
    fn cutoff_ignores_outliers() {
        // 98 mid-gray samples plus one black and one white outlier.
        let mut img = image::GrayImage::from_fn(100, 1, |x, _| {
            #[allow(clippy::cast_possible_truncation)]
            let v = 100 + (x % 50) as u8;
            image::Luma([v])
        });
        img.put_pixel(0, 0, image::Luma([0]));
        img.put_pixel(99, 0, image::Luma([255]));

        let out = autocontrast(DynamicImage::ImageLuma8(img), 1.0).to_luma8();
        // With the outliers clipped, the darkest mid-gray reaches black.
        assert_eq!(out.get_pixel(50, 0).0[0], 0, "value 100 should map to 0");
        assert_eq!(out.get_pixel(49, 0).0[0], 255, "value 149 should map to 255");
    }

    #[test]
    fn channels_are_stretched_independently() {
        let img = image::RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgb([10, 0, 50])
            } else {
                image::Rgb([20, 255, 60])
            }
        });
        let out = autocontrast(DynamicImage::ImageRgb8(img), 0.0).to_rgb8();
        assert_eq!(out.get_pixel(0, 0), &image::Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(1, 0), &image::Rgb([255, 255, 255]));
    }

    #[test]
    fn alpha_is_not_stretched() {
        let img = image::RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([10, 10, 10, 100])
            } else {
                image::Rgba([20, 20, 20, 120])
            }
        });
        let out = autocontrast(DynamicImage::ImageRgba8(img), 0.0).to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0[3], 100);
        assert_eq!(out.get_pixel(1, 0).0[3], 120);
    }
}
