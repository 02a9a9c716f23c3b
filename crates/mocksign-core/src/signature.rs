//! Signature bitmaps and their cached scaled rasters.

use std::cell::OnceCell;
use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

use crate::types::{ComposeError, Dimensions};

/// Composite an image with alpha onto a white background.
///
/// Images without alpha are converted to RGB unchanged.
#[must_use]
pub fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    if !image.color().has_alpha() {
        return image.to_rgb8();
    }
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = u16::from(a);
        let over_white = |c: u8| {
            let blended = (u16::from(c) * a + 255 * (255 - a) + 127) / 255;
            u8::try_from(blended).unwrap_or(u8::MAX)
        };
        image::Rgb([over_white(r), over_white(g), over_white(b)])
    })
}

/// Size of `dimensions` multiplied by `factor`, floored, at least 1x1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn scaled_dimensions(dimensions: Dimensions, factor: f64) -> Dimensions {
    let side = |v: u32| {
        let scaled = (f64::from(v) * factor).floor();
        if scaled.is_finite() {
            scaled.clamp(1.0, f64::from(u32::MAX)) as u32
        } else {
            1
        }
    };
    Dimensions::new(side(dimensions.width), side(dimensions.height))
}

/// Resample `image` by `factor` with Catmull-Rom interpolation.
#[must_use]
pub fn resized(image: &RgbImage, factor: f64) -> RgbImage {
    let target = scaled_dimensions(Dimensions::of(image), factor);
    if target == Dimensions::of(image) {
        return image.clone();
    }
    image::imageops::resize(image, target.width, target.height, FilterType::CatmullRom)
}

fn check_scale(scale: f64) -> Result<(), ComposeError> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(ComposeError::InvalidScale(scale))
    }
}

/// A signature bitmap placed at some scale.
///
/// The scaled raster and its PNG encoding are computed on first use and
/// kept until [`set_scale`](Self::set_scale) changes the scale. Every
/// such change bumps [`version`](Self::version).
#[derive(Debug, Clone)]
pub struct Signature {
    source: Arc<RgbImage>,
    scale: f64,
    version: u64,
    scaled: OnceCell<Arc<RgbImage>>,
    png: OnceCell<Arc<[u8]>>,
}

impl Signature {
    /// Wrap a source bitmap at `scale`.
    ///
    /// # Errors
    ///
    /// [`ComposeError::InvalidScale`] unless `scale` is positive and
    /// finite.
    pub fn new(source: Arc<RgbImage>, scale: f64) -> Result<Self, ComposeError> {
        check_scale(scale)?;
        Ok(Self {
            source,
            scale,
            version: 0,
            scaled: OnceCell::new(),
            png: OnceCell::new(),
        })
    }

    #[must_use]
    pub const fn source(&self) -> &Arc<RgbImage> {
        &self.source
    }

    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Cache generation; starts at 0.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Change the scale, dropping the cached rasters if it differs.
    ///
    /// # Errors
    ///
    /// [`ComposeError::InvalidScale`] unless `scale` is positive and
    /// finite. The signature is unchanged on error.
    pub fn set_scale(&mut self, scale: f64) -> Result<(), ComposeError> {
        check_scale(scale)?;
        #[allow(clippy::float_cmp)]
        let unchanged = scale == self.scale;
        if !unchanged {
            self.scale = scale;
            self.version += 1;
            self.scaled = OnceCell::new();
            self.png = OnceCell::new();
        }
        Ok(())
    }

    /// Size of [`scaled`](Self::scaled) without computing it.
    #[must_use]
    pub fn scaled_dimensions(&self) -> Dimensions {
        scaled_dimensions(Dimensions::of(&*self.source), self.scale)
    }

    /// The source resampled to `floor(w * scale) x floor(h * scale)`.
    #[must_use]
    pub fn scaled(&self) -> Arc<RgbImage> {
        Arc::clone(
            self.scaled
                .get_or_init(|| Arc::new(resized(&self.source, self.scale))),
        )
    }

    /// PNG encoding of [`scaled`](Self::scaled).
    ///
    /// # Errors
    ///
    /// [`ComposeError::Encode`] if PNG encoding fails.
    pub fn scaled_png(&self) -> Result<Arc<[u8]>, ComposeError> {
        if let Some(png) = self.png.get() {
            return Ok(Arc::clone(png));
        }
        let scaled = DynamicImage::ImageRgb8((*self.scaled()).clone());
        let png: Arc<[u8]> = crate::raster::encode_png(&scaled)?.into();
        let _ = self.png.set(Arc::clone(&png));
        Ok(png)
    }
}
