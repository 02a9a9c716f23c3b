//! Shared types for the mocksign compositing engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::blend::BlendConfig;
use crate::filter::{FilterKind, FilterSetting};

/// Re-export `RgbImage` so downstream crates can hand page rasters
/// around without depending on `image` directly.
pub use image::RgbImage;

/// Re-export `RgbaImage` for canvas snapshots and decoded signatures.
pub use image::RgbaImage;

/// Re-export `DynamicImage`: filtered pages may be single-channel.
pub use image::DynamicImage;

/// A 2D point in canvas or page space.
///
/// Both spaces put the origin at the bottom-left corner, matching the
/// interactive canvas. Only the compositor flips to raster rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from the left edge).
    pub x: f64,
    /// Vertical position (pixels from the bottom edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.hypot(dy)
    }
}

/// Image or surface dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Create new dimensions.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Dimensions of any `image` buffer.
    #[must_use]
    pub fn of<I: image::GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    /// Returns `true` if either side is zero.
    #[must_use]
    pub const fn is_degenerate(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Opaque handle of one placed signature.
///
/// Minted by [`SignatureRegistry`](crate::registry::SignatureRegistry)
/// from a monotonically increasing counter; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlacementId(pub u64);

impl fmt::Display for PlacementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A document page: an immutable raster plus its zero-based index.
#[derive(Debug, Clone)]
pub struct Page {
    index: usize,
    image: std::sync::Arc<RgbImage>,
}

impl Page {
    /// Wrap a rasterized page.
    #[must_use]
    pub fn new(index: usize, image: RgbImage) -> Self {
        Self {
            index,
            image: std::sync::Arc::new(image),
        }
    }

    /// Zero-based page index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// The raw page raster.
    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Page size in pixels.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&*self.image)
    }
}

/// Scanner-look and compositing options.
///
/// Serialized as JSON by the CLI (`--config`, `--config-json`). The
/// defaults give a light office-scanner look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Blend signatures with a seamless clone instead of pasting them.
    pub remove_background: bool,

    /// Per-filter enabled flag and strength, applied by kind.
    /// Filters not listed keep their current state.
    pub filters: Vec<FilterSetting>,

    /// Poisson solver parameters for the seamless clone.
    pub blend: BlendConfig,
}

impl ScannerConfig {
    /// Default for [`remove_background`](Self::remove_background).
    pub const DEFAULT_REMOVE_BACKGROUND: bool = true;

    /// Default noise density (per-mille probability).
    pub const DEFAULT_NOISE_STRENGTH: f32 = 0.1;

    /// Default blur sigma.
    pub const DEFAULT_BLUR_STRENGTH: f32 = 1.0;

    /// Default maximum rotation in degrees.
    pub const DEFAULT_ROTATE_STRENGTH: f32 = 1.0;

    /// Default autocontrast cutoff in percent.
    pub const DEFAULT_AUTOCONTRAST_STRENGTH: f32 = 2.0;
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            remove_background: Self::DEFAULT_REMOVE_BACKGROUND,
            filters: vec![
                FilterSetting::new(FilterKind::Grayscale, true, None),
                FilterSetting::new(
                    FilterKind::Noise,
                    false,
                    Some(Self::DEFAULT_NOISE_STRENGTH),
                ),
                FilterSetting::new(FilterKind::Blur, false, Some(Self::DEFAULT_BLUR_STRENGTH)),
                FilterSetting::new(
                    FilterKind::RandomRotate,
                    true,
                    Some(Self::DEFAULT_ROTATE_STRENGTH),
                ),
                FilterSetting::new(
                    FilterKind::AutoContrast,
                    true,
                    Some(Self::DEFAULT_AUTOCONTRAST_STRENGTH),
                ),
            ],
            blend: BlendConfig::default(),
        }
    }
}

/// Errors raised by the compositing engine.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// A zero-sized image or canvas was given to the coordinate mapper.
    #[error("invalid geometry: image {image} cannot be fitted into canvas {canvas}")]
    InvalidGeometry {
        /// Size of the page image.
        image: Dimensions,
        /// Size of the canvas.
        canvas: Dimensions,
    },

    /// The placement id is already live on a page.
    #[error("signature {id} already exists on page {page}")]
    DuplicateId {
        /// The rejected id.
        id: PlacementId,
        /// Page on which the id is live.
        page: usize,
    },

    /// The placement id is the last one representable, so no id could be
    /// minted after it.
    #[error("signature {id} is reserved")]
    ReservedId {
        /// The rejected id.
        id: PlacementId,
    },

    /// No page holds the placement id.
    #[error("signature {id} does not exist")]
    NotFound {
        /// The missing id.
        id: PlacementId,
    },

    /// The document has no pages.
    #[error("document has no pages")]
    EmptyDocument,

    /// A page index beyond the document.
    #[error("page {page} does not exist (document has {page_count} pages)")]
    PageOutOfRange {
        /// Requested page index.
        page: usize,
        /// Number of pages in the document.
        page_count: usize,
    },

    /// A filter strength outside the filter's declared range.
    #[error("strength {value} for {filter} is outside {min}..={max}")]
    StrengthOutOfRange {
        /// Filter that rejected the value.
        filter: FilterKind,
        /// The rejected value.
        value: f32,
        /// Lower bound of the range.
        min: f32,
        /// Upper bound of the range.
        max: f32,
    },

    /// The filter takes no strength parameter.
    #[error("{filter} has no strength parameter")]
    NoStrength {
        /// Filter that rejected the value.
        filter: FilterKind,
    },

    /// A signature scale that is not a positive finite number.
    #[error("signature scale must be positive and finite, got {0}")]
    InvalidScale(f64),

    /// No loaded signature has this name.
    #[error("no signature named {0:?}")]
    UnknownSignature(String),

    /// The operation needs an open document.
    #[error("no document is open")]
    NoDocument,

    /// Encoding a raster for the canvas failed.
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dimensions_degenerate() {
        assert!(Dimensions::new(0, 10).is_degenerate());
        assert!(Dimensions::new(10, 0).is_degenerate());
        assert!(!Dimensions::new(1, 1).is_degenerate());
    }

    #[test]
    fn dimensions_display() {
        assert_eq!(Dimensions::new(640, 480).to_string(), "640x480");
    }

    #[test]
    fn page_exposes_index_and_size() {
        let page = Page::new(3, RgbImage::new(17, 31));
        assert_eq!(page.index(), 3);
        assert_eq!(page.dimensions(), Dimensions::new(17, 31));
    }

    #[test]
    fn scanner_config_defaults_give_light_scanner_look() {
        let config = ScannerConfig::default();
        assert!(config.remove_background);
        let kinds: Vec<FilterKind> = config.filters.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, FilterKind::DECLARED_ORDER.to_vec());
        let enabled: Vec<bool> = config.filters.iter().map(|f| f.enabled).collect();
        assert_eq!(enabled, vec![true, false, false, true, true]);
    }

    #[test]
    fn scanner_config_partial_json_fills_defaults() {
        let config: ScannerConfig =
            serde_json::from_str(r#"{ "remove_background": false }"#).unwrap();
        assert!(!config.remove_background);
        assert_eq!(config.filters.len(), 5);
        assert_eq!(config.blend, BlendConfig::default());
    }

    #[test]
    fn error_display_messages() {
        let err = ComposeError::DuplicateId {
            id: PlacementId(7),
            page: 2,
        };
        assert_eq!(err.to_string(), "signature #7 already exists on page 2");

        let err = ComposeError::PageOutOfRange {
            page: 4,
            page_count: 2,
        };
        assert_eq!(
            err.to_string(),
            "page 4 does not exist (document has 2 pages)",
        );
    }
}
