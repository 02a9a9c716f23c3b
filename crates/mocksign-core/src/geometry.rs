//! Letterbox geometry between the interactive canvas and a page raster.
//!
//! A page of arbitrary aspect ratio is shown on a canvas of arbitrary
//! size by scaling it to touch either the canvas height (page relatively
//! taller) or the canvas width (page relatively wider, ties included),
//! then centering it along the other axis:
//!
//! ```text
//! image_aspect < canvas_aspect:      otherwise:
//! +----+--------+----+               +--------------+
//! |pad |  page  |pad |               |     pad      |
//! |    |        |    |               +--------------+
//! |    |        |    |               |     page     |
//! +----+--------+----+               +--------------+
//!                                    |     pad      |
//!                                    +--------------+
//! ```
//!
//! [`graph_to_page`] and [`page_to_graph`] convert points between the two
//! spaces. Neither clamps: a pointer over the padding maps to a point
//! outside the page and callers decide what that means.

use image::imageops::FilterType;

use crate::types::{ComposeError, Dimensions, Point, RgbImage};

/// Pad color used around letterboxed content.
pub const PAD_COLOR: image::Rgb<u8> = image::Rgb([128, 128, 128]);

/// Placement of a letterboxed image inside a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Canvas pixels left of the content.
    pub left_offset: u32,
    /// Canvas pixels above the content. The pad below takes the odd
    /// pixel, see [`CoordinateMapper::bottom_offset`].
    pub top_offset: u32,
    /// Width of the content in canvas pixels.
    pub width: u32,
    /// Height of the content in canvas pixels.
    pub height: u32,
    /// Page pixels per canvas pixel.
    pub scale: f64,
}

/// Fit an image into a canvas, preserving aspect ratio.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidGeometry`] if either size has a zero
/// side.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fit(image: Dimensions, canvas: Dimensions) -> Result<Letterbox, ComposeError> {
    if image.is_degenerate() || canvas.is_degenerate() {
        return Err(ComposeError::InvalidGeometry { image, canvas });
    }

    let (w, h) = (f64::from(image.width), f64::from(image.height));
    let (cw, ch) = (f64::from(canvas.width), f64::from(canvas.height));

    if w / h < cw / ch {
        let width = ((w * ch / h).round() as u32).max(1);
        Ok(Letterbox {
            left_offset: canvas.width.saturating_sub(width) / 2,
            top_offset: 0,
            width,
            height: canvas.height,
            scale: h / ch,
        })
    } else {
        let height = ((h * cw / w).round() as u32).max(1);
        Ok(Letterbox {
            left_offset: 0,
            top_offset: canvas.height.saturating_sub(height) / 2,
            width: canvas.width,
            height,
            scale: w / cw,
        })
    }
}

/// Convert a canvas point to page space.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidGeometry`] for a zero-sized page or
/// canvas.
pub fn graph_to_page(
    point: Point,
    canvas: Dimensions,
    page: Dimensions,
) -> Result<Point, ComposeError> {
    CoordinateMapper::new(page, canvas).map(|m| m.graph_to_page(point))
}

/// Convert a page point to canvas space. Exact inverse of
/// [`graph_to_page`].
///
/// # Errors
///
/// Returns [`ComposeError::InvalidGeometry`] for a zero-sized page or
/// canvas.
pub fn page_to_graph(
    point: Point,
    canvas: Dimensions,
    page: Dimensions,
) -> Result<Point, ComposeError> {
    CoordinateMapper::new(page, canvas).map(|m| m.page_to_graph(point))
}

/// A validated page/canvas pair with its letterbox precomputed.
///
/// Rebuild it whenever the canvas is resized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    page: Dimensions,
    canvas: Dimensions,
    letterbox: Letterbox,
}

impl CoordinateMapper {
    /// Fit `page` into `canvas`.
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::InvalidGeometry`] if either size has a
    /// zero side.
    pub fn new(page: Dimensions, canvas: Dimensions) -> Result<Self, ComposeError> {
        let letterbox = fit(page, canvas)?;
        Ok(Self {
            page,
            canvas,
            letterbox,
        })
    }

    /// The letterbox placement of the page.
    #[must_use]
    pub const fn letterbox(&self) -> Letterbox {
        self.letterbox
    }

    /// Page size this mapper was built for.
    #[must_use]
    pub const fn page(&self) -> Dimensions {
        self.page
    }

    /// Canvas size this mapper was built for.
    #[must_use]
    pub const fn canvas(&self) -> Dimensions {
        self.canvas
    }

    /// Page pixels per canvas pixel.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.letterbox.scale
    }

    /// Canvas pixels below the content.
    ///
    /// Both spaces count y from the bottom, so this, not
    /// [`Letterbox::top_offset`], is the y offset of the page origin. It is
    /// one more than the top offset when the vertical padding is odd.
    #[must_use]
    pub const fn bottom_offset(&self) -> u32 {
        let lb = &self.letterbox;
        self.canvas
            .height
            .saturating_sub(lb.top_offset.saturating_add(lb.height))
    }

    /// Convert a canvas point to page space.
    #[must_use]
    pub fn graph_to_page(&self, point: Point) -> Point {
        let lb = &self.letterbox;
        Point::new(
            (point.x - f64::from(lb.left_offset)) * f64::from(self.page.width)
                / f64::from(lb.width),
            (point.y - f64::from(self.bottom_offset())) * f64::from(self.page.height)
                / f64::from(lb.height),
        )
    }

    /// Convert a page point to canvas space.
    #[must_use]
    pub fn page_to_graph(&self, point: Point) -> Point {
        let lb = &self.letterbox;
        Point::new(
            point.x * f64::from(lb.width) / f64::from(self.page.width)
                + f64::from(lb.left_offset),
            point.y * f64::from(lb.height) / f64::from(self.page.height)
                + f64::from(self.bottom_offset()),
        )
    }
}

/// Scale `image` into a `target`-sized frame, padding with [`PAD_COLOR`].
///
/// The content is resampled bilinearly into the letterbox rectangle
/// computed by [`fit`]; every other pixel is the pad color.
///
/// # Errors
///
/// Returns [`ComposeError::InvalidGeometry`] if the image or the target
/// has a zero side.
pub fn resize_and_pad(
    image: &image::DynamicImage,
    target: Dimensions,
) -> Result<RgbImage, ComposeError> {
    let letterbox = fit(Dimensions::of(image), target)?;
    let mut canvas = RgbImage::from_pixel(target.width, target.height, PAD_COLOR);

    let resized = image::imageops::resize(
        &image.to_rgb8(),
        letterbox.width,
        letterbox.height,
        FilterType::Triangle,
    );
    image::imageops::replace(
        &mut canvas,
        &resized,
        i64::from(letterbox.left_offset),
        i64::from(letterbox.top_offset),
    );
    Ok(canvas)
}
