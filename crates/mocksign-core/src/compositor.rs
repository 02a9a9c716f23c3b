//! Merging placed signatures into page rasters.
//!
//! Anchors are page-space points with a bottom-left origin naming the
//! signature's top-left corner; the raster row is `page_height - y`.
//! Signatures are clipped to the page on all four sides.

use image::{DynamicImage, RgbImage};
use rand::Rng;

use crate::blend::{BlendConfig, seamless_clone};
use crate::filter::FilterPipeline;
use crate::registry::{PlacedSignature, SignatureRegistry};
use crate::types::{ComposeError, Page, Point};

/// What a render is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Interactive editing: the raw page, signatures drawn by the canvas.
    #[default]
    Edit,
    /// Preview and export: signatures merged, scanner look applied.
    Preview,
}

/// Options for merging signatures into a page.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeOptions {
    /// Seamlessly clone signatures instead of pasting them opaquely.
    pub remove_background: bool,
    /// Solver parameters used when `remove_background` is set.
    pub blend: BlendConfig,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            remove_background: crate::types::ScannerConfig::DEFAULT_REMOVE_BACKGROUND,
            blend: BlendConfig::default(),
        }
    }
}

/// The part of a signature that lands on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    /// Top-left column on the page.
    pub dest_x: u32,
    /// Top-left raster row on the page.
    pub dest_y: u32,
    /// Column inside the signature raster.
    pub src_x: u32,
    /// Row inside the signature raster.
    pub src_y: u32,
    pub width: u32,
    pub height: u32,
}

/// Clip a `width x height` signature anchored at `anchor` to a page.
///
/// Returns `None` when nothing of the signature lands on the page.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn clip_rect(anchor: Point, size: (u32, u32), page: (u32, u32)) -> Option<ClipRect> {
    let (page_w, page_h) = (i64::from(page.0), i64::from(page.1));
    if !(anchor.x.is_finite() && anchor.y.is_finite()) {
        return None;
    }
    // Rows count down from the top of the raster.
    let col = anchor.x.round().clamp(-1e15, 1e15) as i64;
    let row = (f64::from(page.1) - anchor.y).round().clamp(-1e15, 1e15) as i64;

    let x0 = col.max(0);
    let y0 = row.max(0);
    let x1 = (col + i64::from(size.0)).min(page_w);
    let y1 = (row + i64::from(size.1)).min(page_h);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let narrow = |v: i64| u32::try_from(v).ok();
    Some(ClipRect {
        dest_x: narrow(x0)?,
        dest_y: narrow(y0)?,
        src_x: narrow(x0 - col)?,
        src_y: narrow(y0 - row)?,
        width: narrow(x1 - x0)?,
        height: narrow(y1 - y0)?,
    })
}

/// Merge one placement into `page` in place.
pub fn merge(page: &mut RgbImage, placed: &PlacedSignature, options: &CompositeOptions) {
    let scaled = placed.signature.scaled();
    let Some(clip) = clip_rect(placed.anchor, scaled.dimensions(), page.dimensions()) else {
        tracing::debug!(x = placed.anchor.x, y = placed.anchor.y, "signature lies off the page, skipped");
        return;
    };
    let piece =
        image::imageops::crop_imm(&*scaled, clip.src_x, clip.src_y, clip.width, clip.height)
            .to_image();
    if options.remove_background {
        seamless_clone(page, &piece, clip.dest_x, clip.dest_y, &options.blend);
    } else {
        image::imageops::replace(page, &piece, i64::from(clip.dest_x), i64::from(clip.dest_y));
    }
}

/// Copy of `page` with every placement merged in order.
#[must_use]
pub fn composite<'a>(
    page: &RgbImage,
    placements: impl IntoIterator<Item = &'a PlacedSignature>,
    options: &CompositeOptions,
) -> RgbImage {
    let mut out = page.clone();
    for placed in placements {
        merge(&mut out, placed, options);
    }
    out
}

/// Render one page.
///
/// [`RenderMode::Edit`] returns the raw page. [`RenderMode::Preview`]
/// merges the placements and runs `pipeline` over the result.
#[must_use = "returns the rendered page"]
pub fn render<'a, R: Rng + ?Sized>(
    page: &Page,
    mode: RenderMode,
    placements: impl IntoIterator<Item = &'a PlacedSignature>,
    pipeline: &FilterPipeline,
    options: &CompositeOptions,
    rng: &mut R,
) -> DynamicImage {
    match mode {
        RenderMode::Edit => DynamicImage::ImageRgb8(page.image().clone()),
        RenderMode::Preview => {
            let merged = composite(page.image(), placements, options);
            pipeline.apply(DynamicImage::ImageRgb8(merged), rng)
        }
    }
}

/// Render page `index` of a document with its registry entries.
///
/// # Errors
///
/// [`ComposeError::EmptyDocument`] when `pages` is empty and
/// [`ComposeError::PageOutOfRange`] for a bad index.
pub fn render_page<R: Rng + ?Sized>(
    pages: &[Page],
    registry: &SignatureRegistry,
    index: usize,
    mode: RenderMode,
    pipeline: &FilterPipeline,
    options: &CompositeOptions,
    rng: &mut R,
) -> Result<DynamicImage, ComposeError> {
    if pages.is_empty() {
        return Err(ComposeError::EmptyDocument);
    }
    let page = pages.get(index).ok_or(ComposeError::PageOutOfRange {
        page: index,
        page_count: pages.len(),
    })?;
    let placements = registry.list(index)?;
    tracing::debug!(page = index, ?mode, placements = placements.len(), "rendering page");
    Ok(render(page, mode, placements, pipeline, options, rng))
}
