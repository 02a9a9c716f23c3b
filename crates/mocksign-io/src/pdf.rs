//! PDF container serializer (sans-IO).
//!
//! Each raster becomes one page holding a single full-page JPEG image
//! `XObject`. Page size in points is `pixels * 72 / dpi`, rounded.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use lopdf::{Document, Object, Stream, dictionary};

use crate::IoError;
use mocksign_core::ComposeError;

/// Default export resolution in dots per inch.
pub const DEFAULT_DPI: f64 = 100.0;

/// JPEG quality of the embedded page images.
pub const JPEG_QUALITY: u8 = 90;

/// Page extent in PDF points for `pixels` at `dpi`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn points(pixels: u32, dpi: f64) -> i64 {
    let dpi = if dpi.is_finite() && dpi > 0.0 { dpi } else { DEFAULT_DPI };
    (f64::from(pixels) * 72.0 / dpi).round().clamp(1.0, 14_400.0) as i64
}

/// JPEG bytes and PDF color space of one page.
fn encode_page(page: &DynamicImage) -> Result<(Vec<u8>, &'static str), IoError> {
    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    let color_space = match page {
        DynamicImage::ImageLuma8(gray) => {
            encoder
                .write_image(gray.as_raw(), gray.width(), gray.height(), ExtendedColorType::L8)
                .map_err(IoError::Encode)?;
            "DeviceGray"
        }
        other => {
            let rgb = other.to_rgb8();
            encoder
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .map_err(IoError::Encode)?;
            "DeviceRGB"
        }
    };
    Ok((jpeg, color_space))
}

/// Serialize `pages` into a PDF document.
///
/// # Errors
///
/// [`ComposeError::EmptyDocument`] for an empty page list,
/// [`IoError::Encode`] if a page cannot be JPEG-encoded and
/// [`IoError::Pdf`] if the container cannot be written.
pub fn to_pdf(pages: &[DynamicImage], dpi: f64) -> Result<Vec<u8>, IoError> {
    if pages.is_empty() {
        return Err(ComposeError::EmptyDocument.into());
    }

    let mut doc = Document::with_version("1.5");
    let tree_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());

    for page in pages {
        let (jpeg, color_space) = encode_page(page)?;
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(page.width()),
                "Height" => i64::from(page.height()),
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg,
        )
        .with_compression(false);
        let image_id = doc.add_object(image);

        let (width_pt, height_pt) = (points(page.width(), dpi), points(page.height(), dpi));
        let content = format!("q {width_pt} 0 0 {height_pt} 0 0 cm /Im0 Do Q");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => tree_id,
            "MediaBox" => vec![0.into(), 0.into(), width_pt.into(), height_pt.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).map_err(|e| IoError::Pdf(e.to_string()))?;
    doc.objects.insert(
        tree_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => tree_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| IoError::Pdf(e.to_string()))?;
    tracing::debug!(pages = pages.len(), bytes = bytes.len(), dpi, "pdf serialized");
    Ok(bytes)
}
