//! Interfaces to the outside world: documents, the interactive canvas and
//! signature folders.
//!
//! The engine never touches the filesystem or a display directly. Hosts
//! implement these traits; `mocksign-io` ships filesystem and headless
//! implementations.

use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, RgbImage};

use crate::types::{Dimensions, Point};

/// A signature bitmap as listed by a [`SignatureSource`].
#[derive(Debug, Clone)]
pub struct NamedSignature {
    /// Display name, unique within one load.
    pub name: String,
    /// Bitmap flattened onto white.
    pub image: Arc<RgbImage>,
}

impl NamedSignature {
    /// Wrap a decoded bitmap, flattening any alpha onto white.
    #[must_use]
    pub fn new(name: impl Into<String>, image: &DynamicImage) -> Self {
        Self {
            name: name.into(),
            image: Arc::new(crate::signature::flatten_on_white(image)),
        }
    }
}

/// Rasterizes documents into page images and persists composed pages.
pub trait DocumentProvider {
    type Error: std::error::Error + From<crate::ComposeError>;

    /// Rasterize the document at `path` into ordered page images.
    ///
    /// # Errors
    ///
    /// Implementation-defined; an empty document should be reported as
    /// [`ComposeError::EmptyDocument`](crate::ComposeError::EmptyDocument).
    fn open(&self, path: &Path) -> Result<Vec<RgbImage>, Self::Error>;

    /// Write `pages`, in order, as one document at `path`.
    ///
    /// # Errors
    ///
    /// Implementation-defined; an empty page list should be reported as
    /// [`ComposeError::EmptyDocument`](crate::ComposeError::EmptyDocument).
    fn save(&self, path: &Path, pages: &[DynamicImage]) -> Result<(), Self::Error>;
}

/// The interactive drawing surface.
///
/// Coordinates are canvas pixels with a bottom-left origin.
pub trait Canvas {
    /// Handle of a drawn item.
    type ItemId: Copy + Eq + std::hash::Hash + std::fmt::Debug;

    /// Current surface size.
    fn size(&self) -> Dimensions;

    /// Draw a PNG-encoded image with its top-left corner at `location`.
    /// Items drawn later sit on top.
    fn draw_image(&mut self, png: &[u8], location: Point) -> Self::ItemId;

    /// Remove an item. Unknown ids are ignored.
    fn delete(&mut self, id: Self::ItemId);

    /// Items whose bounds contain `point`, topmost first.
    fn ids_at(&self, point: Point) -> Vec<Self::ItemId>;
}

/// Lists signature bitmaps from a folder.
pub trait SignatureSource {
    type Error: std::error::Error;

    /// Every readable signature in `folder`, in a stable order.
    /// Unreadable files are skipped, not reported as errors.
    ///
    /// # Errors
    ///
    /// Only for failures that affect the whole folder, such as a missing
    /// directory.
    fn load(&self, folder: &Path) -> Result<Vec<NamedSignature>, Self::Error>;
}
