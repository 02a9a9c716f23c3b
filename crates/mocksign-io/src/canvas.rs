//! An in-memory canvas for headless sessions.
//!
//! Keeps every drawn item with its decoded pixels so a session can be
//! driven without a display and its view inspected or saved.

use std::fmt;

use image::RgbaImage;
use mocksign_core::{Canvas, Dimensions, Point};

/// Handle of an item on a [`HeadlessCanvas`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item {}", self.0)
    }
}

/// One drawn image.
#[derive(Debug, Clone)]
pub struct CanvasItem {
    pub id: ItemId,
    /// Top-left corner, bottom-left origin.
    pub location: Point,
    pub image: RgbaImage,
}

impl CanvasItem {
    /// Whether `point` falls inside the item's bounds.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        let (w, h) = self.image.dimensions();
        point.x >= self.location.x
            && point.x < self.location.x + f64::from(w)
            && point.y <= self.location.y
            && point.y > self.location.y - f64::from(h)
    }
}

/// A [`Canvas`] that draws into memory.
#[derive(Debug, Clone)]
pub struct HeadlessCanvas {
    size: Dimensions,
    items: Vec<CanvasItem>,
    next_id: u64,
}

impl HeadlessCanvas {
    #[must_use]
    pub const fn new(size: Dimensions) -> Self {
        Self {
            size,
            items: Vec::new(),
            next_id: 0,
        }
    }

    /// Change the surface size. Items keep their coordinates.
    pub const fn set_size(&mut self, size: Dimensions) {
        self.size = size;
    }

    /// Items bottom to top.
    #[must_use]
    pub fn items(&self) -> &[CanvasItem] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&CanvasItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Flatten every item, bottom to top, onto a white surface.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn snapshot(&self) -> RgbaImage {
        let mut out = RgbaImage::from_pixel(
            self.size.width,
            self.size.height,
            image::Rgba([255, 255, 255, 255]),
        );
        for item in &self.items {
            let x = item.location.x.round() as i64;
            let row = (f64::from(self.size.height) - item.location.y).round() as i64;
            image::imageops::overlay(&mut out, &item.image, x, row);
        }
        out
    }
}

impl Canvas for HeadlessCanvas {
    type ItemId = ItemId;

    fn size(&self) -> Dimensions {
        self.size
    }

    fn draw_image(&mut self, png: &[u8], location: Point) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        let image = match image::load_from_memory(png) {
            Ok(decoded) => decoded.to_rgba8(),
            Err(err) => {
                tracing::warn!(%id, error = %err, "undecodable canvas image, drawing nothing");
                RgbaImage::new(0, 0)
            }
        };
        self.items.push(CanvasItem {
            id,
            location,
            image,
        });
        id
    }

    fn delete(&mut self, id: ItemId) {
        self.items.retain(|item| item.id != id);
    }

    fn ids_at(&self, point: Point) -> Vec<ItemId> {
        self.items
            .iter()
            .rev()
            .filter(|item| item.contains(point))
            .map(|item| item.id)
            .collect()
    }
}
