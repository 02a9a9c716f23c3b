//! The controlling context of an editing session.
//!
//! A [`Session`] owns everything the interactive tool mutates: the open
//! document and its registry, the filter pipeline, the scanner options,
//! the loaded signatures, the current page, tool and zoom level, and the
//! bookkeeping that ties canvas items to placements. The canvas itself is
//! borrowed by each operation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use image::{DynamicImage, RgbImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;

use crate::collaborators::{Canvas, NamedSignature};
use crate::compositor::{self, CompositeOptions, RenderMode};
use crate::filter::{FilterKind, FilterPipeline};
use crate::geometry::{CoordinateMapper, resize_and_pad};
use crate::raster::encode_png;
use crate::registry::{PlacedSignature, SignatureRegistry};
use crate::signature::{Signature, resized};
use crate::types::{ComposeError, Dimensions, Page, PlacementId, Point, ScannerConfig};

/// Zoom factor applied per wheel notch.
pub const ZOOM_IN: f64 = 1.1;
/// Zoom factor applied per wheel notch.
pub const ZOOM_OUT: f64 = 0.9;

/// The active tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Follow the pointer with the selected signature; click to anchor it.
    #[default]
    Place,
    /// Click a placed signature to delete it.
    Remove,
    /// Show the composited page with the scanner look.
    Preview,
}

impl Tool {
    /// Render mode used for the canvas view under this tool.
    #[must_use]
    pub const fn render_mode(self) -> RenderMode {
        match self {
            Self::Place | Self::Remove => RenderMode::Edit,
            Self::Preview => RenderMode::Preview,
        }
    }
}

/// What a click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Placed(PlacementId),
    Removed(PlacementId),
    Nothing,
}

/// An editing session against a canvas of type `C`.
pub struct Session<C: Canvas, R = StdRng> {
    pages: Vec<Page>,
    registry: SignatureRegistry,
    pipeline: FilterPipeline,
    options: CompositeOptions,
    signatures: Vec<NamedSignature>,
    selected: Option<usize>,
    current_page: usize,
    tool: Tool,
    zoom: f64,
    mapper: Option<CoordinateMapper>,
    page_item: Option<C::ItemId>,
    floating_item: Option<C::ItemId>,
    markers: HashMap<C::ItemId, PlacementId>,
    rng: R,
}

impl<C: Canvas> Session<C, StdRng> {
    /// A session whose random filters replay exactly for `seed`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// A session seeded from the operating system.
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<C: Canvas, R: Rng> Session<C, R> {
    /// An empty session drawing randomness from `rng`.
    pub fn new(rng: R) -> Self {
        Self {
            pages: Vec::new(),
            registry: SignatureRegistry::default(),
            pipeline: FilterPipeline::default(),
            options: CompositeOptions::default(),
            signatures: Vec::new(),
            selected: None,
            current_page: 0,
            tool: Tool::default(),
            zoom: 1.0,
            mapper: None,
            page_item: None,
            floating_item: None,
            markers: HashMap::new(),
            rng,
        }
    }

    // -- state -------------------------------------------------------------

    #[must_use]
    pub const fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub const fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub const fn tool(&self) -> Tool {
        self.tool
    }

    #[must_use]
    pub const fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub const fn registry(&self) -> &SignatureRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn pipeline(&self) -> &FilterPipeline {
        &self.pipeline
    }

    #[must_use]
    pub const fn remove_background(&self) -> bool {
        self.options.remove_background
    }

    /// The current page/canvas fit, once a document is shown.
    #[must_use]
    pub const fn mapper(&self) -> Option<&CoordinateMapper> {
        self.mapper.as_ref()
    }

    /// Current options as a serializable config.
    #[must_use]
    pub fn config(&self) -> ScannerConfig {
        ScannerConfig {
            remove_background: self.options.remove_background,
            filters: self.pipeline.settings(),
            blend: self.options.blend.clone(),
        }
    }

    /// Adopt `config`. Takes effect on the next [`refresh`](Self::refresh).
    ///
    /// # Errors
    ///
    /// Propagates [`FilterPipeline::apply_settings`] failures; nothing
    /// changes on error.
    pub fn apply_config(&mut self, config: &ScannerConfig) -> Result<(), ComposeError> {
        self.pipeline.apply_settings(&config.filters)?;
        self.options.remove_background = config.remove_background;
        self.options.blend = config.blend.clone();
        Ok(())
    }

    // -- document ----------------------------------------------------------

    /// Open a rasterized document and show its first page.
    ///
    /// # Errors
    ///
    /// [`ComposeError::EmptyDocument`] for an empty page list, plus any
    /// [`refresh`](Self::refresh) failure.
    pub fn open(&mut self, pages: Vec<RgbImage>, canvas: &mut C) -> Result<(), ComposeError> {
        if pages.is_empty() {
            return Err(ComposeError::EmptyDocument);
        }
        self.clear_canvas(canvas);
        self.registry = SignatureRegistry::new(pages.len());
        self.pages = pages
            .into_iter()
            .enumerate()
            .map(|(index, image)| Page::new(index, image))
            .collect();
        self.current_page = 0;
        tracing::info!(pages = self.pages.len(), "document opened");
        self.refresh(canvas)
    }

    /// Anchor the named signature on `page` without going through the
    /// canvas. It appears on the next [`refresh`](Self::refresh).
    ///
    /// # Errors
    ///
    /// [`ComposeError::NoDocument`] when nothing is open,
    /// [`ComposeError::UnknownSignature`], [`ComposeError::InvalidScale`]
    /// and [`ComposeError::PageOutOfRange`].
    pub fn place_signature(
        &mut self,
        page: usize,
        anchor: Point,
        name: &str,
        scale: f64,
    ) -> Result<PlacementId, ComposeError> {
        if self.pages.is_empty() {
            return Err(ComposeError::NoDocument);
        }
        let source = self.find_signature(name)?.image.clone();
        let signature = Signature::new(source, scale)?;
        self.registry
            .insert(page, PlacedSignature::new(signature, anchor))
    }

    /// Page `index` under the current tool's render mode.
    ///
    /// # Errors
    ///
    /// [`ComposeError::EmptyDocument`] or [`ComposeError::PageOutOfRange`].
    pub fn render_page(&mut self, index: usize) -> Result<DynamicImage, ComposeError> {
        let mode = self.tool.render_mode();
        self.render_page_as(index, mode)
    }

    fn render_page_as(&mut self, index: usize, mode: RenderMode) -> Result<DynamicImage, ComposeError> {
        compositor::render_page(
            &self.pages,
            &self.registry,
            index,
            mode,
            &self.pipeline,
            &self.options,
            &mut self.rng,
        )
    }

    /// Every page composited and filtered, ready to save.
    ///
    /// # Errors
    ///
    /// [`ComposeError::EmptyDocument`] when no document is open.
    pub fn export(&mut self) -> Result<Vec<DynamicImage>, ComposeError> {
        if self.pages.is_empty() {
            return Err(ComposeError::EmptyDocument);
        }
        let rendered = (0..self.pages.len())
            .map(|index| self.render_page_as(index, RenderMode::Preview))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(
            pages = rendered.len(),
            signatures = self.registry.len(),
            "document exported"
        );
        Ok(rendered)
    }

    // -- signatures --------------------------------------------------------

    /// Replace the loaded signatures and select the first one.
    pub fn set_signatures(&mut self, signatures: Vec<NamedSignature>) {
        tracing::info!(count = signatures.len(), "signatures loaded");
        self.selected = if signatures.is_empty() { None } else { Some(0) };
        self.signatures = signatures;
    }

    #[must_use]
    pub fn signature_names(&self) -> Vec<&str> {
        self.signatures.iter().map(|s| s.name.as_str()).collect()
    }

    #[must_use]
    pub fn selected_signature(&self) -> Option<&NamedSignature> {
        self.selected.and_then(|i| self.signatures.get(i))
    }

    fn find_signature(&self, name: &str) -> Result<&NamedSignature, ComposeError> {
        self.signatures
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ComposeError::UnknownSignature(name.to_owned()))
    }

    /// # Errors
    ///
    /// [`ComposeError::UnknownSignature`] if no loaded signature is called
    /// `name`.
    pub fn select_signature(&mut self, name: &str) -> Result<(), ComposeError> {
        let index = self
            .signatures
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| ComposeError::UnknownSignature(name.to_owned()))?;
        self.selected = Some(index);
        Ok(())
    }

    /// The selected signature letterboxed into a `size` thumbnail.
    ///
    /// # Errors
    ///
    /// [`ComposeError::InvalidGeometry`] for a zero-sized thumbnail.
    pub fn signature_preview(&self, size: Dimensions) -> Result<Option<RgbImage>, ComposeError> {
        self.selected_signature()
            .map(|s| resize_and_pad(&DynamicImage::ImageRgb8((*s.image).clone()), size))
            .transpose()
    }

    // -- view --------------------------------------------------------------

    /// Switch tools and refresh the view.
    ///
    /// # Errors
    ///
    /// Any [`refresh`](Self::refresh) failure.
    pub fn set_tool(&mut self, tool: Tool, canvas: &mut C) -> Result<(), ComposeError> {
        self.tool = tool;
        self.refresh(canvas)
    }

    /// Enable or disable one filter and refresh.
    ///
    /// # Errors
    ///
    /// Any [`refresh`](Self::refresh) failure.
    pub fn set_filter_enabled(
        &mut self,
        kind: FilterKind,
        enabled: bool,
        canvas: &mut C,
    ) -> Result<(), ComposeError> {
        if let Some(filter) = self.pipeline.filter_mut(kind) {
            filter.set_enabled(enabled);
        }
        self.refresh(canvas)
    }

    /// Set one filter's strength and refresh.
    ///
    /// # Errors
    ///
    /// [`Filter::set_strength`](crate::filter::Filter::set_strength)
    /// failures, then any [`refresh`](Self::refresh) failure.
    pub fn set_filter_strength(
        &mut self,
        kind: FilterKind,
        value: f32,
        canvas: &mut C,
    ) -> Result<(), ComposeError> {
        if let Some(filter) = self.pipeline.filter_mut(kind) {
            filter.set_strength(value)?;
        }
        self.refresh(canvas)
    }

    /// # Errors
    ///
    /// Any [`refresh`](Self::refresh) failure.
    pub fn set_remove_background(&mut self, remove: bool, canvas: &mut C) -> Result<(), ComposeError> {
        self.options.remove_background = remove;
        self.refresh(canvas)
    }

    /// Re-fit the page to the canvas after a resize.
    ///
    /// # Errors
    ///
    /// Any [`refresh`](Self::refresh) failure.
    pub fn resize(&mut self, canvas: &mut C) -> Result<(), ComposeError> {
        self.refresh(canvas)
    }

    /// Move by `delta` pages. Moves that would leave the document are
    /// ignored and return `false`.
    ///
    /// # Errors
    ///
    /// Any [`refresh`](Self::refresh) failure.
    pub fn navigate(&mut self, delta: isize, canvas: &mut C) -> Result<bool, ComposeError> {
        let Some(target) = self.current_page.checked_add_signed(delta) else {
            return Ok(false);
        };
        if target >= self.pages.len() {
            return Ok(false);
        }
        self.remove_markers(self.current_page, canvas)?;
        self.current_page = target;
        tracing::debug!(page = target, "navigated");
        self.refresh(canvas)?;
        Ok(true)
    }

    /// Redraw the current page.
    ///
    /// Re-fits the page to the canvas and draws it letterboxed. In edit
    /// mode the page's signatures are then redrawn and re-registered under
    /// fresh ids; in preview mode they are merged into the page instead.
    ///
    /// # Errors
    ///
    /// [`ComposeError::InvalidGeometry`] for a zero-sized canvas and
    /// [`ComposeError::Encode`] if a raster cannot be encoded.
    pub fn refresh(&mut self, canvas: &mut C) -> Result<(), ComposeError> {
        if self.pages.is_empty() {
            return Ok(());
        }
        let canvas_size = canvas.size();
        let mapper = CoordinateMapper::new(self.pages[self.current_page].dimensions(), canvas_size)?;
        self.mapper = Some(mapper);

        let rendered = self.render_page(self.current_page)?;
        let view = resize_and_pad(&rendered, canvas_size)?;
        let png = encode_png(&DynamicImage::ImageRgb8(view))?;

        if let Some(item) = self.floating_item.take() {
            canvas.delete(item);
        }
        if let Some(item) = self.page_item.take() {
            canvas.delete(item);
        }
        self.page_item = Some(canvas.draw_image(&png, Point::new(0.0, f64::from(canvas_size.height))));

        match self.tool.render_mode() {
            RenderMode::Edit => self.redraw_markers(canvas),
            RenderMode::Preview => self.remove_markers(self.current_page, canvas),
        }
    }

    /// Canvas-side scale of a raster drawn at `scale` page pixels per
    /// source pixel.
    fn display_factor(&self, scale: f64) -> f64 {
        scale / self.mapper.map_or(1.0, |m| m.scale())
    }

    /// Delete the current page's markers, then re-register and redraw
    /// each placement under a fresh id.
    fn redraw_markers(&mut self, canvas: &mut C) -> Result<(), ComposeError> {
        let page = self.current_page;
        let images = self
            .registry
            .list(page)?
            .iter()
            .map(|placed| {
                let factor = self.display_factor(placed.signature.scale());
                let shown = resized(placed.signature.source(), factor);
                encode_png(&DynamicImage::ImageRgb8(shown)).map_err(ComposeError::from)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.remove_markers(page, canvas)?;
        let entries = self.registry.clear(page)?;
        for (placed, png) in entries.into_iter().zip(images) {
            let location = self
                .mapper
                .map_or(placed.anchor, |m| m.page_to_graph(placed.anchor));
            let item = canvas.draw_image(&png, location);
            let id = self.registry.insert(page, placed)?;
            self.markers.insert(item, id);
        }
        Ok(())
    }

    /// Delete the canvas items of `page`'s placements.
    fn remove_markers(&mut self, page: usize, canvas: &mut C) -> Result<(), ComposeError> {
        let on_page: HashSet<PlacementId> = self.registry.ids(page)?.into_iter().collect();
        self.markers.retain(|item, id| {
            let keep = !on_page.contains(id);
            if !keep {
                canvas.delete(*item);
            }
            keep
        });
        Ok(())
    }

    fn clear_canvas(&mut self, canvas: &mut C) {
        let items = self
            .page_item
            .take()
            .into_iter()
            .chain(self.floating_item.take())
            .chain(self.markers.drain().map(|(item, _)| item));
        for item in items {
            canvas.delete(item);
        }
    }

    // -- pointer -----------------------------------------------------------

    /// Draw the selected signature at `point` in place of any previous
    /// floating preview.
    fn draw_floating(&mut self, point: Point, canvas: &mut C) -> Result<(), ComposeError> {
        let Some(selected) = self.selected_signature() else {
            return Ok(());
        };
        let shown = resized(&selected.image, self.display_factor(self.zoom));
        let png = encode_png(&DynamicImage::ImageRgb8(shown))?;
        let item = canvas.draw_image(&png, point);
        if let Some(old) = self.floating_item.replace(item) {
            canvas.delete(old);
        }
        Ok(())
    }

    /// Follow the pointer with the floating preview while placing.
    ///
    /// # Errors
    ///
    /// [`ComposeError::Encode`] if the preview cannot be encoded.
    pub fn pointer_moved(&mut self, point: Point, canvas: &mut C) -> Result<(), ComposeError> {
        if self.tool != Tool::Place {
            return Ok(());
        }
        self.draw_floating(point, canvas)
    }

    /// Drop the floating preview when the pointer leaves the canvas.
    pub fn pointer_left(&mut self, canvas: &mut C) {
        if let Some(item) = self.floating_item.take() {
            canvas.delete(item);
        }
    }

    /// Zoom the floating preview in (`up`) or out, then redraw it at
    /// `point`.
    ///
    /// # Errors
    ///
    /// [`ComposeError::Encode`] if the preview cannot be encoded.
    pub fn wheel(&mut self, up: bool, point: Point, canvas: &mut C) -> Result<(), ComposeError> {
        if self.tool != Tool::Place || self.selected.is_none() {
            return Ok(());
        }
        self.zoom *= if up { ZOOM_IN } else { ZOOM_OUT };
        tracing::debug!(zoom = self.zoom, "signature zoom changed");
        self.draw_floating(point, canvas)
    }

    /// Place or remove a signature at `point`, depending on the tool.
    ///
    /// # Errors
    ///
    /// [`ComposeError::NoDocument`] when placing without an open document.
    pub fn click(&mut self, point: Point, canvas: &mut C) -> Result<ClickOutcome, ComposeError> {
        match self.tool {
            Tool::Place => self.click_place(point),
            Tool::Remove => self.click_remove(point, canvas),
            Tool::Preview => Ok(ClickOutcome::Nothing),
        }
    }

    fn click_place(&mut self, point: Point) -> Result<ClickOutcome, ComposeError> {
        if self.pages.is_empty() {
            return Err(ComposeError::NoDocument);
        }
        let (Some(item), Some(selected), Some(mapper)) =
            (self.floating_item, self.selected_signature(), self.mapper)
        else {
            return Ok(ClickOutcome::Nothing);
        };
        let anchor = mapper.graph_to_page(point);
        let signature = Signature::new(Arc::clone(&selected.image), self.zoom)?;
        let id = self
            .registry
            .insert(self.current_page, PlacedSignature::new(signature, anchor))?;
        self.markers.insert(item, id);
        self.floating_item = None;
        tracing::debug!(%id, page = self.current_page, x = anchor.x, y = anchor.y, "signature placed");
        Ok(ClickOutcome::Placed(id))
    }

    fn click_remove(&mut self, point: Point, canvas: &mut C) -> Result<ClickOutcome, ComposeError> {
        for item in canvas.ids_at(point) {
            let Some(id) = self.markers.remove(&item) else {
                continue;
            };
            canvas.delete(item);
            self.registry.delete(id)?;
            tracing::debug!(%id, "signature removed");
            return Ok(ClickOutcome::Removed(id));
        }
        Ok(ClickOutcome::Nothing)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    /// In-memory canvas recording item rectangles.
    struct FakeCanvas {
        size: Dimensions,
        items: Vec<(u32, Point, Dimensions)>,
        next: u32,
    }

    impl FakeCanvas {
        fn new(w: u32, h: u32) -> Self {
            Self {
                size: Dimensions::new(w, h),
                items: Vec::new(),
                next: 0,
            }
        }

        fn item(&self, id: u32) -> Option<(Point, Dimensions)> {
            self.items
                .iter()
                .find(|(i, _, _)| *i == id)
                .map(|(_, p, d)| (*p, *d))
        }
    }

    impl Canvas for FakeCanvas {
        type ItemId = u32;

        fn size(&self) -> Dimensions {
            self.size
        }

        fn draw_image(&mut self, png: &[u8], location: Point) -> u32 {
            let decoded = image::load_from_memory(png).unwrap();
            let id = self.next;
            self.next += 1;
            self.items.push((id, location, Dimensions::of(&decoded)));
            id
        }

        fn delete(&mut self, id: u32) {
            self.items.retain(|(i, _, _)| *i != id);
        }

        fn ids_at(&self, point: Point) -> Vec<u32> {
            self.items
                .iter()
                .rev()
                .filter(|(_, loc, size)| {
                    point.x >= loc.x
                        && point.x < loc.x + f64::from(size.width)
                        && point.y <= loc.y
                        && point.y > loc.y - f64::from(size.height)
                })
                .map(|(id, _, _)| *id)
                .collect()
        }
    }

    // 200x100 page on a 400x400 canvas: 400x200 content at top offset
    // 100, half a page pixel per canvas pixel.
    fn page() -> RgbImage {
        #[allow(clippy::cast_possible_truncation)]
        RgbImage::from_fn(200, 100, |x, y| image::Rgb([x as u8, y as u8, 180]))
    }

    fn signature(name: &str) -> NamedSignature {
        let img = RgbImage::from_fn(20, 10, |x, _| {
            if x % 2 == 0 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        NamedSignature::new(name, &DynamicImage::ImageRgb8(img))
    }

    fn session_with_document(pages: usize) -> (Session<FakeCanvas>, FakeCanvas) {
        let mut canvas = FakeCanvas::new(400, 400);
        let mut session = Session::with_seed(7);
        session.set_signatures(vec![signature("alice.png"), signature("bob.png")]);
        session.open(vec![page(); pages], &mut canvas).unwrap();
        (session, canvas)
    }

    fn place_at(session: &mut Session<FakeCanvas>, canvas: &mut FakeCanvas, point: Point) -> PlacementId {
        session.pointer_moved(point, canvas).unwrap();
        match session.click(point, canvas).unwrap() {
            ClickOutcome::Placed(id) => id,
            other => panic!("expected a placement, got {other:?}"),
        }
    }

    #[test]
    fn open_rejects_empty_document() {
        let mut canvas = FakeCanvas::new(400, 400);
        let mut session: Session<FakeCanvas> = Session::with_seed(0);
        assert!(matches!(
            session.open(Vec::new(), &mut canvas),
            Err(ComposeError::EmptyDocument)
        ));
    }

    #[test]
    fn open_draws_letterboxed_page() {
        let (session, canvas) = session_with_document(1);
        assert_eq!(canvas.items.len(), 1);
        let (location, size) = canvas.item(canvas.items[0].0).unwrap();
        assert_eq!(size, Dimensions::new(400, 400));
        assert_eq!(location, Point::new(0.0, 400.0));
        assert!((session.mapper().unwrap().scale() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn floating_preview_follows_pointer() {
        let (mut session, mut canvas) = session_with_document(1);
        session.pointer_moved(Point::new(10.0, 300.0), &mut canvas).unwrap();
        session.pointer_moved(Point::new(50.0, 320.0), &mut canvas).unwrap();
        assert_eq!(canvas.items.len(), 2, "only one floating item at a time");
        let (location, size) = canvas.item(canvas.items[1].0).unwrap();
        assert_eq!(location, Point::new(50.0, 320.0));
        // 20x10 source at zoom 1 over a 0.5 fit scale.
        assert_eq!(size, Dimensions::new(40, 20));

        session.pointer_left(&mut canvas);
        assert_eq!(canvas.items.len(), 1);
    }

    #[test]
    fn click_anchors_signature_in_page_space() {
        let (mut session, mut canvas) = session_with_document(1);
        let id = place_at(&mut session, &mut canvas, Point::new(100.0, 250.0));
        let placed = session.registry().get(id).unwrap();
        assert_eq!(placed.anchor, Point::new(50.0, 75.0));
        assert!((placed.signature.scale() - 1.0).abs() < f64::EPSILON);
        assert_eq!(canvas.items.len(), 2);

        // The floating item became the marker; another click does nothing.
        assert_eq!(
            session.click(Point::new(100.0, 250.0), &mut canvas).unwrap(),
            ClickOutcome::Nothing
        );
    }

    #[test]
    fn placing_without_document_fails() {
        let mut canvas = FakeCanvas::new(400, 400);
        let mut session: Session<FakeCanvas> = Session::with_seed(0);
        session.set_signatures(vec![signature("a")]);
        session.pointer_moved(Point::new(5.0, 5.0), &mut canvas).unwrap();
        assert!(matches!(
            session.click(Point::new(5.0, 5.0), &mut canvas),
            Err(ComposeError::NoDocument)
        ));
    }

    #[test]
    fn wheel_scales_zoom_and_preview() {
        let (mut session, mut canvas) = session_with_document(1);
        let at = Point::new(100.0, 250.0);
        session.pointer_moved(at, &mut canvas).unwrap();
        session.wheel(true, at, &mut canvas).unwrap();
        assert!((session.zoom() - 1.1).abs() < 1e-12);
        let (_, size) = canvas.item(canvas.items[1].0).unwrap();
        assert_eq!(size, Dimensions::new(44, 22));

        session.wheel(false, at, &mut canvas).unwrap();
        assert!((session.zoom() - 0.99).abs() < 1e-12);
        assert_eq!(canvas.items.len(), 2);

        let id = place_at(&mut session, &mut canvas, at);
        assert!((session.registry().get(id).unwrap().signature.scale() - 0.99).abs() < 1e-12);
    }

    #[test]
    fn remove_deletes_topmost_signature_only() {
        let (mut session, mut canvas) = session_with_document(1);
        place_at(&mut session, &mut canvas, Point::new(100.0, 250.0));
        place_at(&mut session, &mut canvas, Point::new(110.0, 245.0));
        session.set_tool(Tool::Remove, &mut canvas).unwrap();
        assert_eq!(canvas.items.len(), 3);

        let hit = Point::new(115.0, 240.0);
        let removed = session.click(hit, &mut canvas).unwrap();
        let ClickOutcome::Removed(_) = removed else {
            panic!("expected a removal, got {removed:?}");
        };
        assert_eq!(session.registry().len(), 1);
        assert_eq!(canvas.items.len(), 2);
        let left = session.registry().list(0).unwrap();
        assert_eq!(left[0].anchor, Point::new(50.0, 75.0), "the lower signature survives");
    }

    #[test]
    fn remove_skips_the_page_item() {
        let (mut session, mut canvas) = session_with_document(1);
        session.set_tool(Tool::Remove, &mut canvas).unwrap();
        assert_eq!(
            session.click(Point::new(200.0, 200.0), &mut canvas).unwrap(),
            ClickOutcome::Nothing
        );
        assert_eq!(canvas.items.len(), 1);
    }

    #[test]
    fn redraw_reregisters_under_fresh_ids() {
        let (mut session, mut canvas) = session_with_document(1);
        let first = place_at(&mut session, &mut canvas, Point::new(100.0, 250.0));
        session.resize(&mut canvas).unwrap();
        let ids = session.registry().ids(0).unwrap();
        assert_eq!(ids.len(), 1);
        assert_ne!(ids[0], first);

        // The redrawn marker sits where the floating preview was.
        let (location, size) = canvas.item(canvas.items[1].0).unwrap();
        assert_eq!(location, Point::new(100.0, 250.0));
        assert_eq!(size, Dimensions::new(40, 20));
    }

    #[test]
    fn navigation_is_bounded_and_swaps_markers() {
        let (mut session, mut canvas) = session_with_document(2);
        assert!(!session.navigate(-1, &mut canvas).unwrap());
        place_at(&mut session, &mut canvas, Point::new(100.0, 250.0));

        assert!(session.navigate(1, &mut canvas).unwrap());
        assert_eq!(session.current_page(), 1);
        assert_eq!(canvas.items.len(), 1, "page 0 markers are hidden");
        assert!(!session.navigate(1, &mut canvas).unwrap());

        assert!(session.navigate(-1, &mut canvas).unwrap());
        assert_eq!(canvas.items.len(), 2, "page 0 markers are back");
        assert_eq!(session.registry().len(), 1);
    }

    #[test]
    fn preview_tool_shows_filtered_page() {
        let (mut session, mut canvas) = session_with_document(1);
        place_at(&mut session, &mut canvas, Point::new(100.0, 250.0));
        session.set_tool(Tool::Preview, &mut canvas).unwrap();
        assert_eq!(canvas.items.len(), 1, "markers are merged into the page");
        let rendered = session.render_page(0).unwrap();
        assert_eq!(rendered.color().channel_count(), 1);
        assert_eq!(session.registry().len(), 1);
    }

    #[test]
    fn filter_setters_validate_and_refresh() {
        let (mut session, mut canvas) = session_with_document(1);
        assert!(matches!(
            session.set_filter_strength(FilterKind::Blur, 8.0, &mut canvas),
            Err(ComposeError::StrengthOutOfRange { .. })
        ));
        session
            .set_filter_strength(FilterKind::Blur, 2.5, &mut canvas)
            .unwrap();
        session
            .set_filter_enabled(FilterKind::Grayscale, false, &mut canvas)
            .unwrap();
        session.set_remove_background(false, &mut canvas).unwrap();

        let config = session.config();
        assert!(!config.remove_background);
        let blur = config.filters.iter().find(|f| f.kind == FilterKind::Blur).unwrap();
        assert_eq!(blur.strength, Some(2.5));
        assert_eq!(canvas.items.len(), 1);
    }

    #[test]
    fn export_requires_document_and_replays_with_seed() {
        let mut empty: Session<FakeCanvas> = Session::with_seed(0);
        assert!(matches!(empty.export(), Err(ComposeError::EmptyDocument)));

        let run = || {
            let (mut session, mut canvas) = session_with_document(2);
            session
                .set_filter_enabled(FilterKind::Noise, true, &mut canvas)
                .unwrap();
            session
                .place_signature(1, Point::new(30.0, 60.0), "bob.png", 2.0)
                .unwrap();
            session.export().unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.len(), 2);
        assert_eq!(a, b);
    }

    #[test]
    fn signature_selection() {
        let (mut session, _canvas) = session_with_document(1);
        assert_eq!(session.signature_names(), vec!["alice.png", "bob.png"]);
        assert_eq!(session.selected_signature().unwrap().name, "alice.png");
        session.select_signature("bob.png").unwrap();
        assert_eq!(session.selected_signature().unwrap().name, "bob.png");
        assert!(matches!(
            session.select_signature("carol.png"),
            Err(ComposeError::UnknownSignature(_))
        ));

        let thumb = session.signature_preview(Dimensions::new(64, 64)).unwrap().unwrap();
        assert_eq!(thumb.dimensions(), (64, 64));
        assert_eq!(thumb.get_pixel(0, 0), &crate::geometry::PAD_COLOR);
    }

    #[test]
    fn apply_config_is_atomic() {
        let (mut session, _canvas) = session_with_document(1);
        let mut config = ScannerConfig {
            remove_background: false,
            ..ScannerConfig::default()
        };
        config.filters[2].strength = Some(50.0);
        assert!(session.apply_config(&config).is_err());
        assert!(session.remove_background());

        config.filters[2].strength = Some(3.0);
        session.apply_config(&config).unwrap();
        assert!(!session.remove_background());
        assert_eq!(
            session.pipeline().filter(FilterKind::Blur).unwrap().strength(),
            Some(3.0)
        );
    }
}
