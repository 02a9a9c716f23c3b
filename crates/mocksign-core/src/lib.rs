//! mocksign-core: page compositing and coordinate-transform engine
//! (sans-IO).
//!
//! Overlays signature bitmaps onto rasterized document pages and gives
//! the result a scanned look:
//!
//! - [`geometry`] letterboxes a page into an interactive canvas and maps
//!   points between the two spaces;
//! - [`registry`] tracks which signature sits where on which page;
//! - [`compositor`] merges placements into a page, pasting them opaquely
//!   or through the Poisson [`blend`] that drops the signature's paper;
//! - [`filter`] runs the scanner look: grayscale, noise, blur, random
//!   rotation and autocontrast;
//! - [`session`] ties it all to a [`Canvas`] for interactive editing.
//!
//! This crate has **no I/O dependencies**. Reading documents and
//! signatures, drawing, and writing the output live behind the traits in
//! [`collaborators`]; `mocksign-io` implements them for the filesystem.

pub mod blend;
pub mod blur;
pub mod collaborators;
pub mod compositor;
pub mod contrast;
pub mod filter;
pub mod geometry;
pub mod grayscale;
pub mod noise;
pub mod raster;
pub mod registry;
pub mod rotate;
pub mod session;
pub mod signature;
pub mod types;

pub use blend::{BlendConfig, CloneMode};
pub use collaborators::{Canvas, DocumentProvider, NamedSignature, SignatureSource};
pub use compositor::{CompositeOptions, RenderMode};
pub use filter::{Filter, FilterKind, FilterPipeline, FilterSetting, ParseFilterKindError};
pub use geometry::{CoordinateMapper, Letterbox};
pub use registry::{PlacedSignature, SignatureRegistry};
pub use session::{ClickOutcome, Session, Tool};
pub use signature::Signature;
pub use types::{ComposeError, Dimensions, Page, PlacementId, Point, ScannerConfig};
