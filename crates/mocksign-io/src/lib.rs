//! mocksign-io: filesystem and headless collaborators.
//!
//! Implements the `mocksign-core` collaborator traits:
//!
//! - [`ImageSequenceProvider`] opens pre-rasterized documents (one image
//!   or a directory of page images) and saves composed pages as PDF;
//! - [`FolderSignatureSource`] lists signature bitmaps in a folder;
//! - [`HeadlessCanvas`] is an in-memory canvas for driving a session
//!   without a display.
//!
//! The PDF serializer itself is sans-IO ([`pdf::to_pdf`]).

pub mod canvas;
pub mod error;
pub mod pdf;
pub mod provider;
pub mod raster;
pub mod signatures;

pub use canvas::{CanvasItem, HeadlessCanvas, ItemId};
pub use error::IoError;
pub use provider::ImageSequenceProvider;
pub use raster::{encode_png, save_png};
pub use signatures::{FolderSignatureSource, SignatureReport};
