//! Error type for the filesystem collaborators.

use std::path::PathBuf;

use mocksign_core::ComposeError;

/// Errors raised while reading documents and signatures or writing output.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// A filesystem operation failed.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A page image could not be decoded.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        /// The offending file.
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A file in a signature folder is not a readable image. Reported by
    /// [`FolderSignatureSource::load_report`](crate::FolderSignatureSource::load_report);
    /// never fails a batch.
    #[error("skipped unreadable signature file {}: {reason}", path.display())]
    UnreadableSignature {
        /// The skipped file.
        path: PathBuf,
        /// Why it was skipped.
        reason: String,
    },

    /// Serializing the PDF container failed.
    #[error("failed to write PDF: {0}")]
    Pdf(String),

    /// Encoding a raster failed.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// The engine rejected the operation.
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl IoError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
