//! Signature bitmaps from a folder.

use std::path::Path;

use mocksign_core::{NamedSignature, SignatureSource};

use crate::IoError;
use crate::provider::{decode, sorted_files};

/// Outcome of loading a signature folder.
#[derive(Debug, Default)]
pub struct SignatureReport {
    /// Decoded signatures in file-name order.
    pub signatures: Vec<NamedSignature>,
    /// Files that could not be decoded, as
    /// [`IoError::UnreadableSignature`].
    pub skipped: Vec<IoError>,
}

/// Loads every decodable image in a folder, named after its file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FolderSignatureSource;

impl FolderSignatureSource {
    /// Load `folder`, keeping track of the files that were skipped.
    ///
    /// # Errors
    ///
    /// [`IoError::Io`] if the folder cannot be listed.
    pub fn load_report(&self, folder: &Path) -> Result<SignatureReport, IoError> {
        let mut report = SignatureReport::default();
        for path in sorted_files(folder)? {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match decode(&path) {
                Ok(image) => report.signatures.push(NamedSignature::new(name, &image)),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "could not open signature file");
                    report.skipped.push(IoError::UnreadableSignature {
                        path,
                        reason: err.to_string(),
                    });
                }
            }
        }
        tracing::info!(
            folder = %folder.display(),
            loaded = report.signatures.len(),
            skipped = report.skipped.len(),
            "signature folder loaded"
        );
        Ok(report)
    }
}

impl SignatureSource for FolderSignatureSource {
    type Error = IoError;

    fn load(&self, folder: &Path) -> Result<Vec<NamedSignature>, IoError> {
        self.load_report(folder).map(|report| report.signatures)
    }
}
