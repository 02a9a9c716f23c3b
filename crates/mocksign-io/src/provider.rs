//! Documents as sequences of page images.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader, RgbImage};
use mocksign_core::{ComposeError, DocumentProvider};

use crate::IoError;
use crate::pdf::{DEFAULT_DPI, to_pdf};

/// File extensions recognized as page images, lowercase.
pub const PAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "webp", "tif", "tiff"];

/// Opens pre-rasterized documents and saves composed pages as PDF.
///
/// A document is either a single image file (one page) or a directory of
/// page images ordered by file name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSequenceProvider {
    /// Resolution used to size PDF pages on save.
    pub dpi: f64,
}

impl Default for ImageSequenceProvider {
    fn default() -> Self {
        Self { dpi: DEFAULT_DPI }
    }
}

fn is_page_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Decode one image file.
pub(crate) fn decode(path: &Path) -> Result<DynamicImage, IoError> {
    let reader = ImageReader::open(path)
        .map_err(|e| IoError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| IoError::io(path, e))?;
    reader.decode().map_err(|source| IoError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Regular files of `dir` sorted by file name.
pub(crate) fn sorted_files(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| IoError::io(dir, e))? {
        let path = entry.map_err(|e| IoError::io(dir, e))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

impl DocumentProvider for ImageSequenceProvider {
    type Error = IoError;

    fn open(&self, path: &Path) -> Result<Vec<RgbImage>, IoError> {
        let files = if path.is_dir() {
            sorted_files(path)?
                .into_iter()
                .filter(|file| is_page_image(file))
                .collect()
        } else {
            vec![path.to_path_buf()]
        };
        if files.is_empty() {
            return Err(ComposeError::EmptyDocument.into());
        }

        let pages = files
            .iter()
            .map(|file| decode(file).map(|image| image.to_rgb8()))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(path = %path.display(), pages = pages.len(), "document rasterized");
        Ok(pages)
    }

    fn save(&self, path: &Path, pages: &[DynamicImage]) -> Result<(), IoError> {
        let bytes = to_pdf(pages, self.dpi)?;
        std::fs::write(path, &bytes).map_err(|e| IoError::io(path, e))?;
        tracing::info!(
            path = %path.display(),
            pages = pages.len(),
            bytes = bytes.len(),
            "document saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_extensions_are_case_insensitive() {
        assert!(is_page_image(Path::new("scan/page-01.PNG")));
        assert!(is_page_image(Path::new("page.tiff")));
        assert!(!is_page_image(Path::new("notes.txt")));
        assert!(!is_page_image(Path::new("README")));
    }
}
