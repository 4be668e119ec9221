//! Extraction dispatch: extension registry, per-file failure isolation.
//!
//! Each supported format has an [`Extractor`] producing ordered, labeled
//! [`Fragment`]s. The registry maps lower-cased file extensions to extractors;
//! anything outside the supported set yields empty text without error, and an
//! extractor failure is reported and degraded to empty text so that one bad
//! file never aborts an indexing run.

use async_trait::async_trait;
use std::path::Path;

use crate::config::OcrConfig;
use crate::extract_docx::DocxExtractor;
use crate::extract_drawio::DrawioExtractor;
use crate::extract_png::PngExtractor;
use crate::extract_xlsx::XlsxExtractor;
use crate::models::{join_fragments, Fragment};

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb
/// protection for the OOXML extractors).
pub(crate) const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction failure local to one file. The dispatcher converts these to
/// empty text; they never escalate past the batch layer.
#[derive(Debug)]
pub enum ExtractError {
    Io(String),
    Parse(String),
    Ocr(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Io(e) => write!(f, "read failed: {}", e),
            ExtractError::Parse(e) => write!(f, "parse failed: {}", e),
            ExtractError::Ocr(e) => write!(f, "OCR failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

impl From<std::io::Error> for ExtractError {
    fn from(e: std::io::Error) -> Self {
        ExtractError::Io(e.to_string())
    }
}

/// A single-format extractor. Fragments come back in source order; blank
/// fragments are never emitted.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Lower-cased extensions (without the dot) this extractor handles.
    fn extensions(&self) -> &[&str];

    async fn extract(&self, path: &Path) -> Result<Vec<Fragment>, ExtractError>;
}

/// Extension → extractor registry. New formats are added here without
/// touching the dispatch logic.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Builds the standard registry: docx, xlsx/xls, png (OCR), drawio.
    pub fn new(ocr: OcrConfig) -> Self {
        Self {
            extractors: vec![
                Box::new(DocxExtractor),
                Box::new(XlsxExtractor),
                Box::new(PngExtractor::new(ocr)),
                Box::new(DrawioExtractor),
            ],
        }
    }

    /// All supported extensions, in registry order. This order also defines
    /// the enumeration order of the assembler (all files of the first
    /// extension before any of the second, and so on).
    pub fn extensions(&self) -> Vec<&str> {
        self.extractors
            .iter()
            .flat_map(|e| e.extensions().iter().copied())
            .collect()
    }

    fn find(&self, ext: &str) -> Option<&dyn Extractor> {
        self.extractors
            .iter()
            .find(|e| e.extensions().contains(&ext))
            .map(|e| e.as_ref())
    }

    /// Extracts position-annotated text from one file.
    ///
    /// Unsupported extensions yield an empty string. Extractor failures are
    /// reported to stderr with the file path and degrade to an empty string.
    pub async fn dispatch(&self, path: &Path) -> String {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => e.to_lowercase(),
            None => return String::new(),
        };

        let extractor = match self.find(&ext) {
            Some(e) => e,
            None => return String::new(),
        };

        match extractor.extract(path).await {
            Ok(fragments) => join_fragments(&fragments),
            Err(e) => {
                eprintln!("Error extracting {}: {}", path.display(), e);
                String::new()
            }
        }
    }
}
