//! PDF loading and per-page text extraction via `lopdf`.
//!
//! The document is parsed once at startup and shared with the playback
//! worker; extraction happens lazily, one page at a time.

use anyhow::{Context, Result};
use lopdf::Document;
use std::path::Path;
use tracing::{debug, info};

/// Source of per-page plain text. The playback controller only depends on
/// this trait, which keeps it testable without real documents.
pub trait TextSource: Send + Sync {
    /// Total number of pages in the document.
    fn page_count(&self) -> usize;

    /// Extracted text for a 1-indexed page; may be empty for pages without
    /// any text content (e.g. scanned images).
    fn page_text(&self, page: u32) -> Result<String>;
}

/// A loaded PDF document.
pub struct PdfDocument {
    doc: Document,
    page_count: usize,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path)
            .with_context(|| format!("Failed to load PDF: {}", path.display()))?;
        let page_count = doc.get_pages().len();
        info!(path = %path.display(), pages = page_count, "Loaded PDF");
        Ok(Self { doc, page_count })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn page_text(&self, page: u32) -> Result<String> {
        let text = self
            .doc
            .extract_text(&[page])
            .with_context(|| format!("Failed to extract text from page {page}"))?;
        debug!(page, chars = text.len(), "Extracted page text");
        Ok(text)
    }
}

impl TextSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_count()
    }

    fn page_text(&self, page: u32) -> Result<String> {
        self.page_text(page)
    }
}
