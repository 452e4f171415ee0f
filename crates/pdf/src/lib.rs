use std::collections::BTreeMap;

use thiserror::Error;

use parser::backend::{LopdfBackend, PageId, PdfBackend};

#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
pub mod page;
pub mod parser;
pub mod types;

pub use page::Page;
pub use types::*;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Page not found: {0}")]
    PageNotFound(usize),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// A loaded PDF document.
///
/// Constructed via [`Document::from_bytes`]. Pages are rendered lazily: each
/// call to [`Document::page`] interprets that page's content stream and
/// returns its glyphs in top-left page coordinates.
pub struct Document {
    backend: LopdfBackend,
    pages: BTreeMap<u32, PageId>,
}

impl Document {
    /// Parse PDF bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let backend = LopdfBackend::load_bytes(bytes)?;
        let pages = backend.pages();
        Ok(Document { backend, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Render the page at a 0-based `index`.
    pub fn page(&self, index: usize) -> Result<Page, PdfError> {
        let page_id = *self
            .pages
            .values()
            .nth(index)
            .ok_or(PdfError::PageNotFound(index))?;

        let page_box = self.backend.page_box(page_id)?;
        let glyphs = parser::glyphs::extract_page_glyphs(&self.backend, page_id)?;

        Ok(Page::new(
            index + 1,
            page_box.width(),
            page_box.height(),
            glyphs,
        ))
    }
}

/// Get document metadata without rendering any page.
pub fn info(bytes: &[u8]) -> Result<DocumentMetadata, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    Ok(extract_metadata(&backend))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn extract_metadata(backend: &LopdfBackend) -> DocumentMetadata {
    let raw = backend.metadata();
    DocumentMetadata {
        title: raw.get("Title").cloned(),
        author: raw.get("Author").cloned(),
        page_count: backend.page_count(),
        creator: raw.get("Creator").cloned(),
        producer: raw.get("Producer").cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::FixtureBuilder;

    #[test]
    fn test_info_rejects_empty_bytes() {
        let result = info(&[]);
        assert!(matches!(result, Err(PdfError::Parse(_))));
    }

    #[test]
    fn test_document_renders_fixture_text() {
        let bytes = FixtureBuilder::new(595.0, 842.0)
            .text(40.0, 100.0, 10.0, "Alpha Project")
            .text(300.0, 100.0, 10.0, "01:30:00")
            .build()
            .unwrap();

        let doc = Document::from_bytes(&bytes).unwrap();
        assert_eq!(doc.page_count(), 1);

        let page = doc.page(0).unwrap();
        assert_eq!(page.number, 1);
        assert!((page.width - 595.0).abs() < 1e-3);
        assert!((page.height - 842.0).abs() < 1e-3);

        let words = page.extract_words(&WordOptions::default());
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["Alpha", "Project", "01:30:00"]);

        let duration = &words[2];
        assert!((duration.x0 - 300.0).abs() < 1e-2);
        assert!((duration.top - 100.0).abs() < 1e-2);
        assert!((duration.bottom - 110.0).abs() < 1e-2);
    }

    #[test]
    fn test_page_out_of_range() {
        let bytes = FixtureBuilder::new(200.0, 200.0).build().unwrap();
        let doc = Document::from_bytes(&bytes).unwrap();
        assert!(matches!(doc.page(3), Err(PdfError::PageNotFound(3))));
    }

    #[test]
    fn test_multiple_pages_in_order() {
        let bytes = FixtureBuilder::new(300.0, 300.0)
            .text(10.0, 10.0, 8.0, "first")
            .page()
            .text(10.0, 10.0, 8.0, "second")
            .build()
            .unwrap();
        let doc = Document::from_bytes(&bytes).unwrap();
        assert_eq!(doc.page_count(), 2);

        let second = doc.page(1).unwrap();
        let words = second.extract_words(&WordOptions::default());
        assert_eq!(words[0].text, "second");
        assert_eq!(second.number, 2);
    }

    #[test]
    fn test_metadata_title() {
        let bytes = FixtureBuilder::new(100.0, 100.0)
            .title("Report")
            .build()
            .unwrap();
        let meta = info(&bytes).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Report"));
        assert_eq!(meta.page_count, 1);
    }
}
