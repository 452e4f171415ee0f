//! Bridges the `pdf` renderer to the table engine.

use breakdown_core::config::ExtractConfig;
use breakdown_core::pipeline::{process_pages, ExtractError, PageSource, ResultTable};
use breakdown_core::token::{Region, RenderedPage, Token, WordParams};
use pdf::{BBox, WordOptions};

/// A rendered PDF page seen through [`RenderedPage`].
#[derive(Debug, Clone)]
pub struct PdfPage(pub pdf::Page);

impl RenderedPage for PdfPage {
    fn width(&self) -> f32 {
        self.0.width
    }

    fn height(&self) -> f32 {
        self.0.height
    }

    fn crop(&self, region: Region) -> Self {
        PdfPage(
            self.0
                .crop(BBox::new(region.x0, region.top, region.x1, region.bottom)),
        )
    }

    fn extract_tokens(&self, params: &WordParams) -> Vec<Token> {
        let options = WordOptions {
            x_tolerance: params.x_tolerance,
            y_tolerance: params.y_tolerance,
            keep_blank_chars: params.keep_blank_chars,
            use_text_flow: params.use_text_flow,
        };
        self.0
            .extract_words(&options)
            .into_iter()
            .map(|w| Token::new(w.text, w.x0, w.x1, w.top, w.bottom))
            .collect()
    }
}

/// A loaded PDF seen as a [`PageSource`].
pub struct PdfDocument(pub pdf::Document);

impl PdfDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractError> {
        pdf::Document::from_bytes(bytes)
            .map(PdfDocument)
            .map_err(|e| ExtractError::UnreadableDocument(e.to_string()))
    }
}

impl PageSource for PdfDocument {
    type Page = PdfPage;

    fn page_count(&self) -> usize {
        self.0.page_count()
    }

    fn page(&self, index: usize) -> Option<PdfPage> {
        match self.0.page(index) {
            Ok(page) => Some(PdfPage(page)),
            Err(e) => {
                log::warn!("page {}: skipped, {}", index + 1, e);
                None
            }
        }
    }
}

/// Rebuild the breakdown table from raw PDF bytes.
///
/// Only bytes that cannot be parsed as a PDF fail; a document without the
/// table gives an empty result.
pub fn process_document(bytes: &[u8], config: &ExtractConfig) -> Result<ResultTable, ExtractError> {
    let document = PdfDocument::from_bytes(bytes)?;
    log::debug!("loaded document with {} pages", document.page_count());
    Ok(process_pages(&document, config))
}
