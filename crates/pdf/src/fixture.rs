//! In-memory PDF builder for tests.
//!
//! Every run of text is drawn in Helvetica without a `/Widths` array, so each
//! glyph is half the font size wide and the glyph box spans exactly
//! `[top, top + size]` in page coordinates.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};

use crate::PdfError;

#[derive(Debug, Clone)]
struct TextRun {
    x: f32,
    top: f32,
    size: f32,
    text: String,
}

/// Builds a PDF whose pages carry text at known top-left coordinates.
#[derive(Debug, Clone)]
pub struct FixtureBuilder {
    width: f32,
    height: f32,
    title: Option<String>,
    pages: Vec<Vec<TextRun>>,
}

impl FixtureBuilder {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            title: None,
            pages: vec![Vec::new()],
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Start a new page; subsequent text lands on it.
    pub fn page(mut self) -> Self {
        self.pages.push(Vec::new());
        self
    }

    /// Place `text` with its left edge at `x` and its box top at `top`.
    pub fn text(mut self, x: f32, top: f32, size: f32, text: &str) -> Self {
        if let Some(page) = self.pages.last_mut() {
            page.push(TextRun {
                x,
                top,
                size,
                text: text.to_string(),
            });
        }
        self
    }

    pub fn build(self) -> Result<Vec<u8>, PdfError> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::with_capacity(self.pages.len());
        for runs in &self.pages {
            let mut operations = Vec::new();
            for run in runs {
                // Baseline sits 0.8 * size above the box bottom.
                let baseline = self.height - run.top - 0.8 * run.size;
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), run.size.into()]));
                operations.push(Operation::new(
                    "Tm",
                    vec![
                        1.into(),
                        0.into(),
                        0.into(),
                        1.into(),
                        run.x.into(),
                        baseline.into(),
                    ],
                ));
                operations.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(run.text.as_str())],
                ));
                operations.push(Operation::new("ET", vec![]));
            }

            let content = Content { operations }
                .encode()
                .map_err(|e| PdfError::Parse(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "MediaBox" => vec![0.into(), 0.into(), self.width.into(), self.height.into()],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        if let Some(title) = &self.title {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(title.as_str()),
            });
            doc.trailer.set("Info", info_id);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| PdfError::Parse(e.to_string()))?;
        Ok(bytes)
    }
}
