use crate::parser::words;
use crate::types::{BBox, Glyph, Word, WordOptions};

/// A rendered page: its size plus every glyph drawn on it.
///
/// Coordinates are page-absolute with the origin at the top-left corner, so
/// cropping never shifts positions.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub width: f32,
    pub height: f32,
    /// Region still visible after cropping (the full page initially).
    pub bbox: BBox,
    glyphs: Vec<Glyph>,
}

impl Page {
    pub fn new(number: usize, width: f32, height: f32, glyphs: Vec<Glyph>) -> Self {
        Self {
            number,
            width,
            height,
            bbox: BBox::new(0.0, 0.0, width, height),
            glyphs,
        }
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    /// Restrict the page to `bbox`, keeping glyphs whose center falls inside.
    ///
    /// A box that does not overlap the current region yields an empty page.
    pub fn crop(&self, bbox: BBox) -> Page {
        let Some(region) = self.bbox.intersect(&bbox) else {
            return Page {
                bbox: BBox::new(bbox.x0, bbox.top, bbox.x0, bbox.top),
                glyphs: Vec::new(),
                ..self.clone()
            };
        };

        let glyphs = self
            .glyphs
            .iter()
            .filter(|g| {
                let (cx, cy) = g.center();
                region.contains_point(cx, cy)
            })
            .cloned()
            .collect();

        Page {
            number: self.number,
            width: self.width,
            height: self.height,
            bbox: region,
            glyphs,
        }
    }

    pub fn extract_words(&self, opts: &WordOptions) -> Vec<Word> {
        words::extract_words(&self.glyphs, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(text: &str, x0: f32, top: f32) -> Glyph {
        Glyph {
            text: text.into(),
            x0,
            x1: x0 + 6.0,
            top,
            bottom: top + 10.0,
            size: 10.0,
        }
    }

    fn page() -> Page {
        Page::new(
            1,
            600.0,
            800.0,
            vec![
                glyph("h", 300.0, 10.0),
                glyph("b", 100.0, 400.0),
                glyph("f", 300.0, 780.0),
                glyph("e", 20.0, 400.0),
            ],
        )
    }

    #[test]
    fn test_crop_keeps_glyphs_by_center() {
        let cropped = page().crop(BBox::new(24.0, 48.0, 576.0, 760.0));
        let kept: Vec<&str> = cropped.glyphs().iter().map(|g| g.text.as_str()).collect();
        // "e" spans 20..26, center 23 sits left of the crop.
        assert_eq!(kept, ["b"]);
        assert_eq!(cropped.bbox, BBox::new(24.0, 48.0, 576.0, 760.0));
        assert_eq!(cropped.width, 600.0);
    }

    #[test]
    fn test_crop_keeps_absolute_coordinates() {
        let cropped = page().crop(BBox::new(50.0, 50.0, 500.0, 500.0));
        assert_eq!(cropped.glyphs()[0].x0, 100.0);
        assert_eq!(cropped.glyphs()[0].top, 400.0);
    }

    #[test]
    fn test_crop_outside_is_empty() {
        let cropped = page().crop(BBox::new(700.0, 900.0, 800.0, 1000.0));
        assert!(cropped.glyphs().is_empty());
    }

    #[test]
    fn test_extract_words_on_page() {
        let words = page().extract_words(&WordOptions::default());
        assert_eq!(words.len(), 4);
        assert_eq!(words[0].text, "h");
    }
}
