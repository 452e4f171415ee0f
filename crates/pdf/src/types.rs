use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in page coordinates (origin top-left, `top`
/// grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

impl BBox {
    pub fn new(x0: f32, top: f32, x1: f32, bottom: f32) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.top && y <= self.bottom
    }

    /// Overlap of two rectangles; `None` when they do not intersect.
    pub fn intersect(&self, other: &BBox) -> Option<BBox> {
        let x0 = self.x0.max(other.x0);
        let top = self.top.max(other.top);
        let x1 = self.x1.min(other.x1);
        let bottom = self.bottom.min(other.bottom);
        if x0 > x1 || top > bottom {
            return None;
        }
        Some(BBox::new(x0, top, x1, bottom))
    }
}

/// A single rendered glyph with its bounding box in top-left page
/// coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
    pub size: f32,
}

impl Glyph {
    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.top + self.bottom) / 2.0)
    }
}

/// A word assembled from consecutive glyphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
}

/// Parameters controlling how glyphs are clustered into words.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WordOptions {
    /// Maximum horizontal gap between two glyphs of the same word.
    pub x_tolerance: f32,
    /// Maximum vertical offset between two glyphs of the same word.
    pub y_tolerance: f32,
    /// Keep whitespace glyphs inside words instead of splitting on them.
    pub keep_blank_chars: bool,
    /// Walk glyphs in content-stream order instead of reading order.
    pub use_text_flow: bool,
}

impl Default for WordOptions {
    fn default() -> Self {
        Self {
            x_tolerance: 3.0,
            y_tolerance: 3.0,
            keep_blank_chars: false,
            use_text_flow: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page_count: usize,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_dimensions() {
        let b = BBox::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(b.width(), 100.0);
        assert_eq!(b.height(), 50.0);
    }

    #[test]
    fn test_bbox_intersect() {
        let a = BBox::new(0.0, 0.0, 100.0, 100.0);
        let b = BBox::new(50.0, 50.0, 150.0, 150.0);
        assert_eq!(a.intersect(&b), Some(BBox::new(50.0, 50.0, 100.0, 100.0)));
    }

    #[test]
    fn test_bbox_disjoint() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(20.0, 20.0, 30.0, 30.0);
        assert!(a.intersect(&b).is_none());
    }

    #[test]
    fn test_bbox_contains_point_edges() {
        let b = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(b.contains_point(0.0, 10.0));
        assert!(!b.contains_point(10.1, 5.0));
    }
}
