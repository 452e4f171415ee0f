use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ExtractConfig;

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}:\d{2}$").expect("valid duration regex"));

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(?:[.,]\d+)?%$").expect("valid percent regex"));

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:-|[€$£¥]|[€$£¥]?\d[\d.,']*[€$£¥]?)$").expect("valid amount regex")
});

/// A positioned word on a page. `top` grows downward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Token {
    pub fn new(text: impl Into<String>, x0: f32, x1: f32, top: f32, bottom: f32) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
            bottom,
        }
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    /// `H:MM:SS` or `HH:MM:SS`.
    pub fn is_duration(&self) -> bool {
        DURATION_RE.is_match(self.text.trim())
    }

    /// `N%`, `NN.NN%` or `NN,NN%`.
    pub fn is_percent(&self) -> bool {
        PERCENT_RE.is_match(self.text.trim())
    }

    /// A currency symbol and/or digit groups, or a lone "-".
    pub fn is_amount(&self) -> bool {
        AMOUNT_RE.is_match(self.text.trim())
    }
}

/// A rectangle in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub x0: f32,
    pub top: f32,
    pub x1: f32,
    pub bottom: f32,
}

/// Word-extraction parameters handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordParams {
    pub x_tolerance: f32,
    pub y_tolerance: f32,
    pub keep_blank_chars: bool,
    pub use_text_flow: bool,
}

/// What the table engine needs from a rendered page.
pub trait RenderedPage {
    fn width(&self) -> f32;
    fn height(&self) -> f32;
    /// Restrict the page to `region`; coordinates stay page-absolute.
    fn crop(&self, region: Region) -> Self
    where
        Self: Sized;
    fn extract_tokens(&self, params: &WordParams) -> Vec<Token>;
}

/// The page region left after trimming running headers and footers.
pub fn body_region(width: f32, height: f32, config: &ExtractConfig) -> Region {
    let m = &config.margins;
    Region {
        x0: width * m.left,
        top: height * m.top,
        x1: width * (1.0 - m.right),
        bottom: height * (1.0 - m.bottom),
    }
}

/// Tokens of a page's body.
pub fn page_tokens<P: RenderedPage>(page: &P, config: &ExtractConfig) -> Vec<Token> {
    let body = body_region(page.width(), page.height(), config);
    let params = WordParams {
        x_tolerance: config.x_tolerance,
        y_tolerance: config.y_tolerance,
        keep_blank_chars: false,
        use_text_flow: true,
    };
    page.crop(body).extract_tokens(&params)
}
