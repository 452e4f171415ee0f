use serde::{Deserialize, Serialize};

/// Fractional margins trimmed off every page before tokens are read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyMargins {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for BodyMargins {
    fn default() -> Self {
        Self {
            left: 0.04,
            top: 0.06,
            right: 0.04,
            bottom: 0.05,
        }
    }
}

/// Tuning knobs for table reconstruction.
///
/// Every field has a default matching the report layout, so a TOML override
/// file only needs the keys it changes:
///
/// ```toml
/// amount = true
/// row_tolerance = 2.5
///
/// [margins]
/// top = 0.08
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub margins: BodyMargins,
    /// Horizontal gap tolerated between glyphs of one token.
    pub x_tolerance: f32,
    /// Vertical offset tolerated between glyphs of one token.
    pub y_tolerance: f32,
    /// Half-height of a row band around an anchor's vertical center.
    pub row_tolerance: f32,
    /// Gap kept between the label column and the first numeric column.
    pub left_inset: f32,
    /// Distance from the "client" header to the client column start.
    pub client_inset: f32,
    /// Gap kept on both sides of the amount column.
    pub amount_inset: f32,
    /// Quantile of token x0 used as client start when no header exists.
    pub client_quantile: f32,
    /// Same as `client_quantile`, for layouts without an amount column.
    pub client_quantile_no_amount: f32,
    /// Extract the amount column.
    pub amount: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            margins: BodyMargins::default(),
            x_tolerance: 2.0,
            y_tolerance: 2.5,
            row_tolerance: 2.0,
            left_inset: 10.0,
            client_inset: 4.0,
            amount_inset: 10.0,
            client_quantile: 0.80,
            client_quantile_no_amount: 0.85,
            amount: false,
        }
    }
}

impl ExtractConfig {
    /// Defaults with the amount column enabled.
    pub fn with_amount() -> Self {
        Self {
            amount: true,
            ..Self::default()
        }
    }

    /// Parse overrides from TOML; missing keys keep their defaults.
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Quantile for the positional client fallback in the active variant.
    pub fn fallback_quantile(&self) -> f32 {
        if self.amount {
            self.client_quantile
        } else {
            self.client_quantile_no_amount
        }
    }
}
