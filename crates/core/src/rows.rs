//! Row reconstruction around duration anchors.
//!
//! Each duration token opens a row. Its percentage is the percentage token
//! whose vertical center is nearest, and every other cell is the text found
//! in that column's horizontal range within a few units of the anchor's top.

use serde::Serialize;

use crate::columns::ColumnBounds;
use crate::config::ExtractConfig;
use crate::token::Token;

/// A rectangular slice of the page: `top ± tolerance` vertically and
/// `[x_min, x_max)` on token `x0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub top: f32,
    pub tolerance: f32,
    pub x_min: f32,
    pub x_max: f32,
}

impl Band {
    pub fn contains(&self, token: &Token) -> bool {
        (token.top - self.top).abs() <= self.tolerance
            && token.x0 >= self.x_min
            && token.x0 < self.x_max
    }
}

/// Tokens inside `band`, left to right.
pub fn tokens_in_band<'a>(tokens: &'a [Token], band: &Band) -> Vec<&'a Token> {
    let mut hits: Vec<&Token> = tokens.iter().filter(|t| band.contains(t)).collect();
    hits.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    hits
}

fn join(tokens: &[&Token]) -> String {
    tokens
        .iter()
        .map(|t| t.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the tokens inside `band`, joined by single spaces.
pub fn band_text(tokens: &[Token], band: &Band) -> String {
    join(&tokens_in_band(tokens, band))
}

/// Cell texts of one row before classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRow {
    pub left_text: String,
    pub duration_text: String,
    pub percent_text: String,
    /// `None` when amounts are not extracted.
    pub amount_text: Option<String>,
    pub client_text: String,
    pub top: f32,
}

/// Percentage anchor whose vertical center is closest to `anchor`'s.
fn nearest_percent<'a>(anchor: &Token, percents: &[&'a Token]) -> Option<&'a Token> {
    let center = anchor.center_y();
    percents
        .iter()
        .copied()
        .min_by(|a, b| {
            (a.center_y() - center)
                .abs()
                .total_cmp(&(b.center_y() - center).abs())
        })
}

/// Amount text for the row at `top` within the amount span, or `"-"`.
///
/// When the row band is empty, a second pass looks twice as far vertically
/// but accepts only a single token shaped like an amount, since amounts are
/// sometimes drawn a few units off the row baseline.
fn amount_cell(tokens: &[Token], top: f32, (x_min, x_max): (f32, f32), config: &ExtractConfig) -> String {
    let band = Band {
        top,
        tolerance: config.row_tolerance,
        x_min,
        x_max,
    };
    let cells: Vec<&Token> = tokens_in_band(tokens, &band)
        .into_iter()
        .filter(|t| !t.is_duration() && !t.is_percent())
        .collect();
    if !cells.is_empty() {
        return join(&cells);
    }

    let relaxed = Band {
        tolerance: config.row_tolerance * 2.0,
        ..band
    };
    tokens_in_band(tokens, &relaxed)
        .into_iter()
        .filter(|t| t.is_amount())
        .min_by(|a, b| (a.top - top).abs().total_cmp(&(b.top - top).abs()))
        .map(|t| t.text.trim().to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Build one raw row per duration anchor, top to bottom.
pub fn assemble_rows(tokens: &[Token], bounds: &ColumnBounds, config: &ExtractConfig) -> Vec<RawRow> {
    let mut durations: Vec<&Token> = tokens.iter().filter(|t| t.is_duration()).collect();
    let percents: Vec<&Token> = tokens.iter().filter(|t| t.is_percent()).collect();
    if percents.is_empty() {
        return Vec::new();
    }
    durations.sort_by(|a, b| a.top.total_cmp(&b.top));

    let band = |top: f32, x_min: f32, x_max: f32| Band {
        top,
        tolerance: config.row_tolerance,
        x_min,
        x_max,
    };

    durations
        .into_iter()
        .filter_map(|duration| {
            let percent = nearest_percent(duration, &percents)?;
            let top = duration.top;

            let left_text = band_text(tokens, &band(top, f32::NEG_INFINITY, bounds.left_max));

            let amount_text = bounds.amount.map(|span| amount_cell(tokens, top, span, config));

            let client_band = band(top, bounds.client_x_min, f32::INFINITY);
            let client_cells: Vec<&Token> = tokens_in_band(tokens, &client_band)
                .into_iter()
                .filter(|t| !(bounds.amount.is_some() && t.text.trim() == "-"))
                .collect();

            Some(RawRow {
                left_text,
                duration_text: duration.text.trim().to_string(),
                percent_text: percent.text.trim().to_string(),
                amount_text,
                client_text: join(&client_cells),
                top,
            })
        })
        .collect()
}
