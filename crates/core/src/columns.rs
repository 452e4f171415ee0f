use serde::Serialize;

use crate::config::ExtractConfig;
use crate::token::Token;

/// Horizontal column boundaries of one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnBounds {
    /// Label tokens start left of this.
    pub left_max: f32,
    pub duration_x_min: f32,
    pub percent_x_min: f32,
    /// Amount band, present only when amounts are extracted.
    pub amount: Option<(f32, f32)>,
    pub client_x_min: f32,
    pub client_x_max: f32,
}

/// Linear-interpolated quantile of `values`; `None` when empty.
pub fn quantile(values: &[f32], q: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f32;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

fn min_x0<'a>(tokens: impl Iterator<Item = &'a Token>) -> Option<f32> {
    tokens.map(|t| t.x0).reduce(f32::min)
}

/// Infer column bounds from a page's tokens.
///
/// Returns `None` when the page lacks either duration or percentage anchors,
/// in which case it has no rows.
pub fn locate_columns(tokens: &[Token], config: &ExtractConfig) -> Option<ColumnBounds> {
    let duration_x_min = min_x0(tokens.iter().filter(|t| t.is_duration()))?;
    let percent_x_min = min_x0(tokens.iter().filter(|t| t.is_percent()))?;
    let left_max = duration_x_min.min(percent_x_min) - config.left_inset;

    let header = min_x0(
        tokens
            .iter()
            .filter(|t| t.text.trim().eq_ignore_ascii_case("client")),
    );
    let client_x_min = match header {
        Some(x0) => x0 - config.client_inset,
        None => {
            let xs: Vec<f32> = tokens.iter().map(|t| t.x0).collect();
            quantile(&xs, config.fallback_quantile())?
        }
    };
    let client_x_max = tokens
        .iter()
        .map(|t| t.x1)
        .fold(client_x_min, f32::max);

    let amount = config.amount.then(|| {
        (
            percent_x_min + config.amount_inset,
            client_x_min - config.amount_inset,
        )
    });

    Some(ColumnBounds {
        left_max,
        duration_x_min,
        percent_x_min,
        amount,
        client_x_min,
        client_x_max,
    })
}
