//! Glyph-to-word clustering.

use crate::types::{Glyph, Word, WordOptions};

/// Whether `curr` starts a new word after `prev`.
fn begins_new_word(prev: &Glyph, curr: &Glyph, opts: &WordOptions) -> bool {
    curr.x0 < prev.x0
        || curr.x0 > prev.x1 + opts.x_tolerance
        || (curr.top - prev.top).abs() > opts.y_tolerance
}

fn finish(current: &mut Vec<&Glyph>, words: &mut Vec<Word>) {
    if current.is_empty() {
        return;
    }
    let text: String = current.iter().map(|g| g.text.as_str()).collect();
    let word = Word {
        text,
        x0: current.iter().map(|g| g.x0).fold(f32::INFINITY, f32::min),
        x1: current.iter().map(|g| g.x1).fold(f32::NEG_INFINITY, f32::max),
        top: current.iter().map(|g| g.top).fold(f32::INFINITY, f32::min),
        bottom: current.iter().map(|g| g.bottom).fold(f32::NEG_INFINITY, f32::max),
    };
    words.push(word);
    current.clear();
}

/// Order glyphs line by line: cluster on `top` within `y_tolerance`, then
/// sort each line left to right.
fn reading_order<'a>(glyphs: &'a [Glyph], y_tolerance: f32) -> Vec<&'a Glyph> {
    let mut by_top: Vec<&Glyph> = glyphs.iter().collect();
    by_top.sort_by(|a, b| a.top.total_cmp(&b.top));

    let mut lines: Vec<Vec<&Glyph>> = Vec::new();
    let mut last_top = f32::NEG_INFINITY;
    for glyph in by_top {
        match lines.last_mut() {
            Some(line) if glyph.top - last_top <= y_tolerance => line.push(glyph),
            _ => lines.push(vec![glyph]),
        }
        last_top = glyph.top;
    }

    lines
        .into_iter()
        .flat_map(|mut line| {
            line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
            line
        })
        .collect()
}

/// Cluster glyphs into words.
///
/// With `use_text_flow` the glyphs are walked in the order they were drawn;
/// otherwise they are first arranged in reading order. Whitespace glyphs end
/// the current word unless `keep_blank_chars` is set.
pub fn extract_words(glyphs: &[Glyph], opts: &WordOptions) -> Vec<Word> {
    let ordered: Vec<&Glyph> = if opts.use_text_flow {
        glyphs.iter().collect()
    } else {
        reading_order(glyphs, opts.y_tolerance)
    };

    let mut words = Vec::new();
    let mut current: Vec<&Glyph> = Vec::new();

    for glyph in ordered {
        if !opts.keep_blank_chars && glyph.text.trim().is_empty() {
            finish(&mut current, &mut words);
            continue;
        }
        if let Some(prev) = current.last() {
            if begins_new_word(prev, glyph, opts) {
                finish(&mut current, &mut words);
            }
        }
        current.push(glyph);
    }
    finish(&mut current, &mut words);

    words
}
