//! Content-stream interpretation down to positioned glyphs.
//!
//! Walks a page's operators, tracking the graphics state (`q`/`Q`/`cm`) and
//! the text state (`BT`..`ET`, `Tf`, `Tm`, `Td`, ...), and emits one
//! [`Glyph`] per shown character code with its box in top-left page
//! coordinates.
//!
//! ```text
//! content ops  ->  glyphs (user space)  ->  glyphs (page space, top-down)
//! ```

use super::backend::{get_number_from_value, ContentOp, PageBox, PageId, PdfBackend, PdfValue};
use super::font::{FontInfo, FALLBACK_DESCENT};
use crate::types::Glyph;
use crate::PdfError;

/// A 2x3 affine matrix `[a, b, c, d, e, f]`.
type Matrix = [f32; 6];

/// The identity matrix.
const IDENTITY_MATRIX: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m1 × m2` in PDF row-vector convention.
fn multiply(m1: &Matrix, m2: &Matrix) -> Matrix {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

fn matrix_from(operands: &[PdfValue]) -> Option<Matrix> {
    let vals: Vec<f32> = operands
        .iter()
        .take(6)
        .filter_map(get_number_from_value)
        .collect();
    (vals.len() == 6).then(|| [vals[0], vals[1], vals[2], vals[3], vals[4], vals[5]])
}

// ---------------------------------------------------------------------------
// Internal: PDF text-state machine
// ---------------------------------------------------------------------------

/// Text parameters that survive across `BT`/`ET` and are saved by `q`.
#[derive(Debug, Clone)]
struct TextParams {
    font_key: Vec<u8>,
    font_size: f32,
    /// Horizontal scaling factor (percent / 100).
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            font_key: Vec::new(),
            font_size: 0.0,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    text: TextParams,
}

struct Interpreter<'a> {
    fonts: &'a [FontInfo],
    fallback_font: FontInfo,
    stack: Vec<GraphicsState>,
    state: GraphicsState,
    text_matrix: Matrix,
    line_matrix: Matrix,
    glyphs: Vec<Glyph>,
}

impl<'a> Interpreter<'a> {
    fn new(fonts: &'a [FontInfo]) -> Self {
        Self {
            fonts,
            fallback_font: FontInfo::default(),
            stack: Vec::new(),
            state: GraphicsState {
                ctm: IDENTITY_MATRIX,
                text: TextParams::default(),
            },
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            glyphs: Vec::new(),
        }
    }

    fn font(&self) -> &FontInfo {
        self.fonts
            .iter()
            .find(|f| f.name == self.state.text.font_key)
            .unwrap_or(&self.fallback_font)
    }

    /// Multiply the line matrix by a translation (used by Td / TD / T*).
    fn translate_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.translate_line(0.0, -leading);
    }

    fn run(&mut self, ops: &[ContentOp]) {
        for op in ops {
            let args = op.operands.as_slice();
            let num = |i: usize| args.get(i).and_then(get_number_from_value);

            match op.operator.as_str() {
                // -- Graphics state ----------------------------------------
                "q" => self.stack.push(self.state.clone()),
                "Q" => {
                    if let Some(saved) = self.stack.pop() {
                        self.state = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_from(args) {
                        self.state.ctm = multiply(&m, &self.state.ctm);
                    }
                }

                // -- Text object delimiters --------------------------------
                "BT" => {
                    self.text_matrix = IDENTITY_MATRIX;
                    self.line_matrix = IDENTITY_MATRIX;
                }
                "ET" => {}

                // -- Text state --------------------------------------------
                "Tf" => {
                    let key = match args.first() {
                        Some(PdfValue::Name(n)) | Some(PdfValue::Str(n)) => n.clone(),
                        _ => continue,
                    };
                    self.state.text.font_key = key;
                    self.state.text.font_size = num(1).unwrap_or(0.0);
                }
                "Tc" => {
                    if let Some(v) = num(0) {
                        self.state.text.char_spacing = v;
                    }
                }
                "Tw" => {
                    if let Some(v) = num(0) {
                        self.state.text.word_spacing = v;
                    }
                }
                "Tz" => {
                    if let Some(v) = num(0) {
                        self.state.text.horiz_scale = v / 100.0;
                    }
                }
                "Ts" => {
                    if let Some(v) = num(0) {
                        self.state.text.text_rise = v;
                    }
                }
                "TL" => {
                    if let Some(v) = num(0) {
                        self.state.text.leading = v;
                    }
                }

                // -- Text positioning --------------------------------------
                "Tm" => {
                    if let Some(m) = matrix_from(args) {
                        self.text_matrix = m;
                        self.line_matrix = m;
                    }
                }
                "Td" => {
                    if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                        self.translate_line(tx, ty);
                    }
                }
                "TD" => {
                    if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                        self.state.text.leading = -ty;
                        self.translate_line(tx, ty);
                    }
                }
                "T*" => self.next_line(),

                // -- Text showing ------------------------------------------
                "Tj" => {
                    if let Some(PdfValue::Str(bytes)) = args.first() {
                        self.show(bytes);
                    }
                }
                "TJ" => {
                    if let Some(PdfValue::Array(items)) = args.first() {
                        for item in items {
                            match item {
                                PdfValue::Str(bytes) => self.show(bytes),
                                other => {
                                    if let Some(adj) = get_number_from_value(other) {
                                        let t = &self.state.text;
                                        let tx = -adj / 1000.0 * t.font_size * t.horiz_scale;
                                        self.text_matrix =
                                            multiply(&[1.0, 0.0, 0.0, 1.0, tx, 0.0], &self.text_matrix);
                                    }
                                }
                            }
                        }
                    }
                }
                "'" => {
                    self.next_line();
                    if let Some(PdfValue::Str(bytes)) = args.first() {
                        self.show(bytes);
                    }
                }
                "\"" => {
                    if let (Some(aw), Some(ac)) = (num(0), num(1)) {
                        self.state.text.word_spacing = aw;
                        self.state.text.char_spacing = ac;
                    }
                    self.next_line();
                    if let Some(PdfValue::Str(bytes)) = args.get(2) {
                        self.show(bytes);
                    }
                }

                _ => {}
            }
        }
    }

    /// Emit one glyph per character code and advance the text matrix.
    fn show(&mut self, bytes: &[u8]) {
        let codes = self.font().decode(bytes);
        let descent = self.font().descent.unwrap_or(FALLBACK_DESCENT) / 1000.0;
        let t = self.state.text.clone();

        for code in codes {
            let advance = code.width / 1000.0 * t.font_size;

            // Glyph box in text space is [0, advance] x [descent, descent + 1] * size.
            let render = multiply(
                &[t.horiz_scale, 0.0, 0.0, 1.0, 0.0, t.text_rise],
                &multiply(&self.text_matrix, &self.state.ctm),
            );
            let corners = [
                (0.0, descent * t.font_size),
                (advance, (descent + 1.0) * t.font_size),
            ];
            let (mut xs, mut ys) = (Vec::with_capacity(2), Vec::with_capacity(2));
            for (x, y) in corners {
                xs.push(x * render[0] + y * render[2] + render[4]);
                ys.push(x * render[1] + y * render[3] + render[5]);
            }

            if !code.text.is_empty() {
                let size = (render[2].powi(2) + render[3].powi(2)).sqrt() * t.font_size;
                self.glyphs.push(Glyph {
                    text: code.text.clone(),
                    x0: xs[0].min(xs[1]),
                    x1: xs[0].max(xs[1]),
                    // Still bottom-up here; flipped by `to_page_space`.
                    top: ys[0].max(ys[1]),
                    bottom: ys[0].min(ys[1]),
                    size: size.abs(),
                });
            }

            let mut tx = advance + t.char_spacing;
            if code.byte_len == 1 && code.code == 32 {
                tx += t.word_spacing;
            }
            self.text_matrix = multiply(
                &[1.0, 0.0, 0.0, 1.0, tx * t.horiz_scale, 0.0],
                &self.text_matrix,
            );
        }
    }
}

/// Convert a bottom-up glyph into top-left page coordinates.
fn to_page_space(mut glyph: Glyph, page_box: &PageBox) -> Glyph {
    let (y_high, y_low) = (glyph.top, glyph.bottom);
    glyph.x0 -= page_box.llx;
    glyph.x1 -= page_box.llx;
    glyph.top = page_box.ury - y_high;
    glyph.bottom = page_box.ury - y_low;
    glyph
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Interpret already-decoded operations into glyphs in page space.
pub fn glyphs_from_ops(ops: &[ContentOp], fonts: &[FontInfo], page_box: &PageBox) -> Vec<Glyph> {
    let mut interpreter = Interpreter::new(fonts);
    interpreter.run(ops);
    interpreter
        .glyphs
        .into_iter()
        .map(|g| to_page_space(g, page_box))
        .collect()
}

/// Extract every glyph on a page, in content-stream order.
pub fn extract_page_glyphs(
    backend: &dyn PdfBackend,
    page_id: PageId,
) -> Result<Vec<Glyph>, PdfError> {
    let raw_content = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw_content)?;
    let fonts = backend.page_fonts(page_id).unwrap_or_default();
    let page_box = backend.page_box(page_id)?;

    Ok(glyphs_from_ops(&ops, &fonts, &page_box))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    const PAGE: PageBox = PageBox {
        llx: 0.0,
        lly: 0.0,
        urx: 600.0,
        ury: 800.0,
    };

    fn op(operator: &str, operands: Vec<PdfValue>) -> ContentOp {
        ContentOp {
            operator: operator.to_string(),
            operands,
        }
    }

    fn tf(size: f32) -> ContentOp {
        op("Tf", vec![PdfValue::Name(b"F1".to_vec()), PdfValue::Real(size)])
    }

    fn tm(x: f32, y: f32) -> ContentOp {
        op(
            "Tm",
            [1.0, 0.0, 0.0, 1.0, x, y]
                .into_iter()
                .map(PdfValue::Real)
                .collect(),
        )
    }

    fn tj(text: &str) -> ContentOp {
        op("Tj", vec![PdfValue::Str(text.as_bytes().to_vec())])
    }

    fn helvetica() -> Vec<FontInfo> {
        vec![FontInfo {
            name: b"F1".to_vec(),
            base_font: Some("Helvetica".into()),
            subtype: Some("Type1".into()),
            ..Default::default()
        }]
    }

    fn text(glyphs: &[Glyph]) -> String {
        glyphs.iter().map(|g| g.text.as_str()).collect()
    }

    #[test]
    fn test_tj_emits_one_glyph_per_char() {
        let ops = vec![op("BT", vec![]), tf(10.0), tm(100.0, 700.0), tj("Hi"), op("ET", vec![])];
        let glyphs = glyphs_from_ops(&ops, &helvetica(), &PAGE);

        assert_eq!(text(&glyphs), "Hi");
        // Fallback width is 500/1000 of the font size.
        assert!((glyphs[0].x0 - 100.0).abs() < 1e-3);
        assert!((glyphs[0].x1 - 105.0).abs() < 1e-3);
        assert!((glyphs[1].x0 - 105.0).abs() < 1e-3);
    }

    #[test]
    fn test_vertical_flip_and_descent() {
        let ops = vec![op("BT", vec![]), tf(10.0), tm(0.0, 700.0), tj("A")];
        let glyphs = glyphs_from_ops(&ops, &helvetica(), &PAGE);

        // Baseline 700, descent -2, ascent +8 => top = 800 - 708, bottom = 800 - 698.
        assert!((glyphs[0].top - 92.0).abs() < 1e-3);
        assert!((glyphs[0].bottom - 102.0).abs() < 1e-3);
        assert!((glyphs[0].size - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_cm_scales_and_translates() {
        let ops = vec![
            op("q", vec![]),
            op(
                "cm",
                [2.0, 0.0, 0.0, 2.0, 50.0, 0.0]
                    .into_iter()
                    .map(PdfValue::Real)
                    .collect(),
            ),
            op("BT", vec![]),
            tf(5.0),
            tm(10.0, 300.0),
            tj("X"),
            op("ET", vec![]),
            op("Q", vec![]),
            op("BT", vec![]),
            tf(5.0),
            tm(10.0, 300.0),
            tj("Y"),
        ];
        let glyphs = glyphs_from_ops(&ops, &helvetica(), &PAGE);

        assert_eq!(text(&glyphs), "XY");
        assert!((glyphs[0].x0 - 70.0).abs() < 1e-3, "got {}", glyphs[0].x0);
        assert!((glyphs[0].size - 10.0).abs() < 1e-3);
        // `Q` restored the identity CTM.
        assert!((glyphs[1].x0 - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_tj_array_kerning_moves_pen() {
        let ops = vec![
            op("BT", vec![]),
            tf(10.0),
            tm(0.0, 500.0),
            op(
                "TJ",
                vec![PdfValue::Array(vec![
                    PdfValue::Str(b"A".to_vec()),
                    PdfValue::Integer(-1000),
                    PdfValue::Str(b"B".to_vec()),
                ])],
            ),
        ];
        let glyphs = glyphs_from_ops(&ops, &helvetica(), &PAGE);

        // A advances 5, kerning -1000 moves a further 10.
        assert!((glyphs[1].x0 - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_spaces_advance_but_are_kept_as_glyphs() {
        let ops = vec![op("BT", vec![]), tf(10.0), tm(0.0, 500.0), tj("a b")];
        let glyphs = glyphs_from_ops(&ops, &helvetica(), &PAGE);
        assert_eq!(glyphs.len(), 3);
        assert_eq!(glyphs[1].text, " ");
    }

    #[test]
    fn test_td_and_t_star_use_leading() {
        let ops = vec![
            op("BT", vec![]),
            tf(10.0),
            op("Td", vec![PdfValue::Integer(20), PdfValue::Integer(600)]),
            op("TL", vec![PdfValue::Integer(14)]),
            tj("1"),
            op("T*", vec![]),
            tj("2"),
        ];
        let glyphs = glyphs_from_ops(&ops, &helvetica(), &PAGE);

        assert!((glyphs[0].x0 - 20.0).abs() < 1e-3);
        assert!((glyphs[1].x0 - 20.0).abs() < 1e-3);
        assert!((glyphs[1].top - glyphs[0].top - 14.0).abs() < 1e-3);
    }

    #[test]
    fn test_page_box_origin_offset() {
        let shifted = PageBox {
            llx: 30.0,
            lly: 40.0,
            urx: 630.0,
            ury: 840.0,
        };
        let ops = vec![op("BT", vec![]), tf(10.0), tm(130.0, 740.0), tj("Z")];
        let glyphs = glyphs_from_ops(&ops, &helvetica(), &shifted);
        assert!((glyphs[0].x0 - 100.0).abs() < 1e-3);
        assert!((glyphs[0].top - 92.0).abs() < 1e-3);
    }

    struct MockBackend {
        ops: Vec<ContentOp>,
    }

    impl PdfBackend for MockBackend {
        fn pages(&self) -> BTreeMap<u32, PageId> {
            BTreeMap::from([(1, (1, 0))])
        }

        fn page_fonts(&self, _page: PageId) -> Result<Vec<FontInfo>, PdfError> {
            Ok(helvetica())
        }

        fn page_content(&self, _page: PageId) -> Result<Vec<u8>, PdfError> {
            Ok(Vec::new())
        }

        fn decode_content(&self, _data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
            Ok(self.ops.clone())
        }

        fn page_box(&self, _page: PageId) -> Result<PageBox, PdfError> {
            Ok(PAGE)
        }
    }

    #[test]
    fn test_extract_page_glyphs_through_backend() {
        let backend = MockBackend {
            ops: vec![op("BT", vec![]), tf(12.0), tm(40.0, 400.0), tj("01:30:00")],
        };
        let glyphs = extract_page_glyphs(&backend, (1, 0)).unwrap();
        assert_eq!(text(&glyphs), "01:30:00");
    }

    #[test]
    fn test_show_without_font_uses_fallback_metrics() {
        let ops = vec![op("BT", vec![]), tm(0.0, 500.0), tj("x")];
        let glyphs = glyphs_from_ops(&ops, &[], &PAGE);
        assert_eq!(glyphs.len(), 1);
        // Font size 0 yields a degenerate box, but the glyph is still emitted.
        assert_eq!(glyphs[0].x0, glyphs[0].x1);
    }
}
