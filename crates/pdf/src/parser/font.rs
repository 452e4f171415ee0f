//! Font metrics and text decoding.
//!
//! A [`FontInfo`] carries everything the glyph extractor needs to turn the
//! raw bytes of a text-showing operator into positioned characters: the code
//! width (one or two bytes), the advance width of each code, and an optional
//! `/ToUnicode` map.

use std::collections::HashMap;

use super::backend::decode_text_simple;

/// Advance width (in thousandths of text space) used when a font carries no
/// width information at all.
pub const FALLBACK_GLYPH_WIDTH: f32 = 500.0;

/// Font descent (in thousandths of text space) assumed when the font
/// descriptor does not declare one.
pub const FALLBACK_DESCENT: f32 = -200.0;

/// Font information extracted from a page's resource dictionary.
#[derive(Debug, Clone, Default)]
pub struct FontInfo {
    /// The font name key as it appears in the resource dictionary (e.g. `b"F1"`).
    pub name: Vec<u8>,
    /// Base font name from the font dictionary, if present.
    pub base_font: Option<String>,
    /// Font subtype (e.g. `Type1`, `TrueType`, `Type0`).
    pub subtype: Option<String>,
    /// Encoding entry from the font dictionary, if it is a name.
    pub encoding: Option<String>,
    /// Advance widths keyed by character code, in thousandths of text space.
    pub widths: HashMap<u32, f32>,
    /// Width for codes missing from `widths` (`/DW` or `/MissingWidth`).
    pub default_width: Option<f32>,
    /// Descent from the font descriptor, in thousandths of text space.
    pub descent: Option<f32>,
    /// Parsed `/ToUnicode` CMap.
    pub to_unicode: Option<CMap>,
}

/// One decoded character code.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedCode {
    pub code: u32,
    pub text: String,
    /// Number of source bytes the code occupied.
    pub byte_len: usize,
    /// Advance width in thousandths of text space.
    pub width: f32,
}

impl FontInfo {
    /// Composite fonts address glyphs with two-byte codes.
    pub fn is_composite(&self) -> bool {
        self.subtype.as_deref() == Some("Type0")
            || self
                .encoding
                .as_deref()
                .is_some_and(|e| e.starts_with("Identity"))
    }

    fn code_bytes(&self) -> usize {
        match &self.to_unicode {
            Some(cmap) if cmap.code_bytes > 0 => cmap.code_bytes,
            _ if self.is_composite() => 2,
            _ => 1,
        }
    }

    /// Advance width for a code, falling back to the default width and then
    /// to [`FALLBACK_GLYPH_WIDTH`].
    pub fn width_of(&self, code: u32) -> f32 {
        self.widths
            .get(&code)
            .copied()
            .or(self.default_width)
            .filter(|w| *w > 0.0)
            .unwrap_or(FALLBACK_GLYPH_WIDTH)
    }

    /// Split raw string bytes into character codes and decode each one.
    pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedCode> {
        let step = self.code_bytes();
        let mut out = Vec::with_capacity(bytes.len() / step + 1);

        for chunk in bytes.chunks(step) {
            let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
            let text = self.code_text(code, chunk);
            out.push(DecodedCode {
                code,
                text,
                byte_len: chunk.len(),
                width: self.width_of(code),
            });
        }

        out
    }

    fn code_text(&self, code: u32, raw: &[u8]) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.get(code)) {
            return text.to_string();
        }
        if raw.len() == 2 {
            // Without a CMap, Identity-encoded codes are frequently Unicode.
            return char::from_u32(code)
                .filter(|c| !c.is_control())
                .map(String::from)
                .unwrap_or_default();
        }
        decode_text_simple(raw)
    }
}

// ---------------------------------------------------------------------------
// ToUnicode CMaps
// ---------------------------------------------------------------------------

/// A parsed `/ToUnicode` CMap: character code to Unicode text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CMap {
    /// Byte length of source codes, inferred from the mapping entries.
    pub code_bytes: usize,
    map: HashMap<u32, String>,
}

impl CMap {
    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    Keyword(String),
}

fn tokenize_cmap(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        match b {
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let end = data[i + 1..]
                    .iter()
                    .position(|&c| c == b'>')
                    .map_or(data.len(), |p| i + 1 + p);
                let digits: Vec<u8> = data[i + 1..end]
                    .iter()
                    .copied()
                    .filter(u8::is_ascii_hexdigit)
                    .collect();
                tokens.push(CMapToken::Hex(hex_bytes(&digits)));
                i = end + 1;
            }
            b'[' => {
                tokens.push(CMapToken::ArrayStart);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::ArrayEnd);
                i += 1;
            }
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'(' => {
                // Literal strings only appear in the CMap header.
                while i < data.len() && data[i] != b')' {
                    i += 1;
                }
                i += 1;
            }
            c if c.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'>' | b'[' | b']' | b'(' | b'%')
                {
                    i += 1;
                }
                let word = String::from_utf8_lossy(&data[start..i]).into_owned();
                tokens.push(CMapToken::Keyword(word));
            }
        }
    }

    tokens
}

fn hex_bytes(digits: &[u8]) -> Vec<u8> {
    let nibble = |c: u8| match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        _ => c - b'A' + 10,
    };
    digits
        .chunks(2)
        .map(|pair| {
            let hi = nibble(pair[0]);
            let lo = pair.get(1).map_or(0, |c| nibble(*c));
            (hi << 4) | lo
        })
        .collect()
}

fn note_width(cmap: &mut CMap, src: &[u8]) {
    if cmap.code_bytes == 0 {
        cmap.code_bytes = src.len();
    }
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

fn utf16_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .filter(|c| c.len() == 2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Increment the last UTF-16 code unit of a destination string, as
/// `bfrange` entries with a single destination require.
fn offset_utf16(bytes: &[u8], offset: u32) -> String {
    let mut units: Vec<u16> = bytes
        .chunks(2)
        .filter(|c| c.len() == 2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    if let Some(last) = units.last_mut() {
        *last = last.wrapping_add(offset as u16);
    }
    String::from_utf16_lossy(&units)
}

/// Parse the `bfchar` and `bfrange` sections of a ToUnicode CMap stream.
pub fn parse_cmap(data: &[u8]) -> CMap {
    let tokens = tokenize_cmap(data);
    let mut cmap = CMap::default();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            CMapToken::Keyword(k) if k == "beginbfchar" => {
                i += 1;
                while i + 1 < tokens.len() {
                    match (&tokens[i], &tokens[i + 1]) {
                        (CMapToken::Hex(src), CMapToken::Hex(dst)) => {
                            note_width(&mut cmap, src);
                            cmap.map.insert(code_of(src), utf16_text(dst));
                            i += 2;
                        }
                        _ => break,
                    }
                }
            }
            CMapToken::Keyword(k) if k == "beginbfrange" => {
                i += 1;
                while i + 2 < tokens.len() {
                    let (CMapToken::Hex(lo), CMapToken::Hex(hi)) = (&tokens[i], &tokens[i + 1])
                    else {
                        break;
                    };
                    note_width(&mut cmap, lo);
                    let (lo, hi) = (code_of(lo), code_of(hi));
                    match &tokens[i + 2] {
                        CMapToken::Hex(dst) => {
                            for code in lo..=hi.min(lo.saturating_add(0xFFFF)) {
                                cmap.map.insert(code, offset_utf16(dst, code - lo));
                            }
                            i += 3;
                        }
                        CMapToken::ArrayStart => {
                            i += 3;
                            let mut code = Some(lo);
                            while let Some(CMapToken::Hex(dst)) = tokens.get(i) {
                                if let Some(c) = code.filter(|c| *c <= hi) {
                                    cmap.map.insert(c, utf16_text(dst));
                                }
                                code = code.and_then(|c| c.checked_add(1));
                                i += 1;
                            }
                            if tokens.get(i) == Some(&CMapToken::ArrayEnd) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
            }
            _ => i += 1,
        }
    }

    cmap
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CMAP: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0011> <0050>
endbfchar
2 beginbfrange
<0024> <0026> <0041>
<0030> <0031> [<0031> <0032>]
endbfrange
endcmap";

    #[test]
    fn test_parse_cmap_bfchar() {
        let cmap = parse_cmap(SAMPLE_CMAP);
        assert_eq!(cmap.code_bytes, 2);
        assert_eq!(cmap.get(0x0003), Some(" "));
        assert_eq!(cmap.get(0x0011), Some("P"));
    }

    #[test]
    fn test_parse_cmap_bfrange_offset() {
        let cmap = parse_cmap(SAMPLE_CMAP);
        assert_eq!(cmap.get(0x0024), Some("A"));
        assert_eq!(cmap.get(0x0026), Some("C"));
        assert_eq!(cmap.get(0x0027), None);
    }

    #[test]
    fn test_parse_cmap_bfrange_array() {
        let cmap = parse_cmap(SAMPLE_CMAP);
        assert_eq!(cmap.get(0x0030), Some("1"));
        assert_eq!(cmap.get(0x0031), Some("2"));
        assert_eq!(cmap.len(), 7);
    }

    #[test]
    fn test_parse_cmap_bfrange_array_at_top_code() {
        let cmap = parse_cmap(
            b"1 beginbfrange\n<FFFFFFFF> <FFFFFFFF> [<0041> <0042> <0043>]\nendbfrange\n1 beginbfchar\n<0003> <0020>\nendbfchar",
        );
        assert_eq!(cmap.get(0xFFFF_FFFF), Some("A"));
        assert_eq!(cmap.get(0x0003), Some(" "));
        assert_eq!(cmap.len(), 2);
    }

    #[test]
    fn test_parse_cmap_garbage_is_empty() {
        assert!(parse_cmap(b"not a cmap at all").is_empty());
    }

    #[test]
    fn test_decode_simple_font_uses_widths() {
        let mut font = FontInfo {
            subtype: Some("TrueType".into()),
            ..Default::default()
        };
        font.widths.insert(u32::from(b'A'), 667.0);

        let codes = font.decode(b"AB");
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].text, "A");
        assert_eq!(codes[0].width, 667.0);
        assert_eq!(codes[1].width, FALLBACK_GLYPH_WIDTH);
    }

    #[test]
    fn test_decode_composite_font_with_cmap() {
        let font = FontInfo {
            subtype: Some("Type0".into()),
            encoding: Some("Identity-H".into()),
            default_width: Some(1000.0),
            to_unicode: Some(parse_cmap(SAMPLE_CMAP)),
            ..Default::default()
        };

        let codes = font.decode(&[0x00, 0x11, 0x00, 0x03, 0x00, 0x25]);
        let text: String = codes.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(text, "P B");
        assert!(codes.iter().all(|c| c.byte_len == 2 && c.width == 1000.0));
    }

    #[test]
    fn test_decode_identity_without_cmap_falls_back_to_unicode() {
        let font = FontInfo {
            encoding: Some("Identity-H".into()),
            ..Default::default()
        };
        let codes = font.decode(&[0x00, 0x48, 0x00, 0x69]);
        let text: String = codes.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(text, "Hi");
    }
}
