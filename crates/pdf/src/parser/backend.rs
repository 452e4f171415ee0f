use std::collections::{BTreeMap, HashMap, HashSet};

use lopdf::{self, content::Content};

use super::font::{parse_cmap, FontInfo};
use crate::PdfError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// A simplified, lopdf-independent representation of a PDF value.
///
/// Content-stream interpretation works on this enum so that it can be fed
/// hand-built operations in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

/// The visible page rectangle in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    /// US Letter, used when a page declares no usable box.
    pub const LETTER: PageBox = PageBox {
        llx: 0.0,
        lly: 0.0,
        urx: 612.0,
        ury: 792.0,
    };

    pub fn width(&self) -> f32 {
        (self.urx - self.llx).abs()
    }

    pub fn height(&self) -> f32 {
        (self.ury - self.lly).abs()
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Convert a `lopdf::Object` into a [`PdfValue`].
///
/// Stream dictionaries are converted but the stream bytes are dropped.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(
            dict.iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Stream(stream) => PdfValue::Dict(
            stream
                .dict
                .iter()
                .map(|(k, v)| (k.clone(), convert_object(v)))
                .collect(),
        ),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

/// Best-effort decoding of raw PDF string bytes into a Rust `String`.
///
/// Handles three cases in order:
/// 1. UTF-16BE with BOM (`\xFE\xFF` prefix).
/// 2. Valid UTF-8.
/// 3. Latin-1, each byte mapped to its Unicode code point.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let code_units: Vec<u16> = bytes[2..]
            .chunks(2)
            .filter(|chunk| chunk.len() == 2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return String::from_utf16_lossy(&code_units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

fn object_number(obj: &lopdf::Object) -> Option<f32> {
    match obj {
        lopdf::Object::Integer(i) => Some(*i as f32),
        lopdf::Object::Real(f) => Some(*f),
        _ => None,
    }
}

fn name_string(obj: &lopdf::Object) -> Option<String> {
    obj.as_name()
        .ok()
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over a PDF parsing backend (currently backed by `lopdf`).
///
/// Glyph extraction only talks to this trait, so it can be exercised with
/// in-memory operation lists.
pub trait PdfBackend {
    /// Return a mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Return font metrics and decoding tables for every font on the page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<FontInfo>, PdfError>;

    /// Return the raw (possibly compressed) content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    /// Decode raw content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Visible page rectangle (CropBox, else MediaBox).
    fn page_box(&self, page: PageId) -> Result<PageBox, PdfError>;
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] implementation backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    /// Total number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Extract string entries from the trailer's Info dictionary.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        let mut meta = BTreeMap::new();

        let Some(info_dict) = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|obj| self.resolve(obj).as_dict().ok())
        else {
            return meta;
        };

        let keys: &[&[u8]] = &[b"Title", b"Author", b"Creator", b"Producer"];

        for key in keys {
            if let Ok(obj) = info_dict.get(key) {
                let value = match self.resolve(obj) {
                    lopdf::Object::String(bytes, _) => decode_text_simple(bytes),
                    lopdf::Object::Name(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                    _ => continue,
                };
                meta.insert(String::from_utf8_lossy(key).into_owned(), value);
            }
        }

        meta
    }

    // -- private helpers ----------------------------------------------------

    /// Follow a single level of indirection.
    fn resolve<'a>(&'a self, obj: &'a lopdf::Object) -> &'a lopdf::Object {
        match obj {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            other => other,
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a lopdf::Object) -> Option<&'a lopdf::Dictionary> {
        match self.resolve(obj) {
            lopdf::Object::Dictionary(d) => Some(d),
            lopdf::Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Look up a page attribute, walking up the page tree for inheritable keys.
    ///
    /// A `/Parent` chain that loops back on itself ends the walk with `None`.
    fn inherited<'a>(&'a self, dict: &'a lopdf::Dictionary, key: &[u8]) -> Option<&'a lopdf::Object> {
        let mut node = dict;
        let mut already_seen = HashSet::new();

        loop {
            if let Ok(obj) = node.get(key) {
                return Some(self.resolve(obj));
            }
            let parent = node.get(b"Parent").ok()?;
            if let lopdf::Object::Reference(id) = parent {
                if !already_seen.insert(*id) {
                    return None;
                }
            }
            node = self.resolve_dict(parent)?;
        }
    }

    fn rect_of(&self, obj: &lopdf::Object) -> Option<PageBox> {
        let nums: Vec<f32> = obj
            .as_array()
            .ok()?
            .iter()
            .filter_map(|o| object_number(self.resolve(o)))
            .collect();
        if nums.len() < 4 {
            return None;
        }
        Some(PageBox {
            llx: nums[0].min(nums[2]),
            lly: nums[1].min(nums[3]),
            urx: nums[0].max(nums[2]),
            ury: nums[1].max(nums[3]),
        })
    }

    fn stream_bytes(&self, obj: &lopdf::Object) -> Option<Vec<u8>> {
        let stream = self.resolve(obj).as_stream().ok()?;
        Some(
            stream
                .decompressed_content()
                .unwrap_or_else(|_| stream.content.clone()),
        )
    }

    /// Build a [`FontInfo`] from a font dictionary.
    fn font_info(&self, name: &[u8], dict: &lopdf::Dictionary) -> FontInfo {
        let mut info = FontInfo {
            name: name.to_vec(),
            base_font: dict.get(b"BaseFont").ok().and_then(name_string),
            subtype: dict.get(b"Subtype").ok().and_then(name_string),
            encoding: dict
                .get(b"Encoding")
                .ok()
                .and_then(|o| name_string(self.resolve(o))),
            to_unicode: dict
                .get(b"ToUnicode")
                .ok()
                .and_then(|o| self.stream_bytes(o))
                .map(|bytes| parse_cmap(&bytes))
                .filter(|cmap| !cmap.is_empty()),
            ..Default::default()
        };

        if info.subtype.as_deref() == Some("Type0") {
            let descendant = dict
                .get(b"DescendantFonts")
                .ok()
                .and_then(|o| self.resolve(o).as_array().ok())
                .and_then(|arr| arr.first())
                .and_then(|o| self.resolve_dict(o));
            if let Some(cid_font) = descendant {
                info.default_width = Some(
                    cid_font
                        .get(b"DW")
                        .ok()
                        .and_then(object_number)
                        .unwrap_or(1000.0),
                );
                if let Some(w) = cid_font.get(b"W").ok().and_then(|o| self.resolve(o).as_array().ok()) {
                    info.widths = self.cid_widths(w);
                }
                info.descent = self.descent_of(cid_font);
            }
        } else {
            let first_char = dict
                .get(b"FirstChar")
                .ok()
                .and_then(object_number)
                .unwrap_or(0.0) as u32;
            if let Some(widths) = dict.get(b"Widths").ok().and_then(|o| self.resolve(o).as_array().ok()) {
                for (offset, w) in widths.iter().enumerate() {
                    let Some(code) = first_char.checked_add(offset as u32) else {
                        break;
                    };
                    if let Some(w) = object_number(self.resolve(w)) {
                        info.widths.insert(code, w);
                    }
                }
            }
            info.default_width = dict
                .get(b"FontDescriptor")
                .ok()
                .and_then(|o| self.resolve_dict(o))
                .and_then(|d| d.get(b"MissingWidth").ok())
                .and_then(object_number);
            info.descent = self.descent_of(dict);
        }

        info
    }

    fn descent_of(&self, font: &lopdf::Dictionary) -> Option<f32> {
        font.get(b"FontDescriptor")
            .ok()
            .and_then(|o| self.resolve_dict(o))
            .and_then(|d| d.get(b"Descent").ok())
            .and_then(|o| object_number(self.resolve(o)))
            .filter(|d| *d < 0.0)
    }

    /// Parse a CIDFont `/W` array: `c [w1 w2 ...]` or `c_first c_last w`.
    fn cid_widths(&self, w: &[lopdf::Object]) -> HashMap<u32, f32> {
        let mut widths = HashMap::new();
        let mut i = 0;

        while i < w.len() {
            let Some(first) = object_number(self.resolve(&w[i])) else {
                break;
            };
            let first = first as u32;
            match w.get(i + 1).map(|o| self.resolve(o)) {
                Some(lopdf::Object::Array(run)) => {
                    for (offset, width) in run.iter().enumerate() {
                        let Some(code) = first.checked_add(offset as u32) else {
                            break;
                        };
                        if let Some(width) = object_number(self.resolve(width)) {
                            widths.insert(code, width);
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let last = object_number(last).unwrap_or(first as f32) as u32;
                    let width = w.get(i + 2).and_then(|o| object_number(self.resolve(o)));
                    if let Some(width) = width {
                        for code in first..=last.min(first.saturating_add(0xFFFF)) {
                            widths.insert(code, width);
                        }
                    }
                    i += 3;
                }
                None => break,
            }
        }

        widths
    }
}

// ---------------------------------------------------------------------------
// PdfBackend implementation for LopdfBackend
// ---------------------------------------------------------------------------

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<FontInfo>, PdfError> {
        let fonts_map = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {}", e)))?;

        Ok(fonts_map
            .iter()
            .map(|(name, dict)| self.font_info(name, dict))
            .collect())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {}", e)))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn page_box(&self, page: PageId) -> Result<PageBox, PdfError> {
        let page_dict = self
            .doc
            .get_object(page)
            .and_then(|obj| obj.as_dict())
            .map_err(|e| PdfError::Parse(format!("page object is not a dictionary: {}", e)))?;

        let found = [b"CropBox".as_slice(), b"MediaBox".as_slice()]
            .iter()
            .find_map(|key| self.inherited(page_dict, key).and_then(|o| self.rect_of(o)));

        Ok(found.unwrap_or(PageBox::LETTER))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn decode_text_simple_utf8() {
        assert_eq!(decode_text_simple("02:15:00".as_bytes()), "02:15:00");
    }

    #[test]
    fn decode_text_simple_latin1() {
        // 0xE9 is U+00E9 in Latin-1 but not valid standalone UTF-8.
        let input: &[u8] = &[0x63, 0x61, 0x66, 0xE9];
        assert_eq!(decode_text_simple(input), "caf\u{00E9}");
    }

    #[test]
    fn decode_text_simple_utf16be_with_odd_trailing_byte() {
        let input: &[u8] = &[0xFE, 0xFF, 0x00, 0x41, 0x00];
        assert_eq!(decode_text_simple(input), "A");
    }

    #[test]
    fn get_number_accepts_integer_and_real() {
        assert_eq!(get_number_from_value(&PdfValue::Integer(42)), Some(42.0));
        assert_eq!(get_number_from_value(&PdfValue::Real(2.5)), Some(2.5));
        assert_eq!(get_number_from_value(&PdfValue::Name(b"F1".to_vec())), None);
    }

    #[test]
    fn convert_nested_array_in_dict() {
        let mut dict = lopdf::Dictionary::new();
        dict.set(
            "Box",
            lopdf::Object::Array(vec![
                lopdf::Object::Integer(0),
                lopdf::Object::Real(595.5),
            ]),
        );

        match convert_object(&lopdf::Object::Dictionary(dict)) {
            PdfValue::Dict(entries) => {
                assert_eq!(entries[0].0, b"Box");
                assert_eq!(
                    entries[0].1,
                    PdfValue::Array(vec![PdfValue::Integer(0), PdfValue::Real(595.5)])
                );
            }
            other => panic!("expected Dict, got {:?}", other),
        }
    }

    #[test]
    fn page_box_dimensions() {
        let b = PageBox {
            llx: 10.0,
            lly: 20.0,
            urx: 605.0,
            ury: 862.0,
        };
        assert_eq!(b.width(), 595.0);
        assert_eq!(b.height(), 842.0);
    }

    #[test]
    fn load_bytes_rejects_garbage() {
        assert!(matches!(
            LopdfBackend::load_bytes(b"definitely not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn cid_widths_both_forms() {
        let backend = LopdfBackend {
            doc: lopdf::Document::with_version("1.5"),
        };
        let w = vec![
            lopdf::Object::Integer(3),
            lopdf::Object::Array(vec![lopdf::Object::Integer(278), lopdf::Object::Integer(556)]),
            lopdf::Object::Integer(10),
            lopdf::Object::Integer(12),
            lopdf::Object::Integer(600),
        ];

        let widths = backend.cid_widths(&w);
        assert_eq!(widths.get(&3), Some(&278.0));
        assert_eq!(widths.get(&4), Some(&556.0));
        assert_eq!(widths.get(&11), Some(&600.0));
        assert_eq!(widths.len(), 5);
    }

    #[test]
    fn cid_widths_stop_at_code_overflow() {
        let backend = LopdfBackend {
            doc: lopdf::Document::with_version("1.5"),
        };
        let w = vec![
            lopdf::Object::Integer(u32::MAX as i64),
            lopdf::Object::Array(vec![lopdf::Object::Integer(278), lopdf::Object::Integer(556)]),
        ];

        let widths = backend.cid_widths(&w);
        assert_eq!(widths.get(&u32::MAX), Some(&278.0));
        assert_eq!(widths.len(), 1);
    }

    #[test]
    fn simple_font_widths_stop_at_code_overflow() {
        let backend = LopdfBackend {
            doc: lopdf::Document::with_version("1.5"),
        };
        let dict = lopdf::dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "FirstChar" => u32::MAX as i64,
            "Widths" => vec![500.into(), 500.into()],
        };

        let info = backend.font_info(b"F1", &dict);
        assert_eq!(info.widths.len(), 1);
    }

    /// A one-page document whose page names itself as `/Parent` and has no
    /// MediaBox anywhere.
    fn self_parented_page() -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.new_object_id();
        let content_id = doc.add_object(lopdf::Stream::new(lopdf::dictionary! {}, Vec::new()));

        doc.objects.insert(
            page_id,
            lopdf::Object::Dictionary(lopdf::dictionary! {
                "Type" => "Page",
                "Parent" => page_id,
                "Contents" => content_id,
            }),
        );
        doc.objects.insert(
            pages_id,
            lopdf::Object::Dictionary(lopdf::dictionary! {
                "Type" => "Pages",
                "Kids" => vec![lopdf::Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(lopdf::dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn page_box_survives_parent_cycle() {
        let backend = LopdfBackend::load_bytes(&self_parented_page()).unwrap();
        let page = *backend.pages().values().next().unwrap();
        assert_eq!(backend.page_box(page).unwrap(), PageBox::LETTER);
    }

    #[test]
    fn document_page_with_parent_cycle_returns() {
        let doc = crate::Document::from_bytes(&self_parented_page()).unwrap();
        assert_eq!(doc.page_count(), 1);
        // Either outcome is fine as long as the call comes back.
        let _ = doc.page(0);
    }
}
