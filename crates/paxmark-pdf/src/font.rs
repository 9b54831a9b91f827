//! Font decoding: shown-string bytes to glyphs with Unicode text and widths.
//!
//! Composite (Type0) fonts read two-byte codes, or Shift-JIS sequences for
//! the predefined `*-RKSJ-*` CMaps. Simple fonts read one byte per code and
//! fall back to Windows-1252 when no `/ToUnicode` map is present.

use std::collections::HashMap;

use encoding_rs::Encoding;
use lopdf::{Dictionary, Document, Object};

use crate::cmap::ToUnicodeMap;
use crate::source::{decode_stream, name_of, number_of, resolve_ref};

/// Width used when a font provides no metrics for a code.
const FALLBACK_SIMPLE_WIDTH: f64 = 500.0;
/// Default CID width (`/DW`) when a descendant font omits it.
const DEFAULT_CID_WIDTH: f64 = 1000.0;

/// Helvetica advance widths for codes 32..=126, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica width of one character in 1/1000 em; non-ASCII gets 556.
pub fn helvetica_char_width(ch: char) -> f64 {
    let code = ch as u32;
    if (32..=126).contains(&code) {
        f64::from(HELVETICA_ASCII[(code - 32) as usize])
    } else {
        556.0
    }
}

/// Width of `text` set in Helvetica at `size`, in user-space units.
pub fn helvetica_text_width(text: &str, size: f64) -> f64 {
    text.chars().map(helvetica_char_width).sum::<f64>() * size / 1000.0
}

/// One decoded glyph of a shown string.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub code: u32,
    pub text: String,
    /// Advance width in 1/1000 text-space units.
    pub width: f64,
    /// Whether word spacing applies (single-byte code 32).
    pub is_space_code: bool,
}

#[derive(Debug, Clone)]
enum Codes {
    /// Two bytes per code (Identity-H and other two-byte CMaps).
    TwoByte,
    /// Legacy multibyte encoding such as Shift-JIS.
    Legacy(&'static Encoding),
    /// One byte per code.
    Simple,
}

#[derive(Debug, Clone)]
enum Widths {
    Cid {
        default: f64,
        map: HashMap<u32, f64>,
    },
    Simple {
        first_char: u32,
        widths: Vec<f64>,
        standard: bool,
    },
}

/// Decoder for one font resource.
#[derive(Debug, Clone)]
pub struct FontDecoder {
    codes: Codes,
    to_unicode: Option<ToUnicodeMap>,
    widths: Widths,
}

impl Default for FontDecoder {
    /// A simple font with no metrics, used when a font resource is missing.
    fn default() -> Self {
        Self {
            codes: Codes::Simple,
            to_unicode: None,
            widths: Widths::Simple {
                first_char: 0,
                widths: Vec::new(),
                standard: false,
            },
        }
    }
}

/// Predefined CMap names whose codes are Shift-JIS byte sequences.
fn legacy_encoding(cmap_name: &str) -> Option<&'static Encoding> {
    if cmap_name.contains("RKSJ") {
        Some(encoding_rs::SHIFT_JIS)
    } else if cmap_name.starts_with("EUC-") {
        Some(encoding_rs::EUC_JP)
    } else {
        None
    }
}

fn is_lead_byte(byte: u8, encoding: &'static Encoding) -> bool {
    if encoding == encoding_rs::SHIFT_JIS {
        (0x81..=0x9F).contains(&byte) || (0xE0..=0xFC).contains(&byte)
    } else {
        (0xA1..=0xFE).contains(&byte) || byte == 0x8E
    }
}

/// Parse a CIDFont `/W` array.
///
/// Two forms are accepted: `c [w1 w2 ...]` assigns consecutive widths from
/// CID `c`, and `c_first c_last w` assigns `w` to the whole range.
fn parse_w_array(doc: &Document, items: &[Object]) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < items.len() {
        let Some(start) = number_of(doc, &items[i]) else {
            i += 1;
            continue;
        };
        let start = start as u32;
        let Some(next) = items.get(i + 1).map(|o| resolve_ref(doc, o)) else {
            break;
        };
        if let Ok(list) = next.as_array() {
            for (j, w) in list.iter().enumerate() {
                if let Some(w) = number_of(doc, w) {
                    widths.insert(start + j as u32, w);
                }
            }
            i += 2;
        } else if let Some(end) = number_of(doc, next) {
            if let Some(w) = items.get(i + 2).and_then(|o| number_of(doc, o)) {
                for cid in start..=end as u32 {
                    widths.insert(cid, w);
                }
            }
            i += 3;
        } else {
            i += 2;
        }
    }
    widths
}

fn load_to_unicode(doc: &Document, font: &Dictionary) -> Option<ToUnicodeMap> {
    let stream = font
        .get(b"ToUnicode")
        .ok()
        .map(|o| resolve_ref(doc, o))
        .and_then(|o| o.as_stream().ok())?;
    let bytes = decode_stream(stream).ok()?;
    match ToUnicodeMap::parse(&bytes) {
        Ok(map) => Some(map),
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unreadable ToUnicode map");
            None
        }
    }
}

impl FontDecoder {
    /// Build a decoder from a font dictionary.
    pub fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        let to_unicode = load_to_unicode(doc, font);
        let subtype = font.get(b"Subtype").ok().and_then(name_of);

        if subtype.as_deref() == Some("Type0") {
            let encoding = font.get(b"Encoding").ok().and_then(name_of).unwrap_or_default();
            let codes = match legacy_encoding(&encoding) {
                Some(enc) => Codes::Legacy(enc),
                None => Codes::TwoByte,
            };
            let descendant = font
                .get(b"DescendantFonts")
                .ok()
                .map(|o| resolve_ref(doc, o))
                .and_then(|o| o.as_array().ok())
                .and_then(|a| a.first())
                .map(|o| resolve_ref(doc, o))
                .and_then(|o| o.as_dict().ok());
            let default = descendant
                .and_then(|d| d.get(b"DW").ok())
                .and_then(|o| number_of(doc, o))
                .unwrap_or(DEFAULT_CID_WIDTH);
            let map = descendant
                .and_then(|d| d.get(b"W").ok())
                .map(|o| resolve_ref(doc, o))
                .and_then(|o| o.as_array().ok())
                .map(|items| parse_w_array(doc, items))
                .unwrap_or_default();
            return Self {
                codes,
                to_unicode,
                widths: Widths::Cid { default, map },
            };
        }

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| number_of(doc, o))
            .unwrap_or(0.0) as u32;
        let widths = font
            .get(b"Widths")
            .ok()
            .map(|o| resolve_ref(doc, o))
            .and_then(|o| o.as_array().ok())
            .map(|items| {
                items
                    .iter()
                    .map(|o| number_of(doc, o).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();
        let standard = font
            .get(b"BaseFont")
            .ok()
            .and_then(name_of)
            .is_some_and(|n| n.starts_with("Helvetica") || n.starts_with("Arial"));
        Self {
            codes: Codes::Simple,
            to_unicode,
            widths: Widths::Simple {
                first_char,
                widths,
                standard,
            },
        }
    }

    fn width_of(&self, code: u32, byte_len: usize) -> f64 {
        match &self.widths {
            Widths::Cid { default, map } => match self.codes {
                // Legacy codes are not CIDs; approximate half/full width.
                Codes::Legacy(_) => {
                    if byte_len == 1 {
                        500.0
                    } else {
                        1000.0
                    }
                }
                _ => map.get(&code).copied().unwrap_or(*default),
            },
            Widths::Simple {
                first_char,
                widths,
                standard,
            } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied()
                .filter(|w| *w > 0.0)
                .or_else(|| {
                    standard
                        .then(|| char::from_u32(code).map(helvetica_char_width))
                        .flatten()
                })
                .unwrap_or(FALLBACK_SIMPLE_WIDTH),
        }
    }

    fn text_of(&self, code: u32, bytes: &[u8]) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|m| m.lookup(code)) {
            return text.to_string();
        }
        match self.codes {
            Codes::Legacy(enc) => enc.decode_without_bom_handling(bytes).0.into_owned(),
            Codes::Simple => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
            Codes::TwoByte => "\u{FFFD}".to_string(),
        }
    }

    /// Split a shown string into glyphs.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        let mut glyphs = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            let len = match self.codes {
                Codes::TwoByte => 2.min(bytes.len() - i),
                Codes::Legacy(enc) => {
                    if is_lead_byte(bytes[i], enc) && i + 1 < bytes.len() {
                        2
                    } else {
                        1
                    }
                }
                Codes::Simple => 1,
            };
            let chunk = &bytes[i..i + len];
            let code = chunk.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
            glyphs.push(Glyph {
                code,
                text: self.text_of(code, chunk),
                width: self.width_of(code, len),
                is_space_code: len == 1 && code == 32,
            });
            i += len;
        }
        glyphs
    }
}
