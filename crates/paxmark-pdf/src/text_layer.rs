//! Content-stream walker producing word-level positioned fragments.
//!
//! Tracks the graphics and text state needed to place glyphs (CTM, text and
//! line matrices, font, size, spacing, scaling, rise) and groups glyphs into
//! words. A word ends at whitespace, at a large negative `TJ` adjustment, or
//! when the next glyph starts on another baseline or after a visible gap.
//! Output coordinates use a top-left origin relative to the MediaBox.

use std::collections::HashMap;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use paxmark_core::{BBox, PositionedFragment};

use crate::error::BackendError;
use crate::font::FontDecoder;
use crate::source::{number_of, page_content, page_resources, resolve_inherited, resolve_ref};

/// Fraction of the font size above the baseline.
const ASCENT: f64 = 0.88;
/// Fraction of the font size below the baseline.
const DESCENT: f64 = 0.12;
/// `TJ` adjustment (thousandths of an em) treated as a word break.
const TJ_BREAK: f64 = -250.0;
/// Horizontal gap, as a fraction of the font size, that splits words.
const GAP_BREAK: f64 = 0.3;

/// Placement of the page in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    /// MediaBox left edge.
    pub left: f64,
    /// MediaBox top edge.
    pub top: f64,
}

impl PageFrame {
    /// Convert a top-left-origin point back to PDF user space.
    pub fn to_user(&self, x: f64, y: f64) -> (f64, f64) {
        (self.left + x, self.top - y)
    }
}

impl Default for PageFrame {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 792.0,
        }
    }
}

type Matrix = [f64; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

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

fn translate(tx: f64, ty: f64) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

fn apply(m: &Matrix, x: f64, y: f64) -> (f64, f64) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<Vec<u8>>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    horizontal_scale: f64,
    leading: f64,
    rise: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// A word being assembled, in top-left page coordinates.
#[derive(Debug)]
struct PendingWord {
    text: String,
    bbox: BBox,
    baseline: f64,
    size: f64,
}

#[derive(Default)]
struct WordBuilder {
    pending: Option<PendingWord>,
    done: Vec<PositionedFragment>,
}

impl WordBuilder {
    fn flush(&mut self) {
        if let Some(word) = self.pending.take() {
            self.done.push(PositionedFragment::new(word.text, word.bbox));
        }
    }

    fn push(&mut self, text: &str, bbox: BBox, baseline: f64, size: f64) {
        if text.trim().is_empty() {
            self.flush();
            return;
        }
        let breaks = self.pending.as_ref().is_some_and(|word| {
            let tolerance = word.size.max(size);
            (baseline - word.baseline).abs() > tolerance * 0.5
                || bbox.x0 - word.bbox.x1 > tolerance * GAP_BREAK
                || bbox.x0 < word.bbox.x1 - tolerance
        });
        if breaks {
            self.flush();
        }
        match self.pending.as_mut() {
            Some(word) => {
                word.text.push_str(text);
                word.bbox = word.bbox.union(&bbox);
            }
            None => {
                self.pending = Some(PendingWord {
                    text: text.to_string(),
                    bbox,
                    baseline,
                    size,
                })
            }
        }
    }

    fn finish(mut self) -> Vec<PositionedFragment> {
        self.flush();
        self.done
    }
}

struct Walker<'a> {
    doc: &'a Document,
    font_resources: Option<&'a Dictionary>,
    fonts: HashMap<Vec<u8>, FontDecoder>,
    frame: PageFrame,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    tm: Matrix,
    tlm: Matrix,
    words: WordBuilder,
}

fn operand(op: &Operation, i: usize) -> f64 {
    match op.operands.get(i) {
        Some(Object::Integer(v)) => *v as f64,
        Some(Object::Real(v)) => f64::from(*v),
        _ => 0.0,
    }
}

fn matrix_operands(op: &Operation) -> Matrix {
    [
        operand(op, 0),
        operand(op, 1),
        operand(op, 2),
        operand(op, 3),
        operand(op, 4),
        operand(op, 5),
    ]
}

impl<'a> Walker<'a> {
    fn decoder(&mut self) -> FontDecoder {
        let Some(name) = self.state.font.clone() else {
            return FontDecoder::default();
        };
        if let Some(decoder) = self.fonts.get(&name) {
            return decoder.clone();
        }
        let decoder = self
            .font_resources
            .and_then(|fonts| fonts.get(&name).ok())
            .map(|o| resolve_ref(self.doc, o))
            .and_then(|o| o.as_dict().ok())
            .map(|dict| FontDecoder::from_dict(self.doc, dict))
            .unwrap_or_default();
        self.fonts.insert(name, decoder.clone());
        decoder
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.tlm = multiply(&translate(tx, ty), &self.tlm);
        self.tm = self.tlm;
    }

    fn show(&mut self, bytes: &[u8]) {
        let decoder = self.decoder();
        let s = &self.state;
        let (size, scale, rise) = (s.size, s.horizontal_scale, s.rise);
        let (tc, tw) = (s.char_spacing, s.word_spacing);
        for glyph in decoder.decode(bytes) {
            let m = multiply(&self.tm, &self.state.ctm);
            let advance = glyph.width / 1000.0 * size * scale;
            let (sx, sy) = apply(&m, 0.0, rise);
            let (ex, _) = apply(&m, advance, rise);
            let effective = size * m[2].hypot(m[3]);
            let baseline = self.frame.top - sy;
            let bbox = BBox::new(
                sx.min(ex) - self.frame.left,
                baseline - ASCENT * effective,
                sx.max(ex) - self.frame.left,
                baseline + DESCENT * effective,
            );
            self.words.push(&glyph.text, bbox, baseline, effective);

            let spacing = tc + if glyph.is_space_code { tw } else { 0.0 };
            let tx = (glyph.width / 1000.0 * size + spacing) * scale;
            self.tm = multiply(&translate(tx, 0.0), &self.tm);
        }
    }

    fn adjust(&mut self, amount: f64) {
        if amount <= TJ_BREAK {
            self.words.flush();
        }
        let tx = -amount / 1000.0 * self.state.size * self.state.horizontal_scale;
        self.tm = multiply(&translate(tx, 0.0), &self.tm);
    }

    fn run(&mut self, op: &Operation) {
        match op.operator.as_str() {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(state) = self.stack.pop() {
                    self.state = state;
                }
            }
            "cm" => self.state.ctm = multiply(&matrix_operands(op), &self.state.ctm),
            "BT" => {
                self.tm = IDENTITY;
                self.tlm = IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = op.operands.first() {
                    self.state.font = Some(name.clone());
                }
                self.state.size = operand(op, 1);
            }
            "Tc" => self.state.char_spacing = operand(op, 0),
            "Tw" => self.state.word_spacing = operand(op, 0),
            "Tz" => self.state.horizontal_scale = operand(op, 0) / 100.0,
            "TL" => self.state.leading = operand(op, 0),
            "Ts" => self.state.rise = operand(op, 0),
            "Td" => self.move_line(operand(op, 0), operand(op, 1)),
            "TD" => {
                self.state.leading = -operand(op, 1);
                self.move_line(operand(op, 0), operand(op, 1));
            }
            "Tm" => {
                self.tlm = matrix_operands(op);
                self.tm = self.tlm;
            }
            "T*" => self.move_line(0.0, -self.state.leading),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.move_line(0.0, -self.state.leading);
                if let Some(Object::String(bytes, _)) = op.operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                self.state.word_spacing = operand(op, 0);
                self.state.char_spacing = operand(op, 1);
                self.move_line(0.0, -self.state.leading);
                if let Some(Object::String(bytes, _)) = op.operands.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            Object::Integer(v) => self.adjust(*v as f64),
                            Object::Real(v) => self.adjust(f64::from(*v)),
                            _ => {}
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Coordinate frame of a page from its (possibly inherited) MediaBox.
pub fn page_frame(doc: &Document, page_id: ObjectId) -> Result<PageFrame, BackendError> {
    let Some(media_box) = resolve_inherited(doc, page_id, b"MediaBox")? else {
        return Ok(PageFrame::default());
    };
    let values: Vec<f64> = resolve_ref(doc, media_box)
        .as_array()
        .map_err(|e| BackendError::Parse(format!("invalid /MediaBox: {e}")))?
        .iter()
        .filter_map(|o| number_of(doc, o))
        .collect();
    if values.len() != 4 {
        return Err(BackendError::Parse(format!(
            "expected 4-element /MediaBox, got {}",
            values.len()
        )));
    }
    Ok(PageFrame {
        left: values[0].min(values[2]),
        top: values[1].max(values[3]),
    })
}

/// Extract word fragments of one page.
pub fn extract_fragments(
    doc: &Document,
    page_id: ObjectId,
) -> Result<(Vec<PositionedFragment>, PageFrame), BackendError> {
    let frame = page_frame(doc, page_id)?;
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;
    let bytes = page_content(doc, page)?;
    let content = Content::decode(&bytes)
        .map_err(|e| BackendError::Parse(format!("failed to decode content stream: {e}")))?;

    let resources = page_resources(doc, page_id)?;
    let font_resources = resources
        .get(b"Font")
        .ok()
        .map(|o| resolve_ref(doc, o))
        .and_then(|o| o.as_dict().ok());

    let mut walker = Walker {
        doc,
        font_resources,
        fonts: HashMap::new(),
        frame,
        state: GraphicsState::default(),
        stack: Vec::new(),
        tm: IDENTITY,
        tlm: IDENTITY,
        words: WordBuilder::default(),
    };
    for op in &content.operations {
        walker.run(op);
    }
    let fragments = walker.words.finish();
    tracing::debug!(page = ?page_id, fragments = fragments.len(), "extracted page text");
    Ok((fragments, frame))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_multiply_applies_translation_after_scale() {
        let m = multiply(&[2.0, 0.0, 0.0, 2.0, 0.0, 0.0], &translate(10.0, 20.0));
        assert_eq!(apply(&m, 1.0, 1.0), (12.0, 22.0));
    }

    #[test]
    fn frame_converts_back_to_user_space() {
        let frame = PageFrame {
            left: 0.0,
            top: 842.0,
        };
        assert_eq!(frame.to_user(100.0, 42.0), (100.0, 800.0));
    }

    #[test]
    fn words_split_on_whitespace_and_gaps() {
        let mut words = WordBuilder::default();
        let bbox = |x0: f64| BBox::new(x0, 0.0, x0 + 5.0, 10.0);
        words.push("A", bbox(0.0), 9.0, 10.0);
        words.push("B", bbox(5.0), 9.0, 10.0);
        words.push(" ", bbox(10.0), 9.0, 10.0);
        words.push("C", bbox(15.0), 9.0, 10.0);
        words.push("D", bbox(40.0), 9.0, 10.0);
        let out = words.finish();
        let texts: Vec<&str> = out.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, ["AB", "C", "D"]);
        assert_eq!(out[0].bbox.x1, 10.0);
    }

    #[test]
    fn words_split_on_baseline_change() {
        let mut words = WordBuilder::default();
        words.push("A", BBox::new(0.0, 0.0, 5.0, 10.0), 9.0, 10.0);
        words.push("B", BBox::new(5.0, 20.0, 10.0, 30.0), 29.0, 10.0);
        assert_eq!(words.finish().len(), 2);
    }
}
