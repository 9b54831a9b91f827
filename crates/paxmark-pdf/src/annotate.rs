//! Working-copy annotation.
//!
//! A [`WorkingCopy`] pairs the pristine source with its `<stem>_marked<ext>`
//! copy. Marks are collected per page as vector overlays and written on
//! [`WorkingCopy::save`]; the original page content is wrapped in `q`/`Q`
//! so overlays always draw in unscaled page space. Text positions are read
//! from the pristine page, never from previously marked output.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use paxmark_core::{
    BBox, Headcount, LineOptions, PositionedFragment, StatusValue, normalize, reconstruct,
};
use tracing::{debug, info, warn};

use crate::error::BackendError;
use crate::font::helvetica_text_width;
use crate::source::{SourceDocument, page_resources, resolve_ref};
use crate::text_layer::PageFrame;

/// Label of the totals row on the last page of a flight.
pub const TOTALS_LABEL: &str = "合計人数";
/// Resource name of the Helvetica font added for overlay text.
const OVERLAY_FONT: &str = "PxHelv";
/// Bézier control distance for a quarter circle.
const KAPPA: f64 = 0.552_284_75;

/// Visual parameters of the marks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkStyle {
    /// Horizontal offset of the status label centre from the reservation id.
    pub label_offset_x: f64,
    /// Vertical offset of the status label from the reservation id centre.
    pub label_offset_y: f64,
    pub label_font_size: f64,
    pub numeral_font_size: f64,
    pub line_width: f64,
    /// Extra length added on both ends of a strike-through.
    pub line_margin: f64,
}

impl Default for MarkStyle {
    fn default() -> Self {
        Self {
            label_offset_x: -25.0,
            label_offset_y: -2.0,
            label_font_size: 20.0,
            numeral_font_size: 10.0,
            line_width: 0.8,
            line_margin: 1.5,
        }
    }
}

/// What to draw for one passenger.
#[derive(Debug, Clone, PartialEq)]
pub struct PassengerMark<'a> {
    pub page_index: usize,
    pub reservation_id: &'a str,
    pub status: StatusValue,
    /// Current (after) headcount; zero for no-shows and total cancellations.
    pub after: Headcount,
}

/// Result of marking the totals row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalsOutcome {
    /// No totals row with four numbers on the page.
    RowNotFound,
    /// At least one printed total differed and was replaced.
    Rewritten,
    /// All printed totals matched; the grand total was circled.
    Confirmed,
}

fn reservation_anchor(fragments: &[PositionedFragment], reservation_id: &str) -> Option<BBox> {
    fragments
        .iter()
        .find(|f| normalize(&f.text).contains(reservation_id))
        .map(|f| f.bbox)
}

/// Path of the working copy for a pristine file: `<stem>_marked<ext>`.
pub fn working_path_for(pristine: &Path) -> PathBuf {
    let stem = pristine
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match pristine.extension() {
        Some(ext) => format!("{stem}_marked.{}", ext.to_string_lossy()),
        None => format!("{stem}_marked"),
    };
    pristine.with_file_name(name)
}

/// A mutable annotated copy of a pristine document.
pub struct WorkingCopy {
    pristine: SourceDocument,
    path: PathBuf,
    doc: Document,
    created: bool,
    style: MarkStyle,
    page_text: HashMap<usize, (Vec<PositionedFragment>, PageFrame)>,
    overlays: BTreeMap<usize, Vec<Operation>>,
}

impl WorkingCopy {
    /// Open the working copy of `pristine`, creating it by copying the
    /// pristine file when it does not exist yet.
    pub fn open(pristine: impl AsRef<Path>, style: MarkStyle) -> Result<Self, BackendError> {
        let pristine_path = pristine.as_ref();
        let source = SourceDocument::open(pristine_path)?;
        let path = working_path_for(pristine_path);
        let created = !path.exists();
        if created {
            fs::copy(pristine_path, &path)?;
            info!(path = %path.display(), "created working copy");
        }
        let doc = Document::load(&path)
            .map_err(|e| BackendError::Parse(format!("failed to load {}: {e}", path.display())))?;
        Ok(Self {
            pristine: source,
            path,
            doc,
            created,
            style,
            page_text: HashMap::new(),
            overlays: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn pristine(&self) -> &SourceDocument {
        &self.pristine
    }

    /// Whether the working copy was created by this `open`.
    pub fn is_new(&self) -> bool {
        self.created
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    fn working_page_id(&self, page_index: usize) -> Result<ObjectId, BackendError> {
        let pages = self.doc.get_pages();
        pages
            .get(&(page_index as u32 + 1))
            .copied()
            .ok_or(BackendError::PageOutOfRange {
                index: page_index,
                count: pages.len(),
            })
    }

    /// Replace a page of the working copy with the pristine page verbatim,
    /// dropping any overlay queued for it.
    pub fn reset_page(&mut self, page_index: usize) -> Result<(), BackendError> {
        let pristine_id = self.pristine.page_id(page_index)?;
        let working_id = self.working_page_id(page_index)?;
        if pristine_id != working_id {
            return Err(BackendError::PageMismatch { index: page_index });
        }
        let page = self.pristine.document().get_object(pristine_id)?.clone();
        self.doc.objects.insert(working_id, page);
        self.overlays.remove(&page_index);
        info!(page = page_index + 1, "reset page from pristine source");
        Ok(())
    }

    fn pristine_text(
        &mut self,
        page_index: usize,
    ) -> Result<(Vec<PositionedFragment>, PageFrame), BackendError> {
        if let Some(cached) = self.page_text.get(&page_index) {
            return Ok(cached.clone());
        }
        let text = self.pristine.page_text(page_index)?;
        self.page_text.insert(page_index, text.clone());
        Ok(text)
    }

    /// Whether the pristine text of a page carries `reservation_id`.
    pub fn has_reservation(
        &mut self,
        page_index: usize,
        reservation_id: &str,
    ) -> Result<bool, BackendError> {
        let (fragments, _) = self.pristine_text(page_index)?;
        Ok(reservation_anchor(&fragments, reservation_id).is_some())
    }

    /// Queue the label, strike-throughs and replacement numerals of one
    /// passenger. Returns `false` when the reservation id is not on the page.
    pub fn mark_passenger(&mut self, mark: &PassengerMark<'_>) -> Result<bool, BackendError> {
        if !mark.status.is_set() {
            return Ok(false);
        }
        let (fragments, frame) = self.pristine_text(mark.page_index)?;
        let Some(anchor) = reservation_anchor(&fragments, mark.reservation_id) else {
            warn!(
                page = mark.page_index + 1,
                resv = mark.reservation_id,
                "reservation id not found on page; skipping marks"
            );
            return Ok(false);
        };

        let style = self.style;
        let mut ops = Vec::new();

        let label = mark.status.code();
        let width = helvetica_text_width(label, style.label_font_size);
        let x = anchor.x0 + style.label_offset_x - width / 2.0;
        let y = anchor.mid_y() + style.label_offset_y - style.label_font_size * 0.4 / 2.0;
        push_text(&mut ops, &frame, x, y, style.label_font_size, label);

        let digits = headcount_boxes(&fragments, &anchor);
        let partial = mark.status.is_cancellation() && mark.after.category_sum() > 0;
        let after = mark.after.as_array();
        for (i, (bbox, printed)) in digits.iter().take(4).enumerate() {
            if *printed == 0 {
                continue;
            }
            if !partial {
                push_strike(&mut ops, &frame, &style, bbox);
                continue;
            }
            if after[i] != *printed {
                push_strike(&mut ops, &frame, &style, bbox);
                let nx = bbox.x0 - style.line_margin * 3.0;
                let ny = bbox.mid_y() - 4.0;
                push_text(&mut ops, &frame, nx, ny, style.numeral_font_size, &after[i].to_string());
            }
        }
        if digits.len() < 4 {
            warn!(
                page = mark.page_index + 1,
                resv = mark.reservation_id,
                found = digits.len(),
                "fewer than four headcount numbers next to reservation id"
            );
        }

        debug!(
            page = mark.page_index + 1,
            resv = mark.reservation_id,
            status = label,
            ops = ops.len(),
            "queued passenger marks"
        );
        self.overlays.entry(mark.page_index).or_default().extend(ops);
        Ok(true)
    }

    /// Compare the totals row with the flight totals: differing numbers are
    /// struck and replaced, and when all four match the total is circled.
    pub fn mark_totals(
        &mut self,
        page_index: usize,
        totals: Headcount,
    ) -> Result<TotalsOutcome, BackendError> {
        let (fragments, frame) = self.pristine_text(page_index)?;
        let tokens = totals_tokens(&fragments);
        if tokens.len() < 4 {
            info!(page = page_index + 1, "no totals row found");
            return Ok(TotalsOutcome::RowNotFound);
        }

        let style = self.style;
        let mut ops = Vec::new();
        let after = totals.as_array();
        let mut all_same = true;
        for (i, (bbox, text)) in tokens.iter().take(4).enumerate() {
            let printed: Option<u32> = text.parse().ok();
            if printed == Some(after[i]) {
                continue;
            }
            all_same = false;
            push_strike(&mut ops, &frame, &style, bbox);
            let value = after[i].to_string();
            push_text(&mut ops, &frame, bbox.x1 + 6.0, bbox.mid_y() - 4.0, style.numeral_font_size, &value);
        }

        let outcome = if all_same {
            let (bbox, text) = &tokens[3];
            let radius = (text.chars().count() as f64 * 3.0).max(6.0);
            push_circle(&mut ops, &frame, bbox.mid_x(), bbox.mid_y(), radius);
            info!(page = page_index + 1, "totals unchanged; circled grand total");
            TotalsOutcome::Confirmed
        } else {
            info!(page = page_index + 1, ?totals, "rewrote totals row");
            TotalsOutcome::Rewritten
        };
        self.overlays.entry(page_index).or_default().extend(ops);
        Ok(outcome)
    }

    fn flush_overlays(&mut self) -> Result<(), BackendError> {
        if self.overlays.is_empty() {
            return Ok(());
        }
        let font_id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let overlays = std::mem::take(&mut self.overlays);
        for (page_index, operations) in overlays {
            if operations.is_empty() {
                continue;
            }
            let page_id = self.working_page_id(page_index)?;
            self.attach_overlay(page_id, font_id, operations)?;
        }
        Ok(())
    }

    fn attach_overlay(
        &mut self,
        page_id: ObjectId,
        font_id: ObjectId,
        operations: Vec<Operation>,
    ) -> Result<(), BackendError> {
        // Shared resource dictionaries are copied onto the page, never edited.
        let mut resources = page_resources(&self.doc, page_id)?;
        let mut fonts = resources
            .get(b"Font")
            .ok()
            .map(|o| resolve_ref(&self.doc, o))
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default();
        fonts.set(OVERLAY_FONT, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(fonts));

        let existing: Vec<Object> = match self.doc.get_object(page_id)?.as_dict()?.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(other) => vec![other.clone()],
            Err(_) => Vec::new(),
        };

        let overlay = Content { operations }.encode()?;
        let push_id = self.doc.add_object(Stream::new(dictionary! {}, b"q".to_vec()));
        let pop_id = self.doc.add_object(Stream::new(dictionary! {}, b"Q".to_vec()));
        let overlay_id = self.doc.add_object(Stream::new(dictionary! {}, overlay));

        let mut contents = Vec::with_capacity(existing.len() + 3);
        contents.push(Object::Reference(push_id));
        contents.extend(existing);
        contents.push(Object::Reference(pop_id));
        contents.push(Object::Reference(overlay_id));

        let page = self.doc.get_object_mut(page_id)?.as_dict_mut()?;
        page.set("Contents", Object::Array(contents));
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    /// Write queued overlays and save to `<working>.tmp`, then rename over
    /// the working copy.
    pub fn save(&mut self) -> Result<(), BackendError> {
        self.flush_overlays()?;
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp = PathBuf::from(tmp_name);
        {
            let mut file = fs::File::create(&tmp)?;
            self.doc.save_to(&mut file)?;
        }
        fs::rename(&tmp, &self.path)?;
        info!(path = %self.path.display(), "saved working copy");
        Ok(())
    }
}

fn digits_of(text: &str) -> Option<String> {
    let text = normalize(text);
    (!text.is_empty() && text.chars().all(|c| c.is_ascii_digit())).then_some(text)
}

/// Number boxes right of the reservation id on the same row, left to right.
///
/// A single four-digit token is split into four one-digit boxes so that
/// headcounts printed without spacing still line up with their categories.
fn headcount_boxes(fragments: &[PositionedFragment], anchor: &BBox) -> Vec<(BBox, u32)> {
    let mut numbers: Vec<(BBox, String)> = fragments
        .iter()
        .filter(|f| f.bbox.x0 > anchor.x1 + 2.0 && (f.bbox.mid_y() - anchor.mid_y()).abs() < 6.0)
        .filter_map(|f| digits_of(&f.text).map(|d| (f.bbox, d)))
        .collect();
    numbers.sort_by(|a, b| a.0.x0.partial_cmp(&b.0.x0).unwrap_or(std::cmp::Ordering::Equal));

    if let Some((bbox, text)) = numbers.first() {
        if text.len() == 4 {
            return bbox
                .split_horizontal(4)
                .into_iter()
                .zip(text.chars())
                .map(|(b, c)| (b, c.to_digit(10).unwrap_or(0)))
                .collect();
        }
    }
    numbers
        .into_iter()
        .map(|(bbox, text)| (bbox, text.parse().unwrap_or(0)))
        .collect()
}

/// Number tokens following the totals label, left to right.
fn totals_tokens(fragments: &[PositionedFragment]) -> Vec<(BBox, String)> {
    for line in reconstruct(fragments, &LineOptions::default()) {
        if !normalize(&line.text()).contains(TOTALS_LABEL) {
            continue;
        }
        let mut seen = String::new();
        let mut tokens = Vec::new();
        for fragment in &line.fragments {
            if !seen.contains(TOTALS_LABEL) {
                seen.push_str(&normalize(&fragment.text));
                continue;
            }
            if let Some(digits) = digits_of(&fragment.text) {
                tokens.push((fragment.bbox, digits));
            }
        }
        return tokens;
    }
    Vec::new()
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn push_strike(ops: &mut Vec<Operation>, frame: &PageFrame, style: &MarkStyle, bbox: &BBox) {
    let y = bbox.mid_y();
    let (x0, y0) = frame.to_user(bbox.x0 - style.line_margin, y);
    let (x1, y1) = frame.to_user(bbox.x1 + style.line_margin, y);
    ops.extend([
        Operation::new("q", vec![]),
        Operation::new("RG", vec![1.into(), 0.into(), 0.into()]),
        Operation::new("w", vec![real(style.line_width)]),
        Operation::new("m", vec![real(x0), real(y0)]),
        Operation::new("l", vec![real(x1), real(y1)]),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
    ]);
}

fn push_text(ops: &mut Vec<Operation>, frame: &PageFrame, x: f64, y: f64, size: f64, text: &str) {
    let (ux, uy) = frame.to_user(x, y);
    ops.extend([
        Operation::new("BT", vec![]),
        Operation::new("rg", vec![1.into(), 0.into(), 0.into()]),
        Operation::new("Tf", vec![Object::Name(OVERLAY_FONT.as_bytes().to_vec()), real(size)]),
        Operation::new("Td", vec![real(ux), real(uy)]),
        Operation::new(
            "Tj",
            vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
    ]);
}

fn push_circle(ops: &mut Vec<Operation>, frame: &PageFrame, cx: f64, cy: f64, r: f64) {
    let (cx, cy) = frame.to_user(cx, cy);
    let k = r * KAPPA;
    let curve = |pts: [f64; 6]| Operation::new("c", pts.iter().map(|v| real(*v)).collect());
    ops.extend([
        Operation::new("q", vec![]),
        Operation::new("RG", vec![1.into(), 0.into(), 0.into()]),
        Operation::new("w", vec![real(1.2)]),
        Operation::new("m", vec![real(cx + r), real(cy)]),
        curve([cx + r, cy + k, cx + k, cy + r, cx, cy + r]),
        curve([cx - k, cy + r, cx - r, cy + k, cx - r, cy]),
        curve([cx - r, cy - k, cx - k, cy - r, cx, cy - r]),
        curve([cx + k, cy - r, cx + r, cy - k, cx + r, cy]),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
    ]);
}
