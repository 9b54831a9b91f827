//! Manifest PDF fixtures built with lopdf.
//!
//! Text is set in a Type0 Identity-H font whose ToUnicode map covers exactly
//! the characters used, every glyph 1000 units wide at size 10.

#![allow(dead_code)]

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

pub const PAGE_HEIGHT: f64 = 595.0;
pub const FONT_SIZE: f64 = 10.0;

/// One text run placed with its baseline `baseline` units below the page top.
pub struct Cell {
    pub x: f64,
    pub baseline: f64,
    pub text: String,
}

pub fn cell(x: f64, baseline: f64, text: &str) -> Cell {
    Cell {
        x,
        baseline,
        text: text.to_string(),
    }
}

/// A passenger row laid out in fixed columns.
pub fn passenger_row(
    baseline: f64,
    seq: &str,
    resv: &str,
    name: &str,
    counts: [u32; 4],
    tail: &str,
) -> Vec<Cell> {
    let mut cells = vec![
        cell(30.0, baseline, seq),
        cell(60.0, baseline, resv),
        cell(170.0, baseline, name),
    ];
    for (i, count) in counts.iter().enumerate() {
        cells.push(cell(260.0 + 20.0 * i as f64, baseline, &count.to_string()));
    }
    cells.push(cell(350.0, baseline, tail));
    cells
}

/// The `合計人数` row with its four numbers in the headcount columns.
pub fn totals_row(baseline: f64, counts: [u32; 4]) -> Vec<Cell> {
    let mut cells = vec![cell(170.0, baseline, "合計人数")];
    for (i, count) in counts.iter().enumerate() {
        cells.push(cell(260.0 + 20.0 * i as f64, baseline, &count.to_string()));
    }
    cells
}

fn to_unicode_cmap(codes: &BTreeMap<char, u16>) -> Vec<u8> {
    let mut out = String::from(
        "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );
    out.push_str(&format!("{} beginbfchar\n", codes.len()));
    for (ch, code) in codes {
        let mut units = [0u16; 2];
        let encoded = ch.encode_utf16(&mut units);
        let hex: String = encoded.iter().map(|u| format!("{u:04X}")).collect();
        out.push_str(&format!("<{code:04X}> <{hex}>\n"));
    }
    out.push_str("endbfchar\nendcmap\nend\nend\n");
    out.into_bytes()
}

/// Build a PDF with one page per entry of `pages`.
pub fn manifest_pdf(pages: &[Vec<Cell>]) -> Vec<u8> {
    let mut codes: BTreeMap<char, u16> = BTreeMap::new();
    for page in pages {
        for c in page {
            for ch in c.text.chars() {
                let next = codes.len() as u16 + 1;
                codes.entry(ch).or_insert(next);
            }
        }
    }

    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let cmap_id = doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(&codes)));
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => "FixtureGothic",
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0,
        },
        "DW" => 1000,
    });
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "FixtureGothic",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font_id)],
        "ToUnicode" => cmap_id,
    });

    let mut kids = Vec::new();
    for page in pages {
        let mut operations = Vec::new();
        for c in page {
            let bytes: Vec<u8> = c
                .text
                .chars()
                .flat_map(|ch| codes[&ch].to_be_bytes())
                .collect();
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), (FONT_SIZE as i64).into()]),
                Operation::new(
                    "Td",
                    vec![
                        Object::Real(c.x as f32),
                        Object::Real((PAGE_HEIGHT - c.baseline) as f32),
                    ],
                ),
                Operation::new("Tj", vec![Object::String(bytes, StringFormat::Hexadecimal)]),
                Operation::new("ET", vec![]),
            ]);
        }
        let content = Content { operations }.encode().expect("encode content");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 842.into(), (PAGE_HEIGHT as i64).into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("failed to save test PDF");
    buf
}

/// Decoded content of every page of a PDF file, concatenated.
pub fn all_page_content(path: &std::path::Path) -> String {
    let doc = Document::load(path).expect("load PDF");
    let mut out = String::new();
    for (_, page_id) in doc.get_pages() {
        let bytes = doc.get_page_content(page_id).expect("page content");
        out.push_str(&String::from_utf8_lossy(&bytes));
        out.push('\n');
    }
    out
}
