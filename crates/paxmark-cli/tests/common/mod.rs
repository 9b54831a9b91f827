//! Manifest PDFs for the command-line tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};

const HEIGHT: f32 = 595.0;

/// Pages of `(x, baseline-from-top, text)` runs.
#[derive(Default)]
pub struct ManifestBuilder {
    pages: Vec<Vec<(f32, f32, String)>>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new page.
    pub fn page(mut self) -> Self {
        self.pages.push(Vec::new());
        self
    }

    pub fn text(mut self, x: f32, baseline: f32, text: &str) -> Self {
        self.pages
            .last_mut()
            .expect("call page() first")
            .push((x, baseline, text.to_string()));
        self
    }

    pub fn passenger(self, baseline: f32, resv: &str, name: &str, counts: [u32; 4], tail: &str) -> Self {
        let mut b = self
            .text(60.0, baseline, resv)
            .text(170.0, baseline, name);
        for (i, n) in counts.iter().enumerate() {
            b = b.text(260.0 + 20.0 * i as f32, baseline, &n.to_string());
        }
        b.text(350.0, baseline, tail)
    }

    pub fn totals(self, baseline: f32, counts: [u32; 4]) -> Self {
        let mut b = self.text(170.0, baseline, "合計人数");
        for (i, n) in counts.iter().enumerate() {
            b = b.text(260.0 + 20.0 * i as f32, baseline, &n.to_string());
        }
        b
    }

    pub fn write(&self, path: &Path) {
        let mut cids: BTreeMap<char, u16> = BTreeMap::new();
        for (_, _, text) in self.pages.iter().flatten() {
            for ch in text.chars() {
                let next = cids.len() as u16 + 1;
                cids.entry(ch).or_insert(next);
            }
        }

        let mut cmap = format!(
            "begincmap\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n{} beginbfchar\n",
            cids.len()
        );
        for (ch, cid) in &cids {
            let mut buf = [0u16; 2];
            let units: String = ch
                .encode_utf16(&mut buf)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            cmap.push_str(&format!("<{cid:04X}> <{units}>\n"));
        }
        cmap.push_str("endbfchar\nendcmap\n");

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let to_unicode = doc.add_object(Stream::new(dictionary! {}, cmap.into_bytes()));
        let descendant = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType0",
            "BaseFont" => "TestMincho",
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "DW" => 1000,
        });
        let font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "TestMincho",
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(descendant)],
            "ToUnicode" => to_unicode,
        });

        let mut kids: Vec<Object> = Vec::new();
        for runs in &self.pages {
            let mut ops = Vec::new();
            for (x, baseline, text) in runs {
                let bytes = text.chars().flat_map(|c| cids[&c].to_be_bytes()).collect();
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
                ops.push(Operation::new(
                    "Td",
                    vec![Object::Real(*x), Object::Real(HEIGHT - baseline)],
                ));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(bytes, StringFormat::Hexadecimal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            let content = Content { operations: ops }.encode().expect("encode");
            let contents = doc.add_object(Stream::new(dictionary! {}, content));
            let page = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 842.into(), 595.into()],
                "Contents" => contents,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font } },
            });
            kids.push(page.into());
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            dictionary! { "Type" => "Pages", "Kids" => kids, "Count" => count }.into(),
        );
        let catalog = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog);
        doc.save(path).expect("write fixture");
    }
}

/// Decoded content stream of each page.
pub fn page_contents(path: &Path) -> Vec<String> {
    let doc = Document::load(path).expect("load");
    doc.get_pages()
        .values()
        .map(|&id| String::from_utf8_lossy(&doc.get_page_content(id).expect("content")).into_owned())
        .collect()
}
