//! In-memory page sources for unit tests.

use paxmark_core::{BBox, PositionedFragment};
use paxmark_pdf::{BackendError, PageSource};

/// Pages of positioned fragments held in memory.
pub(crate) struct FakeSource(pub Vec<Vec<PositionedFragment>>);

impl PageSource for FakeSource {
    fn page_count(&self) -> usize {
        self.0.len()
    }

    fn fragments(&self, page_index: usize) -> Result<Vec<PositionedFragment>, BackendError> {
        self.0
            .get(page_index)
            .cloned()
            .ok_or(BackendError::PageOutOfRange {
                index: page_index,
                count: self.0.len(),
            })
    }
}

/// One row of cells, 60 units apart, with its top edge at `top`.
pub(crate) fn row(top: f64, cells: &[&str]) -> Vec<PositionedFragment> {
    cells
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let x0 = 20.0 + 60.0 * i as f64;
            PositionedFragment::new(*text, BBox::new(x0, top, x0 + 50.0, top + 10.0))
        })
        .collect()
}

/// A one-page manifest: two rows of flight 262 around one row of flight 101.
pub(crate) fn manifest_page() -> Vec<PositionedFragment> {
    let mut page = row(40.0, &["号車別明細", "262便"]);
    page.extend(row(
        100.0,
        &["01", "9J-123456", "田中", "2", "1", "0", "3", "成田→東京262便"],
    ));
    page.extend(row(
        120.0,
        &["02", "9J-222222", "佐藤", "1", "0", "0", "1", "成田→東京101便"],
    ));
    page.extend(row(
        140.0,
        &["03", "9J-333333", "鈴木", "1", "1", "0", "2", "NS", "成田→東京262便"],
    ));
    page
}
