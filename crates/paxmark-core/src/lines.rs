//! Clustering of positioned fragments into logical lines.

use crate::fragment::PositionedFragment;
use crate::geometry::BBox;

/// Default vertical tolerance for grouping fragments into one line.
pub const DEFAULT_Y_TOLERANCE: f64 = 1.5;

/// Options for line reconstruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineOptions {
    /// Maximum distance between a fragment's rounded top and a line key.
    pub y_tolerance: f64,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            y_tolerance: DEFAULT_Y_TOLERANCE,
        }
    }
}

/// Fragments sharing a vertical band, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalLine {
    /// Bucket key: the rounded top of the fragment that opened the line.
    pub y: f64,
    pub fragments: Vec<PositionedFragment>,
}

impl LogicalLine {
    /// Concatenated fragment text with no separator.
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }

    /// Union of all fragment boxes, or `None` for an empty line.
    pub fn bbox(&self) -> Option<BBox> {
        let mut iter = self.fragments.iter();
        let first = iter.next()?.bbox;
        Some(iter.fold(first, |acc, f| acc.union(&f.bbox)))
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Group fragments into logical lines.
///
/// Each fragment's top is rounded to one decimal place; the fragment joins
/// the first existing line (in creation order) whose key lies within the
/// tolerance, otherwise it opens a new line keyed by its own rounded top.
/// Fragments within a line are stably sorted by left edge and lines are
/// returned in ascending key order.
pub fn reconstruct(fragments: &[PositionedFragment], options: &LineOptions) -> Vec<LogicalLine> {
    let mut lines: Vec<LogicalLine> = Vec::new();

    for fragment in fragments {
        let y = round_to_tenth(fragment.top());
        match lines
            .iter_mut()
            .find(|line| (line.y - y).abs() <= options.y_tolerance)
        {
            Some(line) => line.fragments.push(fragment.clone()),
            None => lines.push(LogicalLine {
                y,
                fragments: vec![fragment.clone()],
            }),
        }
    }

    for line in &mut lines {
        line.fragments
            .sort_by(|a, b| a.x0().partial_cmp(&b.x0()).unwrap_or(std::cmp::Ordering::Equal));
    }
    lines.sort_by(|a, b| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal));
    lines
}
