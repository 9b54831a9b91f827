use crate::geometry::BBox;

/// A run of text placed on a page, as produced by a document provider.
///
/// Fragments are word-level: a provider splits shown strings on whitespace
/// and large positioning gaps. Coordinates use a top-left origin.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionedFragment {
    /// Text content, as extracted (not normalized).
    pub text: String,
    /// Bounding box on the page.
    pub bbox: BBox,
}

impl PositionedFragment {
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }

    /// Left edge.
    pub fn x0(&self) -> f64 {
        self.bbox.x0
    }

    /// Top edge, used as the line-clustering key.
    pub fn top(&self) -> f64 {
        self.bbox.top
    }
}
