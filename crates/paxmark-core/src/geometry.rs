/// Bounding box with top-left origin coordinate system.
///
/// Coordinates are page-relative:
/// - `x0`: left edge
/// - `top`: top edge (distance from top of page)
/// - `x1`: right edge
/// - `bottom`: bottom edge (distance from top of page)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// Width of the bounding box.
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    /// Height of the bounding box.
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Vertical midpoint, where strike-through segments are drawn.
    pub fn mid_y(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Horizontal midpoint.
    pub fn mid_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    /// Compute the union of two bounding boxes.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Split the box horizontally into `parts` equal-width boxes.
    ///
    /// Returns an empty vector when `parts` is zero.
    pub fn split_horizontal(&self, parts: usize) -> Vec<BBox> {
        if parts == 0 {
            return Vec::new();
        }
        let step = self.width() / parts as f64;
        (0..parts)
            .map(|i| {
                let x0 = self.x0 + step * i as f64;
                BBox::new(x0, self.top, x0 + step, self.bottom)
            })
            .collect()
    }
}
