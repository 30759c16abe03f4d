use serde::{Deserialize, Serialize};

/// Axis-aligned face box `[x1, y1, x2, y2]` in pixel coordinates.
///
/// Widths and heights follow the inclusive-pixel convention used by the
/// detector's reference post-processing: a box spanning `x1..=x2` is
/// `x2 - x1 + 1` pixels wide. Overlap math must keep that `+1` for numeric
/// parity with scores produced upstream.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box of the given size centered on `(cx, cy)`.
    pub fn from_center(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    /// Continuous width `x2 - x1`.
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Continuous height `y2 - y1`.
    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Continuous area, used to pick the largest face.
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Area under the inclusive-pixel convention.
    pub fn inclusive_area(&self) -> f64 {
        (self.x2 - self.x1 + 1.0) * (self.y2 - self.y1 + 1.0)
    }

    /// Intersection-over-union with inclusive `+1` widths.
    ///
    /// Returns 0 when the union is not positive, so degenerate boxes never
    /// divide by zero.
    pub fn iou(&self, other: &BBox) -> f64 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1 + 1.0).max(0.0) * (iy2 - iy1 + 1.0).max(0.0);
        let union = self.inclusive_area() + other.inclusive_area() - inter;
        if union <= 0.0 || !union.is_finite() {
            return 0.0;
        }
        inter / union
    }

    /// Divide every coordinate by `ratio` (resized → original frame).
    pub fn unscale(&self, ratio: f64) -> BBox {
        BBox::new(
            self.x1 / ratio,
            self.y1 / ratio,
            self.x2 / ratio,
            self.y2 / ratio,
        )
    }

    /// Integer pixel rectangle inside a `width × height` frame.
    ///
    /// Coordinates are truncated toward zero and clamped to the frame.
    /// Returns `None` when nothing of the box remains.
    pub fn clamp_to_frame(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x1 = (self.x1.trunc() as i64).max(0);
        let y1 = (self.y1.trunc() as i64).max(0);
        let x2 = (self.x2.trunc() as i64).min(width as i64);
        let y2 = (self.y2.trunc() as i64).min(height as i64);
        if x2 <= x1 || y2 <= y1 {
            return None;
        }
        Some((x1 as u32, y1 as u32, x2 as u32, y2 as u32))
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

impl From<[f64; 4]> for BBox {
    fn from(a: [f64; 4]) -> Self {
        BBox::new(a[0], a[1], a[2], a[3])
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        b.to_array()
    }
}
