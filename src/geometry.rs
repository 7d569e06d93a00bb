//! Box geometry shared by the associator and detector backends.
//!
//! Boxes arrive from the detector in center + size form. Coordinates may be
//! pixels or normalized 0..1; IoU is scale-free so either works as long as
//! both operands use the same frame of reference.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in center + size form.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(center_x: f32, center_y: f32, width: f32, height: f32) -> Self {
        Self {
            center_x,
            center_y,
            width,
            height,
        }
    }

    /// Build from corner coordinates (x1, y1, x2, y2).
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            center_x: (x1 + x2) / 2.0,
            center_y: (y1 + y2) / 2.0,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Corner form (x1, y1, x2, y2).
    pub fn corners(&self) -> (f32, f32, f32, f32) {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        (
            self.center_x - half_w,
            self.center_y - half_h,
            self.center_x + half_w,
            self.center_y + half_h,
        )
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Zero, negative or non-finite extent.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite()
            && self.height.is_finite()
            && self.center_x.is_finite()
            && self.center_y.is_finite()
            && self.width > 0.0
            && self.height > 0.0)
    }
}

/// Intersection-over-union of two boxes, in `[0, 1]`.
///
/// Degenerate boxes never match: the result is `0.0` instead of NaN.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    if a.is_degenerate() || b.is_degenerate() {
        return 0.0;
    }

    let (ax1, ay1, ax2, ay2) = a.corners();
    let (bx1, by1, bx2, by2) = b.corners();

    let x1 = ax1.max(bx1);
    let y1 = ay1.max(by1);
    let x2 = ax2.min(bx2);
    let y2 = ay2.min(by2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        (intersection / union).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
