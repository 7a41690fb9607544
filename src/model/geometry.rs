//! Page-space geometry.
//!
//! All coordinates are PDF points with the origin at the top-left corner of
//! the page and Y growing downward.

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle `(x0, y0)` to `(x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Build a box from two arbitrary corners, normalizing the order.
    pub fn from_corners(ax: f32, ay: f32, bx: f32, by: f32) -> Self {
        Self {
            x0: ax.min(bx),
            y0: ay.min(by),
            x1: ax.max(bx),
            y1: ay.max(by),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Area, zero for degenerate boxes.
    pub fn area(&self) -> f32 {
        if self.is_degenerate() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    /// A box is degenerate when it has no positive extent on either axis or
    /// carries non-finite coordinates.
    pub fn is_degenerate(&self) -> bool {
        let finite = self.x0.is_finite()
            && self.y0.is_finite()
            && self.x1.is_finite()
            && self.y1.is_finite();
        !finite || self.x0 >= self.x1 || self.y0 >= self.y1
    }

    /// Overlap of two boxes, `None` when they do not overlap with positive area.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let b = BoundingBox {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        if b.is_degenerate() {
            None
        } else {
            Some(b)
        }
    }

    /// Fraction of this box's area that lies inside `container`.
    pub fn containment_in(&self, container: &BoundingBox) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.intersection(container)
            .map(|i| i.area() / area)
            .unwrap_or(0.0)
    }

    /// Length of the horizontal overlap with the span `[start, end]`.
    pub fn horizontal_overlap(&self, start: f32, end: f32) -> f32 {
        (self.x1.min(end) - self.x0.max(start)).max(0.0)
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Intersection-over-union, used to match hinted regions with elements.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = self.intersection(other).map(|b| b.area()).unwrap_or(0.0);
        let total = self.area() + other.area() - inter;
        if total <= 0.0 {
            0.0
        } else {
            inter / total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions() {
        let b = BoundingBox::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(b.width(), 100.0);
        assert_eq!(b.height(), 50.0);
        assert_eq!(b.area(), 5000.0);
        assert_eq!(b.center_x(), 60.0);
    }

    #[test]
    fn test_degenerate() {
        assert!(BoundingBox::new(0.0, 0.0, 0.0, 10.0).is_degenerate());
        assert!(BoundingBox::new(0.0, 10.0, 10.0, 5.0).is_degenerate());
        assert!(BoundingBox::new(f32::NAN, 0.0, 10.0, 10.0).is_degenerate());
        assert_eq!(BoundingBox::new(5.0, 5.0, 5.0, 5.0).area(), 0.0);
        assert!(!BoundingBox::new(0.0, 0.0, 1.0, 1.0).is_degenerate());
    }

    #[test]
    fn test_containment() {
        let table = BoundingBox::new(100.0, 100.0, 200.0, 300.0);
        let inside = BoundingBox::new(110.0, 120.0, 190.0, 135.0);
        let half = BoundingBox::new(150.0, 120.0, 250.0, 135.0);
        let outside = BoundingBox::new(300.0, 120.0, 400.0, 135.0);

        assert_eq!(inside.containment_in(&table), 1.0);
        assert!((half.containment_in(&table) - 0.5).abs() < 1e-4);
        assert_eq!(outside.containment_in(&table), 0.0);
    }

    #[test]
    fn test_union_and_corners() {
        let a = BoundingBox::from_corners(10.0, 50.0, 0.0, 20.0);
        assert_eq!(a, BoundingBox::new(0.0, 20.0, 10.0, 50.0));
        let u = a.union(&BoundingBox::new(5.0, 0.0, 30.0, 25.0));
        assert_eq!(u, BoundingBox::new(0.0, 0.0, 30.0, 50.0));
    }

    #[test]
    fn test_iou() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-4);
    }
}
