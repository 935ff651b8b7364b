use serde::{Deserialize, Serialize};

use crate::shared::error::RedactError;

/// An image-relative rectangle in [0, 1] units, top-left origin, y down.
///
/// Every field is validated on construction. The rect may extend past
/// the right or bottom edge (`x + width > 1`); use [`clamped`] to trim it.
///
/// [`clamped`]: NormalizedRect::clamped
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RectFields")]
pub struct NormalizedRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

#[derive(Deserialize)]
struct RectFields {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl TryFrom<RectFields> for NormalizedRect {
    type Error = RedactError;

    fn try_from(f: RectFields) -> Result<Self, Self::Error> {
        NormalizedRect::new(f.x, f.y, f.width, f.height)
    }
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Result<Self, RedactError> {
        for (field, value) in [("x", x), ("y", y), ("width", width), ("height", height)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(RedactError::InvalidRect { field, value });
            }
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// The whole image.
    pub fn unit() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    /// Clips arbitrary coordinates to the unit square.
    ///
    /// Returns `None` for non-finite input or when nothing of the rect
    /// remains inside the image.
    pub fn from_unclamped(x: f64, y: f64, width: f64, height: f64) -> Option<Self> {
        if ![x, y, width, height].iter().all(|v| v.is_finite()) {
            return None;
        }
        let left = x.clamp(0.0, 1.0);
        let top = y.clamp(0.0, 1.0);
        let right = (x + width).clamp(0.0, 1.0);
        let bottom = (y + height).clamp(0.0, 1.0);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Trims the rect so it lies entirely inside the unit square.
    pub fn clamped(&self) -> Self {
        Self {
            width: self.width.min(1.0 - self.x),
            height: self.height.min(1.0 - self.y),
            ..*self
        }
    }

    /// Converts between top-left and bottom-left vertical conventions.
    ///
    /// The rect is trimmed to the unit square first. For rects already
    /// inside it, applying the flip twice returns the original rect.
    pub fn flip_vertical(&self) -> Self {
        let inside = self.clamped();
        Self {
            y: (1.0 - inside.y - inside.height).max(0.0),
            ..inside
        }
    }

    /// Both sides strictly larger than `min`.
    pub fn exceeds(&self, min: f64) -> bool {
        self.width > min && self.height > min
    }

    pub fn iou(&self, other: &NormalizedRect) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn rect(x: f64, y: f64, w: f64, h: f64) -> NormalizedRect {
        NormalizedRect::new(x, y, w, h).unwrap()
    }

    #[test]
    fn test_new_accepts_unit_range() {
        let r = rect(0.1, 0.2, 0.3, 0.4);
        assert_relative_eq!(r.x(), 0.1);
        assert_relative_eq!(r.y(), 0.2);
        assert_relative_eq!(r.width(), 0.3);
        assert_relative_eq!(r.height(), 0.4);
    }

    #[rstest]
    #[case::negative_x(-0.1, 0.0, 0.5, 0.5, "x")]
    #[case::y_above_one(0.0, 1.5, 0.5, 0.5, "y")]
    #[case::nan_width(0.0, 0.0, f64::NAN, 0.5, "width")]
    #[case::infinite_height(0.0, 0.0, 0.5, f64::INFINITY, "height")]
    fn test_new_rejects_out_of_range(
        #[case] x: f64,
        #[case] y: f64,
        #[case] w: f64,
        #[case] h: f64,
        #[case] expected_field: &str,
    ) {
        match NormalizedRect::new(x, y, w, h) {
            Err(RedactError::InvalidRect { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected InvalidRect, got {other:?}"),
        }
    }

    #[test]
    fn test_overhanging_rect_is_representable_and_clampable() {
        let r = rect(0.8, 0.9, 0.5, 0.5);
        assert!(r.right() > 1.0);
        let c = r.clamped();
        assert_relative_eq!(c.right(), 1.0);
        assert_relative_eq!(c.bottom(), 1.0);
        assert_relative_eq!(c.x(), 0.8);
    }

    #[test]
    fn test_from_unclamped_clips_to_unit_square() {
        let r = NormalizedRect::from_unclamped(-0.1, 0.9, 0.3, 0.2).unwrap();
        assert_relative_eq!(r.x(), 0.0);
        assert_relative_eq!(r.width(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(r.y(), 0.9);
        assert_relative_eq!(r.height(), 0.1, epsilon = 1e-12);
    }

    #[rstest]
    #[case::outside(1.2, 0.0, 0.3, 0.3)]
    #[case::zero_width(0.5, 0.5, 0.0, 0.3)]
    #[case::nan(f64::NAN, 0.0, 0.3, 0.3)]
    fn test_from_unclamped_rejects_empty(
        #[case] x: f64,
        #[case] y: f64,
        #[case] w: f64,
        #[case] h: f64,
    ) {
        assert!(NormalizedRect::from_unclamped(x, y, w, h).is_none());
    }

    #[test]
    fn test_flip_vertical_is_involution() {
        let r = rect(0.1, 0.25, 0.3, 0.5);
        let flipped = r.flip_vertical();
        assert_relative_eq!(flipped.y(), 0.25);
        let small = rect(0.0, 0.0, 0.5, 0.25);
        assert_relative_eq!(small.flip_vertical().y(), 0.75);
        assert_relative_eq!(small.flip_vertical().flip_vertical().y(), 0.0);
    }

    #[test]
    fn test_flip_vertical_trims_overhanging_rect() {
        let overhang = rect(0.1, 0.9, 0.3, 0.5);
        let flipped = overhang.flip_vertical();
        assert_relative_eq!(flipped.y(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(flipped.height(), 0.1, epsilon = 1e-12);
        let back = flipped.flip_vertical();
        let inside = overhang.clamped();
        assert_relative_eq!(back.y(), inside.y(), epsilon = 1e-12);
        assert_relative_eq!(back.height(), inside.height(), epsilon = 1e-12);
        assert_relative_eq!(back.y(), 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_exceeds_is_strict() {
        assert!(rect(0.0, 0.0, 0.03, 0.03).exceeds(0.02));
        assert!(!rect(0.0, 0.0, 0.02, 0.5).exceeds(0.02));
        assert!(!rect(0.0, 0.0, 0.5, 0.01).exceeds(0.02));
    }

    #[test]
    fn test_iou_identical() {
        let a = rect(0.1, 0.1, 0.5, 0.5);
        assert_relative_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // a: [0,0]-[0.5,0.5], b: [0.25,0]-[0.75,0.5]
        // inter = 0.25 * 0.5 = 0.125, union = 0.25 + 0.25 - 0.125 = 0.375
        let a = rect(0.0, 0.0, 0.5, 0.5);
        let b = rect(0.25, 0.0, 0.5, 0.5);
        assert_relative_eq!(a.iou(&b), 0.125 / 0.375);
    }

    #[test]
    fn test_iou_touching_edges_is_zero() {
        let a = rect(0.0, 0.0, 0.5, 0.5);
        let b = rect(0.5, 0.0, 0.5, 0.5);
        assert_relative_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: NormalizedRect =
            serde_json::from_str(r#"{"x":0.1,"y":0.2,"width":0.3,"height":0.4}"#).unwrap();
        assert_eq!(ok, rect(0.1, 0.2, 0.3, 0.4));
        let bad = serde_json::from_str::<NormalizedRect>(r#"{"x":2.0,"y":0.2,"width":0.3,"height":0.4}"#);
        assert!(bad.is_err());
    }
}
