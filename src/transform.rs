//! Image-space / viewport-space transform mathematics.
//!
//! A [`ViewTransform`] is the affine map applied when rendering an image into
//! a panel: independent X/Y scale plus translation (rotation is unused). The
//! functions here are pure so they can be tested without any rendering
//! backend, and they must round-trip exactly: `to_image(to_viewport(p))`
//! returns `p` within floating-point tolerance.

use crate::geometry::Point;

/// Affine transform between image-pixel space and viewport space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl ViewTransform {
    pub fn new(scale_x: f32, scale_y: f32, translate_x: f32, translate_y: f32) -> Self {
        Self {
            scale_x,
            scale_y,
            translate_x,
            translate_y,
        }
    }

    /// Identity transform (scale 1, no translation).
    pub fn identity() -> Self {
        Self::new(1.0, 1.0, 0.0, 0.0)
    }

    /// Uniform transform with the same scale on both axes.
    pub fn uniform(zoom: f32, translate_x: f32, translate_y: f32) -> Self {
        Self::new(zoom, zoom, translate_x, translate_y)
    }

    /// The effective zoom factor. Panels use uniform scaling, so the X scale
    /// is the zoom.
    pub fn zoom(&self) -> f32 {
        self.scale_x
    }

    /// Map an image-space point into viewport space.
    pub fn to_viewport(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale_x + self.translate_x,
            p.y * self.scale_y + self.translate_y,
        )
    }

    /// Map a viewport-space point back into image space. Exact inverse of
    /// [`Self::to_viewport`].
    pub fn to_image(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.translate_x) / self.scale_x,
            (p.y - self.translate_y) / self.scale_y,
        )
    }

    /// Rescale to `new_zoom` while keeping the image point under `anchor`
    /// (viewport space) at the same viewport position.
    pub fn zoom_to_anchor(&self, new_zoom: f32, anchor: Point) -> ViewTransform {
        // Image-space point under the anchor before rescale
        let img = self.to_image(anchor);

        ViewTransform {
            scale_x: new_zoom,
            scale_y: new_zoom,
            translate_x: anchor.x - img.x * new_zoom,
            translate_y: anchor.y - img.y * new_zoom,
        }
    }

    /// Apply a pan delta (viewport space).
    pub fn pan_by(&self, dx: f32, dy: f32) -> ViewTransform {
        ViewTransform {
            translate_x: self.translate_x + dx,
            translate_y: self.translate_y + dy,
            ..*self
        }
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Allowed zoom range for a panel. Prevents degenerate transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
}

impl ZoomLimits {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp a requested zoom factor to the allowed range.
    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.0001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn approx_point(a: Point, b: Point) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
    }

    #[test]
    fn test_identity_round_trip() {
        let t = ViewTransform::identity();
        let p = Point::new(12.5, -3.75);
        assert!(approx_point(t.to_image(t.to_viewport(p)), p));
    }

    #[test]
    fn test_round_trip_various_transforms() {
        let transforms = [
            ViewTransform::uniform(2.0, 100.0, -40.0),
            ViewTransform::uniform(0.125, -7.0, 3.0),
            ViewTransform::new(1.5, 0.75, 10.0, 20.0),
        ];
        let points = [
            Point::new(0.0, 0.0),
            Point::new(1024.0, 768.0),
            Point::new(-17.5, 33.3),
        ];
        for t in &transforms {
            for p in &points {
                assert!(
                    approx_point(t.to_image(t.to_viewport(*p)), *p),
                    "round trip failed for {:?} with {:?}",
                    p,
                    t
                );
            }
        }
    }

    #[test]
    fn test_zoom_to_anchor_preserves_anchor_point() {
        let t = ViewTransform::uniform(1.0, 50.0, 30.0);
        let anchor = Point::new(150.0, 120.0);

        let img_before = t.to_image(anchor);
        let zoomed = t.zoom_to_anchor(2.0, anchor);
        let img_after = zoomed.to_image(anchor);

        assert!(approx_point(img_before, img_after));
        assert_eq!(zoomed.zoom(), 2.0);
    }

    #[test]
    fn test_zoom_to_anchor_at_origin() {
        // Anchored at the viewport origin with no pan, only the scale changes.
        let t = ViewTransform::identity();
        let zoomed = t.zoom_to_anchor(3.0, Point::new(0.0, 0.0));
        assert!(approx_eq(zoomed.translate_x, 0.0));
        assert!(approx_eq(zoomed.translate_y, 0.0));
    }

    #[test]
    fn test_pan_by() {
        let t = ViewTransform::uniform(2.0, 10.0, 20.0);
        let panned = t.pan_by(5.0, -10.0);
        assert_eq!(panned.zoom(), 2.0);
        assert_eq!(panned.translate_x, 15.0);
        assert_eq!(panned.translate_y, 10.0);
    }

    #[test]
    fn test_zoom_limits_clamp() {
        let limits = ZoomLimits::new(0.1, 10.0);
        assert_eq!(limits.clamp(0.001), 0.1);
        assert_eq!(limits.clamp(50.0), 10.0);
        assert_eq!(limits.clamp(2.5), 2.5);
    }
}
