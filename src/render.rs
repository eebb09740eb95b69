//! Rendering adapter seam.
//!
//! The core is a pure data model; drawing happens behind [`RenderAdapter`]
//! so any retained-mode canvas or immediate-mode toolkit can host the
//! editor. The editor hands the adapter viewport-space geometry plus the
//! text-label overlays it derived; the adapter may additionally offer its
//! own hit-testing, but the editor always falls back to its explicit
//! point-in-polygon test.

use crate::constants::{LABEL_FONT_FRACTION, LABEL_FONT_MAX, LABEL_FONT_MIN};
use crate::geometry::{BoundingBox, Point, Polygon};
use crate::region::RegionId;
use crate::transform::ViewTransform;

/// One region prepared for drawing, in viewport space.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionView {
    pub id: RegionId,
    /// Polygon vertices, already transformed into viewport space.
    pub points: Vec<Point>,
    pub selected: bool,
    pub has_text: bool,
}

/// A readable text overlay for a transcribed region: a background plate with
/// centered text at the polygon's centroid.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub region: RegionId,
    pub text: String,
    /// Plate center, viewport space.
    pub anchor: Point,
    /// Font size in viewport pixels.
    pub font_size: f32,
    /// Background plate bounds, viewport space.
    pub plate: BoundingBox,
}

/// Host-side drawing surface.
pub trait RenderAdapter {
    /// Draw one frame: regions in storage (z) order, then label overlays.
    fn render(&mut self, regions: &[RegionView], labels: &[TextLabel], transform: &ViewTransform);

    /// Optional native hit test (viewport space). The editor treats `None`
    /// as "not supported" and uses its own polygon test.
    fn hit_test(&self, _point: Point) -> Option<RegionId> {
        None
    }
}

/// Compute the label overlay for a region, or `None` when it has no text or
/// degenerate geometry. Font size derives from the bounding box's minor
/// dimension (after zoom) and is clamped to a readable range.
pub fn layout_label(
    id: RegionId,
    polygon: &Polygon,
    text: &str,
    transform: &ViewTransform,
) -> Option<TextLabel> {
    if text.is_empty() {
        return None;
    }
    let bbox = polygon.bounding_box()?;
    let centroid = polygon.centroid()?;

    let minor = bbox.minor_dimension() * transform.zoom();
    let font_size = (minor * LABEL_FONT_FRACTION).clamp(LABEL_FONT_MIN, LABEL_FONT_MAX);

    let anchor = transform.to_viewport(centroid);
    // Rough glyph advance; the plate just has to comfortably cover the text.
    let plate_width = text.chars().count() as f32 * font_size * 0.6 + font_size;
    let plate_height = font_size * 1.4;
    let plate = BoundingBox::new(
        anchor.x - plate_width / 2.0,
        anchor.y - plate_height / 2.0,
        plate_width,
        plate_height,
    );

    Some(TextLabel {
        region: id,
        text: text.to_string(),
        anchor,
        font_size,
        plate,
    })
}

/// Adapter that records what it was asked to draw. Used in tests and as a
/// reference for adapter implementors.
#[derive(Debug, Default)]
pub struct RecordingAdapter {
    pub frames: usize,
    pub last_regions: Vec<RegionView>,
    pub last_labels: Vec<TextLabel>,
    pub last_transform: Option<ViewTransform>,
}

impl RenderAdapter for RecordingAdapter {
    fn render(&mut self, regions: &[RegionView], labels: &[TextLabel], transform: &ViewTransform) {
        self.frames += 1;
        self.last_regions = regions.to_vec();
        self.last_labels = labels.to_vec();
        self.last_transform = Some(*transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionStore;

    fn region_id() -> RegionId {
        let mut store = RegionStore::new();
        store
            .add(vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 40.0),
                Point::new(0.0, 40.0),
            ])
            .unwrap()
    }

    fn wide_polygon() -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 40.0),
            Point::new(0.0, 40.0),
        ])
    }

    #[test]
    fn test_no_label_without_text() {
        let label = layout_label(region_id(), &wide_polygon(), "", &ViewTransform::identity());
        assert!(label.is_none());
    }

    #[test]
    fn test_label_anchored_at_centroid() {
        let t = ViewTransform::uniform(1.0, 10.0, 20.0);
        let label = layout_label(region_id(), &wide_polygon(), "abc", &t).unwrap();
        assert_eq!(label.anchor, Point::new(60.0, 40.0));
        assert!(label.plate.contains(&label.anchor));
    }

    #[test]
    fn test_font_size_follows_minor_dimension() {
        // Minor dimension 40 at zoom 1 -> 12px font (0.3 fraction).
        let label =
            layout_label(region_id(), &wide_polygon(), "abc", &ViewTransform::identity()).unwrap();
        assert_eq!(label.font_size, 12.0);
    }

    #[test]
    fn test_font_size_clamped() {
        // Tiny region: clamped up to the minimum.
        let tiny = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
        ]);
        let label = layout_label(region_id(), &tiny, "x", &ViewTransform::identity()).unwrap();
        assert_eq!(label.font_size, LABEL_FONT_MIN);

        // Huge zoom: clamped down to the maximum.
        let t = ViewTransform::uniform(100.0, 0.0, 0.0);
        let label = layout_label(region_id(), &wide_polygon(), "x", &t).unwrap();
        assert_eq!(label.font_size, LABEL_FONT_MAX);
    }
}
