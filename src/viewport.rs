//! Per-panel zoom/pan state.
//!
//! Each rendering panel owns one [`ViewportController`]: wheel zoom anchored
//! at the cursor, click-drag panning, and verbatim transform mirroring for
//! linked panels (the dual-panel transcription view keeps an image panel and
//! a white-background text panel in lockstep).

use crate::geometry::Point;
use crate::transform::{ViewTransform, ZoomLimits};

/// Zoom and pan controller for a single panel.
#[derive(Debug, Clone)]
pub struct ViewportController {
    transform: ViewTransform,
    limits: ZoomLimits,
    /// Cursor position (viewport space) of the last processed drag event,
    /// while a pan drag is in progress.
    drag_anchor: Option<Point>,
}

impl ViewportController {
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            transform: ViewTransform::identity(),
            limits,
            drag_anchor: None,
        }
    }

    pub fn transform(&self) -> &ViewTransform {
        &self.transform
    }

    pub fn zoom(&self) -> f32 {
        self.transform.zoom()
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    /// Multiply the current zoom by `factor`, clamped to the panel's range,
    /// keeping the image point under `anchor` fixed on screen.
    pub fn zoom_at(&mut self, anchor: Point, factor: f32) {
        let new_zoom = self.limits.clamp(self.transform.zoom() * factor);
        self.transform = self.transform.zoom_to_anchor(new_zoom, anchor);
    }

    /// Set an absolute zoom level (clamped), anchored at `anchor`.
    pub fn set_zoom(&mut self, anchor: Point, zoom: f32) {
        let new_zoom = self.limits.clamp(zoom);
        self.transform = self.transform.zoom_to_anchor(new_zoom, anchor);
    }

    /// Translate the view by a viewport-space delta.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.transform = self.transform.pan_by(dx, dy);
    }

    /// Mirror another panel's transform verbatim.
    pub fn sync_from(&mut self, other: &ViewTransform) {
        self.transform = *other;
    }

    /// Compute a centered fit-to-panel transform for an image of the given
    /// pixel dimensions, clamped to the panel's zoom range.
    pub fn fit_to(&mut self, image_width: u32, image_height: u32, panel_width: f32, panel_height: f32) {
        if image_width == 0 || image_height == 0 || panel_width <= 0.0 || panel_height <= 0.0 {
            log::warn!(
                "Viewport: cannot fit image {}x{} into panel {}x{}",
                image_width,
                image_height,
                panel_width,
                panel_height
            );
            self.transform = ViewTransform::identity();
            return;
        }
        let scale_x = panel_width / image_width as f32;
        let scale_y = panel_height / image_height as f32;
        let zoom = self.limits.clamp(scale_x.min(scale_y));
        let tx = (panel_width - image_width as f32 * zoom) / 2.0;
        let ty = (panel_height - image_height as f32 * zoom) / 2.0;
        self.transform = ViewTransform::uniform(zoom, tx, ty);
    }

    // ========================================================================
    // Pan drag gesture
    // ========================================================================

    /// Button-down at `pos`: start accumulating pan deltas.
    pub fn begin_drag(&mut self, pos: Point) {
        self.drag_anchor = Some(pos);
    }

    /// Cursor moved to `pos` during a drag. Applies the delta since the last
    /// event and returns it, or `None` when no drag is in progress.
    pub fn drag_to(&mut self, pos: Point) -> Option<(f32, f32)> {
        let anchor = self.drag_anchor?;
        let dx = pos.x - anchor.x;
        let dy = pos.y - anchor.y;
        self.transform = self.transform.pan_by(dx, dy);
        self.drag_anchor = Some(pos);
        Some((dx, dy))
    }

    /// Button-up: commit the drag. Returns whether a drag was in progress.
    pub fn end_drag(&mut self) -> bool {
        self.drag_anchor.take().is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }
}
