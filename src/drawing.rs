//! Polygon drawing state machine.
//!
//! A [`DrawingSession`] collects vertices one placement click at a time.
//! Placement positions arrive in viewport space (that is where clicks
//! happen); collected points are stored in image space so the polygon is
//! independent of subsequent zooming. Once three or more points exist, a
//! click within the snap distance of the first vertex (measured in viewport
//! space, i.e. after zoom) closes the polygon instead of adding a vertex.
//!
//! The session only tracks geometry. Visual helpers (vertex markers, the
//! rubber-band edge, the near-start cursor affordance) are queried by the
//! host through [`DrawingSession::points`], [`DrawingSession::rubber_band`]
//! and [`DrawingSession::near_start`], and all state is discarded on
//! completion or abort.

use crate::constants::SNAP_DISTANCE;
use crate::geometry::Point;
use crate::transform::ViewTransform;

/// Result of a placement click.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    /// The point was appended to the in-progress polygon.
    Added,
    /// The click closed the polygon; here are its image-space vertices.
    Closed(Vec<Point>),
}

/// State machine for constructing one polygon.
#[derive(Debug, Clone)]
pub struct DrawingSession {
    /// Collected vertices in image space. Empty means inactive.
    points: Vec<Point>,
    snap_distance: f32,
}

impl DrawingSession {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            snap_distance: SNAP_DISTANCE,
        }
    }

    pub fn with_snap_distance(mut self, distance: f32) -> Self {
        self.snap_distance = distance;
        self
    }

    pub fn is_active(&self) -> bool {
        !self.points.is_empty()
    }

    /// Collected vertices so far, image space.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Handle a placement click at `cursor` (viewport space).
    pub fn place(&mut self, cursor: Point, transform: &ViewTransform) -> Placement {
        if self.points.len() >= 3 && self.near_start(cursor, transform) {
            log::debug!("Drawing: snap-closed polygon with {} points", self.points.len());
            return Placement::Closed(std::mem::take(&mut self.points));
        }
        self.points.push(transform.to_image(cursor));
        Placement::Added
    }

    /// Whether `cursor` (viewport space) is within snap distance of the first
    /// placed vertex. Used for the closing cursor affordance; always false
    /// until a polygon could actually close.
    pub fn near_start(&self, cursor: Point, transform: &ViewTransform) -> bool {
        if self.points.len() < 3 {
            return false;
        }
        let start = transform.to_viewport(self.points[0]);
        start.distance_to(&cursor) <= self.snap_distance
    }

    /// The rubber-band edge from the last placed vertex to the live cursor,
    /// both in viewport space.
    pub fn rubber_band(&self, cursor: Point, transform: &ViewTransform) -> Option<(Point, Point)> {
        let last = self.points.last()?;
        Some((transform.to_viewport(*last), cursor))
    }

    /// Explicitly finish the polygon. Requires at least 3 points; otherwise
    /// nothing happens and the session stays active.
    pub fn finish(&mut self) -> Option<Vec<Point>> {
        if self.points.len() < 3 {
            return None;
        }
        log::debug!("Drawing: finished polygon with {} points", self.points.len());
        Some(std::mem::take(&mut self.points))
    }

    /// Discard all collected points without creating a region. Callable at
    /// any time (mode switch, Escape).
    pub fn abort(&mut self) {
        if !self.points.is_empty() {
            log::debug!("Drawing: aborted with {} points", self.points.len());
        }
        self.points.clear();
    }
}

impl Default for DrawingSession {
    fn default() -> Self {
        Self::new()
    }
}
