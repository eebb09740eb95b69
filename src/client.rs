//! Persistence and detection client contract.
//!
//! The editor core never talks to a network or filesystem directly; it is
//! constructed with an [`AnnotationClient`] implementation owned by the host.
//! This module defines that trait, the wire types it exchanges, and the
//! transport error taxonomy.
//!
//! # Wire format
//!
//! Region geometry travels in image-pixel space with coordinates rounded to
//! integers on save. Texts travel as a map from **storage-order index** to
//! string; the payload carries no region ids, so any reordering view (such as
//! the reading-order transcription panel) has to remap display positions to
//! storage indices before touching the map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Point;
use crate::region::RegionStore;

/// Errors surfaced by the persistence/detection collaborator.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network or storage failure; the message is shown to the user.
    #[error("transport error: {0}")]
    Transport(String),

    /// The requested image does not exist on the server.
    #[error("image not found: {0}")]
    NotFound(String),

    /// The payload could not be serialized or parsed.
    #[error("malformed payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// An integer image-pixel coordinate as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointWire {
    pub x: i32,
    pub y: i32,
}

impl PointWire {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_point(self) -> Point {
        Point::new(self.x as f32, self.y as f32)
    }

    /// Round an image-space point to the persisted integer grid.
    pub fn from_point(p: Point) -> Self {
        Self {
            x: p.x.round() as i32,
            y: p.y.round() as i32,
        }
    }
}

/// One persisted region: an ordered point sequence, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionWire {
    pub points: Vec<PointWire>,
}

impl RegionWire {
    pub fn new(points: Vec<PointWire>) -> Self {
        Self { points }
    }

    pub fn to_points(&self) -> Vec<Point> {
        self.points.iter().map(|p| p.to_point()).collect()
    }

    pub fn from_points(points: &[Point]) -> Self {
        Self {
            points: points.iter().map(|p| PointWire::from_point(*p)).collect(),
        }
    }
}

/// The annotation payload exchanged with the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPayload {
    pub image_name: String,

    #[serde(default)]
    pub regions: Vec<RegionWire>,

    /// Texts keyed by storage-order region index.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub texts: BTreeMap<usize, String>,

    /// Opaque workflow stage string, forwarded as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl AnnotationPayload {
    /// An empty payload for an image with no stored annotation.
    pub fn empty(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            regions: Vec::new(),
            texts: BTreeMap::new(),
            status: None,
        }
    }

    /// Serialize the store's current state: geometry rounded to integers,
    /// texts keyed by storage order (only non-empty texts are written).
    pub fn from_store(
        image_name: impl Into<String>,
        store: &RegionStore,
        status: Option<String>,
    ) -> Self {
        let mut texts = BTreeMap::new();
        let regions = store
            .iter()
            .enumerate()
            .map(|(index, region)| {
                if region.has_text() {
                    texts.insert(index, region.text().to_string());
                }
                RegionWire::from_points(&region.polygon().vertices)
            })
            .collect();
        Self {
            image_name: image_name.into(),
            regions,
            texts,
            status,
        }
    }
}

/// Progress of a long-running detection/recognition job.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionState {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionProgress {
    pub state: DetectionState,
    pub percentage: f32,
}

/// Immediate result of a detection request.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionResponse {
    /// The job was queued; poll for progress.
    Accepted,
    /// The backend ran synchronously and returned regions directly.
    Regions(Vec<RegionWire>),
}

/// Contract to the external persistence and ML collaborators.
///
/// One implementation is injected per editor instance; the core never
/// reaches for process-wide state.
pub trait AnnotationClient {
    fn list_images(&mut self) -> Result<Vec<String>, ClientError>;

    fn fetch_image(&mut self, image: &str) -> Result<Vec<u8>, ClientError>;

    fn load_annotation(&mut self, image: &str) -> Result<AnnotationPayload, ClientError>;

    fn save_annotation(&mut self, payload: &AnnotationPayload) -> Result<(), ClientError>;

    fn run_detection(&mut self, image: &str) -> Result<DetectionResponse, ClientError>;

    fn detection_progress(&mut self, image: &str) -> Result<DetectionProgress, ClientError>;
}
