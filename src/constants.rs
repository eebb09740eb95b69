//! Global tuning constants for the LINAT editor core.

use std::time::Duration;

/// Radius around a polygon's first vertex (in viewport pixels, after zoom)
/// within which a placement click closes the polygon instead of adding a vertex.
pub const SNAP_DISTANCE: f32 = 15.0;

/// Regions whose top edges differ by less than this many image pixels are
/// grouped into the same row by the reading-order sort.
pub const ROW_GROUP_THRESHOLD: f32 = 10.0;

/// Maximum number of snapshots retained by the undo history.
pub const MAX_HISTORY_DEPTH: usize = 50;

/// Zoom clamp range for the main image panel.
pub const IMAGE_PANEL_MIN_ZOOM: f32 = 0.01;
pub const IMAGE_PANEL_MAX_ZOOM: f32 = 20.0;

/// Zoom clamp range for the transcription text panel.
pub const TEXT_PANEL_MIN_ZOOM: f32 = 0.1;
pub const TEXT_PANEL_MAX_ZOOM: f32 = 10.0;

/// Autosave debounce for the segmentation workflow.
pub const SEGMENTATION_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(800);

/// Autosave debounce for the transcription workflow (typing quiesces slower).
pub const TRANSCRIPTION_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Fixed interval between detection-job status polls.
pub const DETECTION_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Radius (viewport pixels) for grabbing a polygon vertex in edit mode.
pub const VERTEX_HANDLE_RADIUS: f32 = 8.0;

/// Text label font size as a fraction of the region bounding box's minor dimension.
pub const LABEL_FONT_FRACTION: f32 = 0.3;

/// Clamp range for the derived label font size (viewport pixels).
pub const LABEL_FONT_MIN: f32 = 10.0;
pub const LABEL_FONT_MAX: f32 = 48.0;
