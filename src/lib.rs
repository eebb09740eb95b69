//! LINAT - Line Annotation Tool core.
//!
//! A headless editor core for polygon-based text-line annotation of scanned
//! document images. The crate owns the data model and interaction semantics
//! (regions, drawing, selection, undo history, zoom/pan, reading order,
//! debounced autosave, detection polling) and delegates everything
//! host-specific to two seams:
//!
//! - [`client::AnnotationClient`]: persistence and ML detection, injected per
//!   editor instance.
//! - [`render::RenderAdapter`]: the drawing surface.
//!
//! The entry point is [`editor::AnnotationEditor`], driven by host events and
//! a periodic tick. [`format`] additionally offers PAGE XML and ZIP dataset
//! import/export for offline interchange.

pub mod autosave;
pub mod client;
pub mod constants;
pub mod detect;
pub mod drawing;
pub mod editor;
pub mod format;
pub mod geometry;
pub mod history;
pub mod image_data;
pub mod keybindings;
pub mod message;
pub mod region;
pub mod render;
pub mod transform;
pub mod viewport;

pub use client::{AnnotationClient, AnnotationPayload, ClientError};
pub use editor::{AnnotationEditor, EditorError, Workflow};
pub use geometry::{BoundingBox, Point, Polygon};
pub use message::{EditorAction, EditorEvent, EditorMode, Modifiers, MouseButton};
pub use region::{Region, RegionId, RegionStore};
pub use render::RenderAdapter;
pub use transform::ViewTransform;
