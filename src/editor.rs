//! The annotation editor orchestrator.
//!
//! [`AnnotationEditor`] wires input events to the region store, drawing
//! session, viewport controllers, undo history, autosave clock and detection
//! poller, and owns the single save/load contract against the injected
//! [`AnnotationClient`].
//!
//! The editor is driven by the host event loop: pointer/wheel events go
//! through [`AnnotationEditor::handle_event`], key presses through
//! [`AnnotationEditor::handle_key`], and [`AnnotationEditor::tick`] must be
//! called periodically (once per frame is fine) to fire the debounced
//! autosave and the detection poll.

use std::time::Duration;

use thiserror::Error;

use crate::autosave::AutoSaveManager;
use crate::client::{
    AnnotationClient, AnnotationPayload, ClientError, DetectionResponse, DetectionState,
};
use crate::constants::{
    IMAGE_PANEL_MAX_ZOOM, IMAGE_PANEL_MIN_ZOOM, SEGMENTATION_AUTOSAVE_DEBOUNCE,
    TEXT_PANEL_MAX_ZOOM, TEXT_PANEL_MIN_ZOOM, TRANSCRIPTION_AUTOSAVE_DEBOUNCE,
    VERTEX_HANDLE_RADIUS,
};
use crate::detect::DetectionPoller;
use crate::drawing::{DrawingSession, Placement};
use crate::geometry::Point;
use crate::history::HistoryManager;
use crate::image_data::{ImageInfo, LoadError, PendingLoad};
use crate::keybindings::{Key, KeyBindings};
use crate::message::{EditorAction, EditorEvent, EditorMode, Modifiers, MouseButton};
use crate::region::{RegionId, RegionStore};
use crate::render::{self, RegionView, RenderAdapter, TextLabel};
use crate::transform::ZoomLimits;
use crate::viewport::ViewportController;

/// Which tool the editor is operating as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workflow {
    /// Freehand segmentation: draw, edit and reorder region geometry.
    Segmentation,
    /// Text entry over fixed geometry: regions are read-only, clicks open a
    /// transcription target, and a second white-background panel mirrors the
    /// image panel's transform.
    Transcription,
}

impl Workflow {
    fn autosave_debounce(&self) -> Duration {
        match self {
            Workflow::Segmentation => SEGMENTATION_AUTOSAVE_DEBOUNCE,
            Workflow::Transcription => TRANSCRIPTION_AUTOSAVE_DEBOUNCE,
        }
    }
}

/// Errors that abort an editor operation (as opposed to transport failures
/// during save/poll, which surface on the status line and keep local state).
#[derive(Error, Debug)]
pub enum EditorError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The fetched image could not be decoded. Unrecoverable for this image.
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// In-progress vertex drag in edit mode.
#[derive(Debug, Clone, Copy)]
struct VertexDrag {
    region: RegionId,
    vertex: usize,
    moved: bool,
}

/// Interactive polygon-annotation editor for one image at a time.
pub struct AnnotationEditor<C: AnnotationClient> {
    client: C,
    bindings: KeyBindings,
    workflow: Workflow,
    panel_size: (f32, f32),

    images: Vec<String>,
    current_image: Option<String>,
    image: Option<ImageInfo>,
    pending: Option<PendingLoad>,
    /// Opaque workflow stage forwarded to the persistence payload.
    stage: Option<String>,

    store: RegionStore,
    history: HistoryManager,
    drawing: DrawingSession,
    viewport: ViewportController,
    /// Linked panel for the transcription view, kept in lockstep.
    text_panel: ViewportController,

    mode: EditorMode,
    autosave: AutoSaveManager,
    poller: DetectionPoller,
    vertex_drag: Option<VertexDrag>,
    transcribe_target: Option<RegionId>,
    status: String,
}

impl<C: AnnotationClient> AnnotationEditor<C> {
    /// Create an editor and fetch the image list. `panel_size` is the main
    /// panel's pixel size, used for fit-to-view on load.
    pub fn new(
        mut client: C,
        workflow: Workflow,
        panel_size: (f32, f32),
    ) -> Result<Self, ClientError> {
        let images = client.list_images()?;
        log::info!("Editor: {} images available", images.len());
        Ok(Self {
            client,
            bindings: KeyBindings::default(),
            workflow,
            panel_size,
            images,
            current_image: None,
            image: None,
            pending: None,
            stage: None,
            store: RegionStore::new(),
            history: HistoryManager::new(),
            drawing: DrawingSession::new(),
            viewport: ViewportController::new(ZoomLimits::new(
                IMAGE_PANEL_MIN_ZOOM,
                IMAGE_PANEL_MAX_ZOOM,
            )),
            text_panel: ViewportController::new(ZoomLimits::new(
                TEXT_PANEL_MIN_ZOOM,
                TEXT_PANEL_MAX_ZOOM,
            )),
            mode: EditorMode::Edit,
            autosave: AutoSaveManager::new(workflow.autosave_debounce()),
            poller: DetectionPoller::new(),
            vertex_drag: None,
            transcribe_target: None,
            status: String::new(),
        })
    }

    /// Override the autosave debounce (tests, host preference).
    pub fn with_autosave_debounce(mut self, debounce: Duration) -> Self {
        self.autosave = AutoSaveManager::new(debounce);
        self
    }

    pub fn with_bindings(mut self, bindings: KeyBindings) -> Self {
        self.bindings = bindings;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn current_image(&self) -> Option<&str> {
        self.current_image.as_deref()
    }

    pub fn image(&self) -> Option<&ImageInfo> {
        self.image.as_ref()
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn workflow(&self) -> Workflow {
        self.workflow
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn store(&self) -> &RegionStore {
        &self.store
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn autosave(&self) -> &AutoSaveManager {
        &self.autosave
    }

    pub fn drawing(&self) -> &DrawingSession {
        &self.drawing
    }

    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    pub fn text_panel(&self) -> &ViewportController {
        &self.text_panel
    }

    pub fn detection_active(&self) -> bool {
        self.poller.is_active()
    }

    pub fn transcribe_target(&self) -> Option<RegionId> {
        self.transcribe_target
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        log::debug!("Status: {}", self.status);
    }

    // ========================================================================
    // Image loading
    // ========================================================================

    /// Open an image, driving the client synchronously. Hosts with their own
    /// async fetching can instead call [`Self::begin_open`] and the two
    /// `supply_*` methods in any order.
    pub fn open(&mut self, name: &str) -> Result<(), EditorError> {
        self.begin_open(name);
        let bytes = self.client.fetch_image(name)?;
        let info = ImageInfo::decode(name, &bytes)?;
        self.supply_image(info);
        let payload = match self.client.load_annotation(name) {
            Ok(payload) => payload,
            Err(ClientError::NotFound(_)) => AnnotationPayload::empty(name),
            Err(e) => return Err(e.into()),
        };
        self.supply_annotation(payload);
        Ok(())
    }

    /// Start navigating to `name`: tears down all per-image session state
    /// (pending autosave, drawing session, detection poll, selection) so
    /// nothing from the previous image can fire afterwards.
    pub fn begin_open(&mut self, name: &str) {
        log::info!("Opening image '{}'", name);
        self.drawing.abort();
        self.autosave.reset();
        self.poller.cancel();
        self.vertex_drag = None;
        self.transcribe_target = None;
        self.store.clear_selection();
        self.stage = None;
        self.image = None;
        self.current_image = Some(name.to_string());
        self.pending = Some(PendingLoad::new(name));
        self.set_status("loading...");
    }

    /// Deliver a decoded image for the load in progress. Stale completions
    /// (filename mismatch) are discarded. Returns whether it was accepted.
    pub fn supply_image(&mut self, info: ImageInfo) -> bool {
        let Some(pending) = &mut self.pending else {
            log::debug!("Ignoring image completion for '{}': no load pending", info.name);
            return false;
        };
        if !pending.offer_image(info) {
            return false;
        }
        self.try_finalize_load();
        true
    }

    /// Deliver the annotation payload for the load in progress; stale
    /// completions are discarded.
    pub fn supply_annotation(&mut self, payload: AnnotationPayload) -> bool {
        let Some(pending) = &mut self.pending else {
            log::debug!(
                "Ignoring annotation completion for '{}': no load pending",
                payload.image_name
            );
            return false;
        };
        if !pending.offer_payload(payload) {
            return false;
        }
        self.try_finalize_load();
        true
    }

    /// Once both the image and the payload are present: establish the
    /// viewport transform, place the regions, and only then baseline the
    /// history and autosave clocks.
    fn try_finalize_load(&mut self) {
        if !self.pending.as_ref().is_some_and(PendingLoad::is_ready) {
            return;
        }
        let Some((info, payload)) = self.pending.take().and_then(PendingLoad::into_parts) else {
            return;
        };

        self.viewport
            .fit_to(info.width, info.height, self.panel_size.0, self.panel_size.1);
        self.sync_panels();

        self.store = RegionStore::new();
        for (index, wire) in payload.regions.iter().enumerate() {
            match self.store.add(wire.to_points()) {
                Some(id) => {
                    if let Some(text) = payload.texts.get(&index) {
                        self.store.set_text(id, text.clone());
                    }
                }
                None => log::warn!(
                    "Skipping stored region {} with {} points",
                    index,
                    wire.points.len()
                ),
            }
        }
        self.stage = payload.status;
        self.image = Some(info);

        self.history.reset(&self.store);
        self.autosave.reset();
        self.set_status("loaded");
    }

    fn open_neighbor(&mut self, offset: isize) -> Result<(), EditorError> {
        let Some(current) = self.current_image.as_deref() else {
            return Ok(());
        };
        let Some(index) = self.images.iter().position(|n| n == current) else {
            return Ok(());
        };
        let target = index as isize + offset;
        if target < 0 || target as usize >= self.images.len() {
            return Ok(());
        }
        let name = self.images[target as usize].clone();
        self.open(&name)
    }

    // ========================================================================
    // Input handling
    // ========================================================================

    pub fn handle_event(&mut self, event: EditorEvent) {
        match event {
            EditorEvent::Wheel { pos, delta } => {
                let factor = if delta > 0.0 { 1.1 } else { 1.0 / 1.1 };
                self.viewport.zoom_at(pos, factor);
                self.sync_panels();
            }
            EditorEvent::PointerDown {
                pos,
                button: MouseButton::Middle,
                ..
            } => {
                self.viewport.begin_drag(pos);
            }
            EditorEvent::PointerDown {
                pos,
                button: MouseButton::Left,
                modifiers,
            } => {
                self.on_left_down(pos, modifiers);
            }
            EditorEvent::PointerDown { .. } => {}
            EditorEvent::PointerMove { pos } => {
                self.on_pointer_move(pos);
            }
            EditorEvent::PointerUp {
                button: MouseButton::Middle,
            } => {
                self.viewport.end_drag();
            }
            EditorEvent::PointerUp {
                button: MouseButton::Left,
            } => {
                self.on_left_up();
            }
            EditorEvent::PointerUp { .. } => {}
        }
    }

    fn on_left_down(&mut self, pos: Point, modifiers: Modifiers) {
        if self.workflow == Workflow::Transcription {
            // Regions are deliberately non-interactive here; resolve the
            // click with the explicit point-in-polygon test.
            let image_point = self.viewport.transform().to_image(pos);
            self.transcribe_target = self.store.hit_test(&image_point);
            return;
        }

        match self.mode {
            EditorMode::Draw => {
                let transform = *self.viewport.transform();
                if let Placement::Closed(points) = self.drawing.place(pos, &transform) {
                    if self.store.add(points).is_some() {
                        self.commit_mutation();
                    }
                }
            }
            EditorMode::Edit => {
                if let Some((region, vertex)) = self.find_vertex_at(pos) {
                    self.vertex_drag = Some(VertexDrag {
                        region,
                        vertex,
                        moved: false,
                    });
                    return;
                }
                let image_point = self.viewport.transform().to_image(pos);
                match self.store.hit_test(&image_point) {
                    Some(id) => {
                        if modifiers.shift {
                            self.store.toggle_select(id);
                        } else {
                            self.store.clear_selection();
                            self.store.select(id);
                        }
                    }
                    None => self.store.clear_selection(),
                }
            }
        }
    }

    fn on_pointer_move(&mut self, pos: Point) {
        if self.viewport.is_dragging() {
            self.viewport.drag_to(pos);
            self.sync_panels();
            return;
        }
        if let Some(drag) = &mut self.vertex_drag {
            let image_point = self.viewport.transform().to_image(pos);
            if self.store.move_vertex(drag.region, drag.vertex, image_point) {
                drag.moved = true;
            }
        }
    }

    fn on_left_up(&mut self) {
        if let Some(drag) = self.vertex_drag.take() {
            // One history entry per completed drag, not per move event.
            if drag.moved {
                self.commit_mutation();
            }
        }
    }

    /// Find a polygon vertex within grab distance of `pos` (viewport space),
    /// topmost region first.
    fn find_vertex_at(&self, pos: Point) -> Option<(RegionId, usize)> {
        let transform = self.viewport.transform();
        let ids: Vec<RegionId> = self.store.iter().map(|r| r.id()).collect();
        for id in ids.into_iter().rev() {
            let region = self.store.get(id)?;
            for (i, vertex) in region.polygon().vertices.iter().enumerate() {
                if transform.to_viewport(*vertex).distance_to(&pos) <= VERTEX_HANDLE_RADIUS {
                    return Some((id, i));
                }
            }
        }
        None
    }

    pub fn handle_key(&mut self, key: Key, modifiers: Modifiers) -> Result<(), EditorError> {
        match self.bindings.action_for(key, modifiers) {
            Some(action) => self.apply_action(action),
            None => Ok(()),
        }
    }

    pub fn apply_action(&mut self, action: EditorAction) -> Result<(), EditorError> {
        match action {
            EditorAction::SetEditMode => {
                self.set_mode(EditorMode::Edit);
            }
            EditorAction::SetDrawMode => {
                self.set_mode(EditorMode::Draw);
            }
            EditorAction::DeleteSelected => {
                let selected = self.store.selected_ids();
                if !selected.is_empty() && self.store.remove(&selected) > 0 {
                    self.commit_mutation();
                }
            }
            EditorAction::SelectAll => {
                if self.workflow == Workflow::Segmentation && self.mode == EditorMode::Edit {
                    self.store.select_all();
                }
            }
            EditorAction::Undo => self.undo(),
            EditorAction::Redo => self.redo(),
            EditorAction::Save => self.save_now(),
            EditorAction::Cancel => {
                self.drawing.abort();
                self.transcribe_target = None;
            }
            EditorAction::BringForward => self.apply_z_order(RegionStore::bring_forward, true),
            EditorAction::SendBackward => self.apply_z_order(RegionStore::send_backward, false),
            EditorAction::BringToFront => self.apply_z_order(RegionStore::bring_to_front, false),
            EditorAction::SendToBack => self.apply_z_order(RegionStore::send_to_back, true),
            EditorAction::PrevImage => return self.open_neighbor(-1),
            EditorAction::NextImage => return self.open_neighbor(1),
            EditorAction::RunDetection => self.request_detection(),
        }
        Ok(())
    }

    /// Switch between edit and draw. Entering draw mode discards the
    /// selection; any in-progress drawing is discarded on every switch.
    /// No-op in the transcription workflow, where geometry is read-only.
    pub fn set_mode(&mut self, mode: EditorMode) {
        if self.workflow == Workflow::Transcription {
            return;
        }
        self.drawing.abort();
        if mode == EditorMode::Draw {
            self.store.clear_selection();
        }
        self.mode = mode;
        log::debug!("Mode: {:?}", mode);
    }

    fn apply_z_order(&mut self, op: fn(&mut RegionStore, RegionId) -> bool, frontmost_first: bool) {
        if self.workflow == Workflow::Transcription {
            return;
        }
        let mut selected = self.store.selected_ids();
        if frontmost_first {
            selected.reverse();
        }
        let mut changed = false;
        for id in selected {
            changed |= op(&mut self.store, id);
        }
        if changed {
            self.commit_mutation();
        }
    }

    // ========================================================================
    // History and autosave
    // ========================================================================

    /// Record a committed mutation: push a history snapshot and restart the
    /// autosave debounce. Suppressed while a history restore is applying its
    /// snapshot, which is what keeps the restore from recording itself.
    fn commit_mutation(&mut self) {
        if self.history.is_restoring() {
            log::trace!("Mutation during restore; not recorded");
            return;
        }
        self.history.save(&self.store);
        self.autosave.mark_dirty();
    }

    pub fn undo(&mut self) {
        if self.history.undo(&mut self.store) {
            self.transcribe_target = None;
            self.autosave.mark_dirty();
        }
    }

    pub fn redo(&mut self) {
        if self.history.redo(&mut self.store) {
            self.transcribe_target = None;
            self.autosave.mark_dirty();
        }
    }

    /// Drive the editor's clocks. Call once per frame.
    pub fn tick(&mut self) {
        if self.autosave.should_save() {
            self.save_now();
        }
        if self.poller.due() {
            self.poll_detection();
        }
    }

    /// Write the current region set to the persistence collaborator.
    ///
    /// A transport failure keeps all local state, marks the save as failed
    /// (explicit retry required) and surfaces on the status line.
    pub fn save_now(&mut self) {
        let Some(name) = self.current_image.clone() else {
            return;
        };
        if self.image.is_none() {
            return;
        }
        let payload = AnnotationPayload::from_store(&name, &self.store, self.stage.clone());
        self.set_status("saving...");
        match self.client.save_annotation(&payload) {
            Ok(()) => {
                self.autosave.mark_saved();
                self.set_status("saved");
            }
            Err(e) => {
                log::warn!("Save failed for '{}': {}", name, e);
                self.autosave.mark_save_failed();
                self.set_status("error saving");
            }
        }
    }

    /// Set the opaque workflow stage included in saved payloads.
    pub fn set_stage(&mut self, stage: Option<String>) {
        self.stage = stage;
    }

    // ========================================================================
    // Detection
    // ========================================================================

    /// Ask the ML collaborator to detect text lines on the current image.
    /// Results replace the region set wholesale.
    pub fn request_detection(&mut self) {
        let Some(name) = self.current_image.clone() else {
            return;
        };
        match self.client.run_detection(&name) {
            Ok(DetectionResponse::Accepted) => {
                self.poller.start(name);
                self.set_status("detecting...");
            }
            Ok(DetectionResponse::Regions(regions)) => {
                self.splice_detected(regions.iter().map(|r| r.to_points()).collect());
            }
            Err(e) => {
                log::warn!("Detection request failed for '{}': {}", name, e);
                self.set_status("detection failed");
            }
        }
    }

    fn poll_detection(&mut self) {
        let Some(image) = self.poller.image().map(str::to_string) else {
            return;
        };
        match self.client.detection_progress(&image) {
            Ok(progress) => {
                self.poller.note_polled();
                match progress.state {
                    DetectionState::Completed => {
                        self.poller.finish();
                        // The poller was cancelled on navigation, so this can
                        // only be the current image; guard anyway.
                        if self.current_image.as_deref() != Some(image.as_str()) {
                            log::debug!("Discarding detection result for stale '{}'", image);
                            return;
                        }
                        match self.client.load_annotation(&image) {
                            Ok(payload) => {
                                self.splice_detected(
                                    payload.regions.iter().map(|r| r.to_points()).collect(),
                                );
                            }
                            Err(e) => {
                                log::warn!("Fetching detection result failed: {}", e);
                                self.set_status("detection failed");
                            }
                        }
                    }
                    DetectionState::Pending => {
                        self.set_status(format!("detecting... {:.0}%", progress.percentage));
                    }
                }
            }
            Err(e) => {
                log::warn!("Detection poll failed for '{}': {}", image, e);
                self.poller.cancel();
                self.set_status("detection failed");
            }
        }
    }

    fn splice_detected(&mut self, point_lists: Vec<Vec<Point>>) {
        let count = self.store.replace_all(point_lists);
        self.transcribe_target = None;
        self.commit_mutation();
        self.set_status(format!("detected {} regions", count));
    }

    // ========================================================================
    // Transcription workflow
    // ========================================================================

    /// Reading order of the current regions (top-to-bottom rows, then
    /// left-to-right).
    pub fn reading_order(&self) -> Vec<RegionId> {
        self.store.reading_order()
    }

    /// Texts in display (reading) order. Missing text shows as empty.
    pub fn display_texts(&self) -> Vec<String> {
        self.store
            .reading_order()
            .into_iter()
            .map(|id| self.store.text(id).unwrap_or_default().to_string())
            .collect()
    }

    /// Store the text entered for the active transcription target, then
    /// advance to the next region in reading order. Returns the new target.
    pub fn submit_transcription(&mut self, text: &str) -> Option<RegionId> {
        let target = self.transcribe_target?;
        if self.store.set_text(target, text) {
            self.commit_mutation();
        }
        let order = self.store.reading_order();
        let next = order
            .iter()
            .position(|&id| id == target)
            .and_then(|i| order.get(i + 1).copied());
        self.transcribe_target = next;
        next
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Whether the region set changed since the last [`Self::render`] call.
    pub fn needs_render(&self) -> bool {
        self.store.is_dirty()
    }

    /// Hand the current frame to the rendering adapter: regions in storage
    /// (z) order, label overlays for every transcribed region.
    pub fn render(&mut self, adapter: &mut dyn RenderAdapter) {
        let transform = *self.viewport.transform();
        let regions: Vec<RegionView> = self
            .store
            .iter()
            .map(|r| RegionView {
                id: r.id(),
                points: r
                    .polygon()
                    .vertices
                    .iter()
                    .map(|p| transform.to_viewport(*p))
                    .collect(),
                selected: self.store.is_selected(r.id()),
                has_text: r.has_text(),
            })
            .collect();
        let labels: Vec<TextLabel> = self
            .store
            .iter()
            .filter(|r| r.has_text())
            .filter_map(|r| render::layout_label(r.id(), r.polygon(), r.text(), &transform))
            .collect();
        adapter.render(&regions, &labels, &transform);
        self.store.clear_dirty();
    }

    fn sync_panels(&mut self) {
        if self.workflow == Workflow::Transcription {
            self.text_panel.sync_from(self.viewport.transform());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::client::{DetectionProgress, PointWire, RegionWire};
    use crate::render::RecordingAdapter;

    // ========================================================================
    // Mock client
    // ========================================================================

    #[derive(Default)]
    struct MockClient {
        images: Vec<String>,
        payloads: HashMap<String, AnnotationPayload>,
        bytes: HashMap<String, Vec<u8>>,
        fail_saves: bool,
        saves: usize,
        detection_regions: Vec<RegionWire>,
        progress_polls: usize,
    }

    fn tiny_png() -> Vec<u8> {
        let mut png = Vec::new();
        image::RgbaImage::new(200, 100)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        png
    }

    impl MockClient {
        fn with_images(names: &[&str]) -> Self {
            let png = tiny_png();
            let mut client = MockClient::default();
            for name in names {
                client.images.push(name.to_string());
                client.bytes.insert(name.to_string(), png.clone());
            }
            client
        }
    }

    impl AnnotationClient for MockClient {
        fn list_images(&mut self) -> Result<Vec<String>, ClientError> {
            Ok(self.images.clone())
        }

        fn fetch_image(&mut self, image: &str) -> Result<Vec<u8>, ClientError> {
            self.bytes
                .get(image)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(image.to_string()))
        }

        fn load_annotation(&mut self, image: &str) -> Result<AnnotationPayload, ClientError> {
            Ok(self
                .payloads
                .get(image)
                .cloned()
                .unwrap_or_else(|| AnnotationPayload::empty(image)))
        }

        fn save_annotation(&mut self, payload: &AnnotationPayload) -> Result<(), ClientError> {
            if self.fail_saves {
                return Err(ClientError::Transport("connection refused".into()));
            }
            self.saves += 1;
            self.payloads
                .insert(payload.image_name.clone(), payload.clone());
            Ok(())
        }

        fn run_detection(&mut self, _image: &str) -> Result<DetectionResponse, ClientError> {
            Ok(DetectionResponse::Accepted)
        }

        fn detection_progress(&mut self, image: &str) -> Result<DetectionProgress, ClientError> {
            self.progress_polls += 1;
            // Completed on the first poll; the detected regions are stored
            // server-side like the real backend does.
            self.payloads.insert(
                image.to_string(),
                AnnotationPayload {
                    image_name: image.to_string(),
                    regions: self.detection_regions.clone(),
                    texts: Default::default(),
                    status: None,
                },
            );
            Ok(DetectionProgress {
                state: DetectionState::Completed,
                percentage: 100.0,
            })
        }
    }

    fn wire(points: &[(i32, i32)]) -> RegionWire {
        RegionWire::new(points.iter().map(|&(x, y)| PointWire::new(x, y)).collect())
    }

    fn editor_with(
        client: MockClient,
        workflow: Workflow,
    ) -> AnnotationEditor<MockClient> {
        AnnotationEditor::new(client, workflow, (400.0, 400.0))
            .unwrap()
            .with_autosave_debounce(Duration::ZERO)
    }

    fn draw_triangle(editor: &mut AnnotationEditor<MockClient>) {
        editor.set_mode(EditorMode::Draw);
        // Identity-independent: place via viewport coords derived from the
        // current transform.
        let t = *editor.viewport().transform();
        for p in [
            Point::new(10.0, 10.0),
            Point::new(60.0, 10.0),
            Point::new(60.0, 40.0),
        ] {
            editor.handle_event(EditorEvent::PointerDown {
                pos: t.to_viewport(p),
                button: MouseButton::Left,
                modifiers: Modifiers::NONE,
            });
        }
        // Close with a click back on the start vertex.
        editor.handle_event(EditorEvent::PointerDown {
            pos: t.to_viewport(Point::new(10.0, 10.0)),
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        });
        editor.set_mode(EditorMode::Edit);
    }

    // ========================================================================
    // Loading
    // ========================================================================

    #[test]
    fn test_open_places_regions_and_baselines_history() {
        let mut client = MockClient::with_images(&["a.jpg"]);
        client.payloads.insert(
            "a.jpg".into(),
            AnnotationPayload {
                image_name: "a.jpg".into(),
                regions: vec![wire(&[(0, 0), (50, 0), (50, 20)]), wire(&[(0, 40), (50, 40), (50, 60)])],
                texts: [(1usize, "zeile".to_string())].into_iter().collect(),
                status: Some("segment".into()),
            },
        );
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.open("a.jpg").unwrap();

        assert_eq!(editor.store().len(), 2);
        let second = editor.store().id_at(1).unwrap();
        assert_eq!(editor.store().text(second), Some("zeile"));
        assert_eq!(editor.history().depth(), 1);
        assert!(!editor.autosave().is_dirty());
        assert_eq!(editor.status(), "loaded");
        // Fit: 200x100 image in a 400x400 panel -> zoom 2.
        assert_eq!(editor.viewport().zoom(), 2.0);
    }

    #[test]
    fn test_stale_completions_ignored_after_navigation() {
        let client = MockClient::with_images(&["a.jpg", "b.jpg"]);
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.begin_open("b.jpg");

        // Results for a superseded load of a.jpg arrive late.
        assert!(!editor.supply_annotation(AnnotationPayload::empty("a.jpg")));
        let stale = ImageInfo {
            name: "a.jpg".into(),
            width: 10,
            height: 10,
        };
        assert!(!editor.supply_image(stale));
        assert!(editor.image().is_none());
    }

    #[test]
    fn test_load_halves_in_either_order() {
        let client = MockClient::with_images(&["a.jpg"]);
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.begin_open("a.jpg");

        // Annotation first, then image: nothing final until both are in.
        assert!(editor.supply_annotation(AnnotationPayload::empty("a.jpg")));
        assert!(editor.image().is_none());
        assert!(editor.supply_image(ImageInfo {
            name: "a.jpg".into(),
            width: 200,
            height: 100,
        }));
        assert!(editor.image().is_some());
        assert_eq!(editor.history().depth(), 1);
    }

    // ========================================================================
    // Drawing and editing
    // ========================================================================

    #[test]
    fn test_draw_click_close_creates_region() {
        let client = MockClient::with_images(&["a.jpg"]);
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.open("a.jpg").unwrap();

        draw_triangle(&mut editor);
        assert_eq!(editor.store().len(), 1);
        assert_eq!(editor.history().depth(), 2);
        assert!(editor.autosave().is_dirty());
        assert!(!editor.drawing().is_active());
    }

    #[test]
    fn test_mode_switch_discards_drawing_and_selection() {
        let client = MockClient::with_images(&["a.jpg"]);
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.open("a.jpg").unwrap();
        draw_triangle(&mut editor);

        // Select the region, then place one loose point in draw mode.
        let id = editor.store().id_at(0).unwrap();
        editor.store.select(id);
        editor.set_mode(EditorMode::Draw);
        assert!(editor.store().selected_ids().is_empty());

        editor.handle_event(EditorEvent::PointerDown {
            pos: Point::new(5.0, 5.0),
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        });
        assert!(editor.drawing().is_active());
        editor.set_mode(EditorMode::Edit);
        assert!(!editor.drawing().is_active());
        // The loose point never became a region.
        assert_eq!(editor.store().len(), 1);
    }

    #[test]
    fn test_delete_selected_commits_one_snapshot() {
        let client = MockClient::with_images(&["a.jpg"]);
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.open("a.jpg").unwrap();
        draw_triangle(&mut editor);

        let depth_before = editor.history().depth();
        editor.apply_action(EditorAction::SelectAll).unwrap();
        editor.apply_action(EditorAction::DeleteSelected).unwrap();
        assert!(editor.store().is_empty());
        assert_eq!(editor.history().depth(), depth_before + 1);
    }

    #[test]
    fn test_undo_redo_wiring() {
        let client = MockClient::with_images(&["a.jpg"]);
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.open("a.jpg").unwrap();
        draw_triangle(&mut editor);

        let depth_before = editor.history().depth();
        editor.undo();
        assert!(editor.store().is_empty());
        // Restoration itself must not grow the history.
        assert_eq!(editor.history().depth(), depth_before - 1);

        editor.redo();
        assert_eq!(editor.store().len(), 1);
        assert_eq!(editor.history().depth(), depth_before);
        assert!(editor.autosave().is_dirty());
    }

    // ========================================================================
    // Autosave
    // ========================================================================

    #[test]
    fn test_autosave_fires_after_quiescence() {
        let client = MockClient::with_images(&["a.jpg"]);
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.open("a.jpg").unwrap();
        draw_triangle(&mut editor);

        editor.tick();
        assert_eq!(editor.client.saves, 1);
        assert_eq!(editor.status(), "saved");

        // Quiesced: no duplicate save on the next tick.
        editor.tick();
        assert_eq!(editor.client.saves, 1);
    }

    #[test]
    fn test_save_failure_keeps_state_and_waits_for_retry() {
        let mut client = MockClient::with_images(&["a.jpg"]);
        client.fail_saves = true;
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.open("a.jpg").unwrap();
        draw_triangle(&mut editor);

        editor.tick();
        assert_eq!(editor.status(), "error saving");
        assert_eq!(editor.store().len(), 1);
        assert!(editor.autosave().is_dirty());

        // No automatic retry.
        editor.tick();
        assert_eq!(editor.status(), "error saving");

        // The next mutation re-arms the autosave.
        editor.client.fail_saves = false;
        draw_triangle(&mut editor);
        editor.tick();
        assert_eq!(editor.status(), "saved");
        assert_eq!(editor.client.saves, 1);
    }

    #[test]
    fn test_navigation_cancels_pending_autosave() {
        let client = MockClient::with_images(&["a.jpg", "b.jpg"]);
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.open("a.jpg").unwrap();
        draw_triangle(&mut editor);
        assert!(editor.autosave().is_pending());

        // Navigating away must drop the pending save for a.jpg... but the
        // open itself saves nothing, so the region drawn on a.jpg was lost
        // intentionally only from the schedule, not persisted.
        editor.apply_action(EditorAction::NextImage).unwrap();
        assert_eq!(editor.current_image(), Some("b.jpg"));
        editor.tick();
        assert_eq!(editor.client.saves, 0);
    }

    // ========================================================================
    // Detection
    // ========================================================================

    #[test]
    fn test_detection_poll_splices_regions() {
        let mut client = MockClient::with_images(&["a.jpg"]);
        client.detection_regions = vec![
            wire(&[(0, 0), (50, 0), (50, 20)]),
            wire(&[(0, 40), (50, 40), (50, 60)]),
        ];
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.open("a.jpg").unwrap();

        editor.apply_action(EditorAction::RunDetection).unwrap();
        assert!(editor.detection_active());

        // First poll is due immediately and completes the job.
        editor.tick();
        assert!(!editor.detection_active());
        assert_eq!(editor.store().len(), 2);
        assert_eq!(editor.history().depth(), 2);
        assert!(editor.autosave().is_dirty());
    }

    #[test]
    fn test_navigation_cancels_detection_poll() {
        let client = MockClient::with_images(&["a.jpg", "b.jpg"]);
        let mut editor = editor_with(client, Workflow::Segmentation);
        editor.open("a.jpg").unwrap();
        editor.apply_action(EditorAction::RunDetection).unwrap();
        assert!(editor.detection_active());

        editor.open("b.jpg").unwrap();
        assert!(!editor.detection_active());
        editor.tick();
        assert_eq!(editor.client.progress_polls, 0);
    }

    // ========================================================================
    // Transcription
    // ========================================================================

    fn transcription_editor() -> AnnotationEditor<MockClient> {
        let mut client = MockClient::with_images(&["a.jpg"]);
        // Storage order: y=100/x=80, y=105/x=10, y=50/x=0.
        // Reading order: index 2, index 1, index 0.
        client.payloads.insert(
            "a.jpg".into(),
            AnnotationPayload {
                image_name: "a.jpg".into(),
                regions: vec![
                    wire(&[(80, 100), (120, 100), (120, 108)]),
                    wire(&[(10, 105), (50, 105), (50, 113)]),
                    wire(&[(0, 50), (40, 50), (40, 58)]),
                ],
                texts: Default::default(),
                status: None,
            },
        );
        let mut editor = editor_with(client, Workflow::Transcription);
        editor.open("a.jpg").unwrap();
        editor
    }

    #[test]
    fn test_transcription_click_resolves_by_polygon_test() {
        let mut editor = transcription_editor();
        let t = *editor.viewport().transform();
        // Click inside the y=50 region.
        editor.handle_event(EditorEvent::PointerDown {
            pos: t.to_viewport(Point::new(20.0, 53.0)),
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        });
        let target = editor.transcribe_target().unwrap();
        assert_eq!(editor.store().storage_index(target), Some(2));

        // A miss clears the target.
        editor.handle_event(EditorEvent::PointerDown {
            pos: t.to_viewport(Point::new(190.0, 90.0)),
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        });
        assert!(editor.transcribe_target().is_none());
    }

    #[test]
    fn test_transcription_advances_in_reading_order() {
        let mut editor = transcription_editor();
        let order = editor.reading_order();
        editor.transcribe_target = Some(order[0]);

        let next = editor.submit_transcription("first").unwrap();
        assert_eq!(next, order[1]);
        let next = editor.submit_transcription("second").unwrap();
        assert_eq!(next, order[2]);
        assert!(editor.submit_transcription("third").is_none());

        assert_eq!(editor.display_texts(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_texts_keyed_by_storage_order_round_trip() {
        let mut editor = transcription_editor();
        let order = editor.reading_order();
        // Display index 1 is the y=105 region, stored at index 1... assign a
        // distinctive text at display position 1.
        editor.transcribe_target = Some(order[1]);
        editor.submit_transcription("mittlere Zeile");
        editor.save_now();

        // Display index 1 corresponds to storage index 1 here, but the saved
        // key must be the storage index regardless of display order.
        let storage_idx = editor.store().storage_index(order[1]).unwrap();
        let saved = editor.client.payloads.get("a.jpg").unwrap().clone();
        assert_eq!(
            saved.texts.get(&storage_idx).map(String::as_str),
            Some("mittlere Zeile")
        );

        // Reload into a fresh editor: the text appears at the same display
        // index even though storage order differs from display order.
        let mut client = MockClient::with_images(&["a.jpg"]);
        client.payloads.insert("a.jpg".into(), saved);
        let mut second = editor_with(client, Workflow::Transcription);
        second.open("a.jpg").unwrap();
        assert_eq!(second.display_texts()[1], "mittlere Zeile");
        assert_eq!(second.display_texts()[0], "");
    }

    #[test]
    fn test_transcription_geometry_is_read_only() {
        let mut editor = transcription_editor();
        editor.set_mode(EditorMode::Draw);
        assert_eq!(editor.mode(), EditorMode::Edit);

        let t = *editor.viewport().transform();
        editor.handle_event(EditorEvent::PointerDown {
            pos: t.to_viewport(Point::new(20.0, 53.0)),
            button: MouseButton::Left,
            modifiers: Modifiers::NONE,
        });
        // The click targeted a transcription, not a selection or a vertex.
        assert!(editor.store().selected_ids().is_empty());
        assert_eq!(editor.store().len(), 3);
    }

    // ========================================================================
    // Panels and rendering
    // ========================================================================

    #[test]
    fn test_text_panel_mirrors_viewport() {
        let mut editor = transcription_editor();
        editor.handle_event(EditorEvent::Wheel {
            pos: Point::new(100.0, 100.0),
            delta: 1.0,
        });
        assert_eq!(editor.text_panel().transform(), editor.viewport().transform());

        // Middle-drag panning stays mirrored too.
        editor.handle_event(EditorEvent::PointerDown {
            pos: Point::new(50.0, 50.0),
            button: MouseButton::Middle,
            modifiers: Modifiers::NONE,
        });
        editor.handle_event(EditorEvent::PointerMove {
            pos: Point::new(80.0, 60.0),
        });
        editor.handle_event(EditorEvent::PointerUp {
            button: MouseButton::Middle,
        });
        assert_eq!(editor.text_panel().transform(), editor.viewport().transform());
    }

    #[test]
    fn test_render_emits_labels_for_transcribed_regions() {
        let mut editor = transcription_editor();
        let order = editor.reading_order();
        editor.transcribe_target = Some(order[0]);
        editor.submit_transcription("text");

        let mut adapter = RecordingAdapter::default();
        editor.render(&mut adapter);
        assert_eq!(adapter.frames, 1);
        assert_eq!(adapter.last_regions.len(), 3);
        assert_eq!(adapter.last_labels.len(), 1);
        assert_eq!(adapter.last_labels[0].text, "text");
        assert!(!editor.needs_render());
    }
}
