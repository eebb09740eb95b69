//! Region data model and store.
//!
//! A [`Region`] is a user-drawn polygon over the current image plus the text
//! transcribed for it. The [`RegionStore`] owns the ordered list of regions
//! for one image: order is the storage order used for persistence and
//! z-ordering, and a separate reading order (top-to-bottom rows, then
//! left-to-right) is derived on demand for the transcription workflow.
//!
//! Regions carry a stable [`RegionId`] assigned at creation, so identity
//! survives reordering and sorting. The wire format carries no ids; texts
//! travel keyed by storage-order index instead (see [`crate::client`]).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::constants::ROW_GROUP_THRESHOLD;
use crate::geometry::{Point, Polygon};

/// Stable, opaque identifier for a region within one editing session.
///
/// Ids are never reused within a session, including across undo/redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(u64);

impl RegionId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A polygon region with its transcribed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    id: RegionId,
    polygon: Polygon,
    #[serde(default)]
    text: String,
}

impl Region {
    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn polygon(&self) -> &Polygon {
        &self.polygon
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn has_text(&self) -> bool {
        !self.text.is_empty()
    }
}

/// Serialized form of the store used for history snapshots.
#[derive(Debug, Serialize, Deserialize)]
struct StoreSnapshot {
    next_id: u64,
    regions: Vec<Region>,
}

/// Ordered storage for the regions of the current image.
#[derive(Debug, Clone, Default)]
pub struct RegionStore {
    regions: Vec<Region>,
    next_id: u64,
    selected: HashSet<RegionId>,
    /// Set when regions or selection change. Cleared by the render pass.
    dirty: bool,
}

impl RegionStore {
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            next_id: 1,
            selected: HashSet::new(),
            dirty: true,
        }
    }

    // ========================================================================
    // Dirty tracking
    // ========================================================================

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    // ========================================================================
    // Basic operations
    // ========================================================================

    /// Append a new region. Returns `None` (and leaves the store untouched)
    /// if fewer than 3 points are given.
    pub fn add(&mut self, points: Vec<Point>) -> Option<RegionId> {
        if points.len() < 3 {
            log::debug!("Rejected region with {} points", points.len());
            return None;
        }
        let id = RegionId(self.next_id);
        self.next_id += 1;
        self.regions.push(Region {
            id,
            polygon: Polygon::new(points),
            text: String::new(),
        });
        self.mark_dirty();
        Some(id)
    }

    /// Remove the given regions. Unknown ids are ignored; remaining regions
    /// keep their relative order. Returns the number actually removed.
    pub fn remove(&mut self, ids: &[RegionId]) -> usize {
        let doomed: HashSet<RegionId> = ids.iter().copied().collect();
        let before = self.regions.len();
        self.regions.retain(|r| !doomed.contains(&r.id));
        let removed = before - self.regions.len();
        if removed > 0 {
            self.selected.retain(|id| !doomed.contains(id));
            self.mark_dirty();
        }
        removed
    }

    /// Replace a region's geometry in place, preserving its text. No-op if
    /// the id is unknown or fewer than 3 points are given.
    pub fn update_points(&mut self, id: RegionId, points: Vec<Point>) -> bool {
        if points.len() < 3 {
            return false;
        }
        let Some(region) = self.regions.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        region.polygon = Polygon::new(points);
        self.mark_dirty();
        true
    }

    /// Move a single vertex of a region. No-op on unknown id or vertex index.
    pub fn move_vertex(&mut self, id: RegionId, vertex: usize, to: Point) -> bool {
        let Some(region) = self.regions.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        let Some(v) = region.polygon.vertices.get_mut(vertex) else {
            return false;
        };
        *v = to;
        self.mark_dirty();
        true
    }

    pub fn set_text(&mut self, id: RegionId, text: impl Into<String>) -> bool {
        let Some(region) = self.regions.iter_mut().find(|r| r.id == id) else {
            return false;
        };
        region.text = text.into();
        self.mark_dirty();
        true
    }

    pub fn text(&self, id: RegionId) -> Option<&str> {
        self.get(id).map(|r| r.text())
    }

    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Position of a region in storage order.
    pub fn storage_index(&self, id: RegionId) -> Option<usize> {
        self.regions.iter().position(|r| r.id == id)
    }

    pub fn id_at(&self, index: usize) -> Option<RegionId> {
        self.regions.get(index).map(|r| r.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn clear(&mut self) {
        if !self.regions.is_empty() {
            self.mark_dirty();
        }
        self.regions.clear();
        self.selected.clear();
    }

    /// Replace the whole region set (e.g. with detection results). Point
    /// lists with fewer than 3 points are skipped. Returns how many regions
    /// were created.
    pub fn replace_all(&mut self, point_lists: Vec<Vec<Point>>) -> usize {
        self.clear();
        let mut added = 0;
        for points in point_lists {
            if self.add(points).is_some() {
                added += 1;
            }
        }
        self.mark_dirty();
        added
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select(&mut self, id: RegionId) {
        if self.get(id).is_some() && self.selected.insert(id) {
            self.mark_dirty();
        }
    }

    pub fn toggle_select(&mut self, id: RegionId) {
        if self.get(id).is_none() {
            return;
        }
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
        self.mark_dirty();
    }

    pub fn select_all(&mut self) {
        self.selected = self.regions.iter().map(|r| r.id).collect();
        self.mark_dirty();
    }

    pub fn clear_selection(&mut self) {
        if !self.selected.is_empty() {
            self.mark_dirty();
        }
        self.selected.clear();
    }

    pub fn is_selected(&self, id: RegionId) -> bool {
        self.selected.contains(&id)
    }

    /// Selected ids in storage order.
    pub fn selected_ids(&self) -> Vec<RegionId> {
        self.regions
            .iter()
            .filter(|r| self.selected.contains(&r.id))
            .map(|r| r.id)
            .collect()
    }

    // ========================================================================
    // Hit testing
    // ========================================================================

    /// Find the topmost region containing the given image-space point.
    /// Later storage order means drawn later, i.e. closer to the front.
    pub fn hit_test(&self, point: &Point) -> Option<RegionId> {
        self.regions
            .iter()
            .rev()
            .find(|r| r.polygon.contains(point))
            .map(|r| r.id)
    }

    // ========================================================================
    // Ordering
    // ========================================================================

    /// Apply a full permutation of the current ids. Rejected (returning
    /// `false`, store untouched) unless `order` contains exactly the current
    /// ids, each exactly once.
    pub fn reorder(&mut self, order: &[RegionId]) -> bool {
        if order.len() != self.regions.len() {
            return false;
        }
        let requested: HashSet<RegionId> = order.iter().copied().collect();
        if requested.len() != order.len() {
            // A duplicated id would make some other region vanish.
            return false;
        }
        let current: HashSet<RegionId> = self.regions.iter().map(|r| r.id).collect();
        if requested != current {
            return false;
        }
        let positions: std::collections::HashMap<RegionId, usize> = self
            .regions
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();
        let mut by_id: Vec<Option<Region>> = self.regions.drain(..).map(Some).collect();
        for id in order {
            if let Some(region) = by_id[positions[id]].take() {
                self.regions.push(region);
            }
        }
        self.mark_dirty();
        true
    }

    /// Swap a region with its successor in storage order (draw it later).
    pub fn bring_forward(&mut self, id: RegionId) -> bool {
        let Some(idx) = self.storage_index(id) else {
            return false;
        };
        if idx + 1 >= self.regions.len() {
            return false;
        }
        self.regions.swap(idx, idx + 1);
        self.mark_dirty();
        true
    }

    /// Swap a region with its predecessor in storage order.
    pub fn send_backward(&mut self, id: RegionId) -> bool {
        let Some(idx) = self.storage_index(id) else {
            return false;
        };
        if idx == 0 {
            return false;
        }
        self.regions.swap(idx, idx - 1);
        self.mark_dirty();
        true
    }

    pub fn bring_to_front(&mut self, id: RegionId) -> bool {
        let Some(idx) = self.storage_index(id) else {
            return false;
        };
        let region = self.regions.remove(idx);
        self.regions.push(region);
        self.mark_dirty();
        true
    }

    pub fn send_to_back(&mut self, id: RegionId) -> bool {
        let Some(idx) = self.storage_index(id) else {
            return false;
        };
        let region = self.regions.remove(idx);
        self.regions.insert(0, region);
        self.mark_dirty();
        true
    }

    /// Derive the reading order: top-to-bottom, then left-to-right.
    ///
    /// Regions are first sorted by their topmost Y; a region whose top is
    /// within [`ROW_GROUP_THRESHOLD`] of the first region in the current row
    /// joins that row. Rows are then ordered internally by leftmost X.
    pub fn reading_order(&self) -> Vec<RegionId> {
        let mut items: Vec<(RegionId, f32, f32)> = self
            .regions
            .iter()
            .map(|r| (r.id, r.polygon.top(), r.polygon.left()))
            .collect();
        items.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut rows: Vec<Vec<(RegionId, f32)>> = Vec::new();
        let mut row_top = f32::NEG_INFINITY;
        for (id, top, left) in items {
            if rows.is_empty() || (top - row_top) >= ROW_GROUP_THRESHOLD {
                rows.push(Vec::new());
                row_top = top;
            }
            rows.last_mut().unwrap().push((id, left));
        }

        let mut order = Vec::with_capacity(self.regions.len());
        for mut row in rows {
            row.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
            order.extend(row.into_iter().map(|(id, _)| id));
        }
        order
    }

    /// Reading order plus, for each display position, the region's storage
    /// index. This is the display-to-storage mapping the transcription
    /// workflow uses to key texts by storage order.
    pub fn reading_order_with_mapping(&self) -> Vec<(RegionId, usize)> {
        self.reading_order()
            .into_iter()
            .filter_map(|id| self.storage_index(id).map(|idx| (id, idx)))
            .collect()
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Serialize region geometry, text and the id counter for undo history.
    pub fn snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&StoreSnapshot {
            next_id: self.next_id,
            regions: self.regions.clone(),
        })
    }

    /// Replace the live region set with a previously taken snapshot.
    /// Selection is pruned to ids that still exist.
    pub fn restore(&mut self, snapshot: &str) -> Result<(), serde_json::Error> {
        let data: StoreSnapshot = serde_json::from_str(snapshot)?;
        self.regions = data.regions;
        self.next_id = data.next_id;
        let live: HashSet<RegionId> = self.regions.iter().map(|r| r.id).collect();
        self.selected.retain(|id| live.contains(id));
        self.mark_dirty();
        Ok(())
    }
}
