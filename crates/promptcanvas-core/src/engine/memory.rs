//! In-memory canvas engine.

use super::{CanvasEngine, ChangeEvent, ChangeScope, ChangeSource};
use crate::camera::Camera;
use crate::element::{CanvasElement, ElementAttrs, ElementId, ElementPatch};
use kurbo::{Point, Size, Vec2};
use std::collections::HashMap;
use uuid::Uuid;

/// A self-contained engine holding elements, z-order, selection and camera.
///
/// Used by the headless driver and in tests. Calls made through
/// [`CanvasEngine`] are recorded as [`ChangeSource::Remote`]; the inherent
/// `user_*` methods simulate direct manipulation and record
/// [`ChangeSource::User`].
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    mounted: bool,
    elements: HashMap<ElementId, CanvasElement>,
    /// Z-order of elements (back to front).
    z_order: Vec<ElementId>,
    selection: Vec<ElementId>,
    camera: Camera,
    viewport_size: Size,
    changes: Vec<ChangeEvent>,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Create a mounted engine with an 800×600 viewport.
    pub fn new() -> Self {
        Self {
            mounted: true,
            elements: HashMap::new(),
            z_order: Vec::new(),
            selection: Vec::new(),
            camera: Camera::new(),
            viewport_size: Size::new(800.0, 600.0),
            changes: Vec::new(),
        }
    }

    /// Create an engine that has not mounted yet.
    pub fn unmounted() -> Self {
        Self {
            mounted: false,
            ..Self::new()
        }
    }

    /// Mark the engine as mounted.
    pub fn mount(&mut self) {
        self.mounted = true;
    }

    /// Center the camera so that `page_center` sits in the middle of the viewport.
    pub fn center_on(&mut self, page_center: Point) {
        let zoom = self.camera.zoom;
        self.camera.offset = Vec2::new(
            self.viewport_size.width / 2.0 - page_center.x * zoom,
            self.viewport_size.height / 2.0 - page_center.y * zoom,
        );
        self.record(ChangeSource::User, ChangeScope::Session);
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.record(ChangeSource::User, ChangeScope::Session);
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_size = Size::new(width, height);
        self.record(ChangeSource::User, ChangeScope::Session);
    }

    /// Pan the camera as a user drag would.
    pub fn user_pan(&mut self, delta: Vec2) {
        self.camera.pan(delta);
        self.record(ChangeSource::User, ChangeScope::Session);
    }

    /// Zoom the camera about a screen point as a scroll gesture would.
    pub fn user_zoom(&mut self, screen_point: Point, factor: f64) {
        self.camera.zoom_at(screen_point, factor);
        self.record(ChangeSource::User, ChangeScope::Session);
    }

    /// Move an element as a user drag would. Locked elements do not move.
    pub fn user_move(&mut self, id: ElementId, delta: Vec2) {
        if let Some(element) = self.elements.get_mut(&id) {
            if element.locked {
                return;
            }
            element.position += delta;
            self.record(ChangeSource::User, ChangeScope::Document);
        }
    }

    /// Select elements as a user click would.
    pub fn user_select(&mut self, ids: &[ElementId]) {
        self.selection = ids
            .iter()
            .copied()
            .filter(|id| self.elements.contains_key(id))
            .collect();
        self.record(ChangeSource::User, ChangeScope::Session);
    }

    /// Delete elements as the delete key would.
    pub fn user_delete(&mut self, ids: &[ElementId]) {
        self.remove_all(ids);
        self.record(ChangeSource::User, ChangeScope::Document);
    }

    /// Delete the current selection.
    pub fn user_delete_selected(&mut self) {
        let selected = self.selection.clone();
        self.user_delete(&selected);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Z-order of element ids (back to front).
    pub fn z_order(&self) -> &[ElementId] {
        &self.z_order
    }

    fn remove_all(&mut self, ids: &[ElementId]) {
        for id in ids {
            self.elements.remove(id);
        }
        self.z_order.retain(|id| !ids.contains(id));
        self.selection.retain(|id| !ids.contains(id));
    }

    fn record(&mut self, source: ChangeSource, scope: ChangeScope) {
        self.changes.push(ChangeEvent::new(source, scope));
    }
}

impl CanvasEngine for MemoryEngine {
    fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn create_element(&mut self, position: Point, size: Size, attrs: ElementAttrs) -> ElementId {
        let id = Uuid::new_v4();
        self.elements
            .insert(id, CanvasElement::from_attrs(id, position, size, attrs));
        self.z_order.push(id);
        self.record(ChangeSource::Remote, ChangeScope::Document);
        id
    }

    fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        match self.elements.get_mut(&id) {
            Some(element) => {
                element.apply(patch);
                self.record(ChangeSource::Remote, ChangeScope::Document);
                true
            }
            None => false,
        }
    }

    fn delete_elements(&mut self, ids: &[ElementId]) {
        self.remove_all(ids);
        self.record(ChangeSource::Remote, ChangeScope::Document);
    }

    fn element(&self, id: ElementId) -> Option<CanvasElement> {
        self.elements.get(&id).cloned()
    }

    fn elements(&self) -> Vec<CanvasElement> {
        self.z_order
            .iter()
            .filter_map(|id| self.elements.get(id).cloned())
            .collect()
    }

    fn selection(&self) -> Vec<ElementId> {
        self.selection.clone()
    }

    fn set_selection(&mut self, ids: &[ElementId]) {
        self.selection = ids
            .iter()
            .copied()
            .filter(|id| self.elements.contains_key(id))
            .collect();
        self.record(ChangeSource::Remote, ChangeScope::Session);
    }

    fn camera(&self) -> Camera {
        self.camera
    }

    fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    fn bring_to_front(&mut self, ids: &[ElementId]) {
        let moved: Vec<ElementId> = ids
            .iter()
            .copied()
            .filter(|id| self.elements.contains_key(id))
            .collect();
        self.z_order.retain(|id| !moved.contains(id));
        self.z_order.extend(moved);
        self.record(ChangeSource::Remote, ChangeScope::Document);
    }

    fn send_to_back(&mut self, ids: &[ElementId]) {
        let moved: Vec<ElementId> = ids
            .iter()
            .copied()
            .filter(|id| self.elements.contains_key(id))
            .collect();
        self.z_order.retain(|id| !moved.contains(id));
        self.z_order.splice(0..0, moved);
        self.record(ChangeSource::Remote, ChangeScope::Document);
    }

    fn drain_changes(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.changes)
    }
}
