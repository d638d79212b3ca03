//! Capability surface of the external canvas engine.
//!
//! The engine owns element storage, z-order, selection and the camera. The
//! generation subsystem only talks to it through [`CanvasEngine`].

mod memory;

pub use memory::MemoryEngine;

use crate::camera::Camera;
use crate::element::{CanvasElement, ElementAttrs, ElementId, ElementPatch};
use kurbo::{Point, Size};

/// Who caused a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// A direct user interaction.
    User,
    /// A programmatic change (generation results, layer panel).
    Remote,
}

/// What a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    /// Elements were created, updated, deleted or reordered.
    Document,
    /// Selection, camera or viewport changed.
    Session,
}

/// A change notification from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub source: ChangeSource,
    pub scope: ChangeScope,
}

impl ChangeEvent {
    pub fn new(source: ChangeSource, scope: ChangeScope) -> Self {
        Self { source, scope }
    }
}

/// Operations the generation subsystem consumes from a canvas engine.
pub trait CanvasEngine {
    /// Whether the engine has mounted and accepts writes.
    fn is_mounted(&self) -> bool;

    /// Create an element and return its engine-assigned id.
    ///
    /// Only called while mounted.
    fn create_element(&mut self, position: Point, size: Size, attrs: ElementAttrs) -> ElementId;

    /// Apply a partial update. Returns false if the element does not exist.
    fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool;

    /// Delete elements; unknown ids are ignored.
    fn delete_elements(&mut self, ids: &[ElementId]);

    /// Look up an element.
    fn element(&self, id: ElementId) -> Option<CanvasElement>;

    /// All elements in z-order (back to front).
    fn elements(&self) -> Vec<CanvasElement>;

    /// Currently selected element ids.
    fn selection(&self) -> Vec<ElementId>;

    /// Replace the selection.
    fn set_selection(&mut self, ids: &[ElementId]);

    fn camera(&self) -> Camera;

    /// Size of the visible viewport in screen pixels.
    fn viewport_size(&self) -> Size;

    /// Move elements to the front, keeping the given order (last = topmost).
    fn bring_to_front(&mut self, ids: &[ElementId]);

    /// Move elements to the back, keeping the given order (first = bottommost).
    fn send_to_back(&mut self, ids: &[ElementId]);

    /// Take the change notifications recorded since the last call.
    fn drain_changes(&mut self) -> Vec<ChangeEvent>;

    fn page_to_screen(&self, point: Point) -> Point {
        self.camera().page_to_screen(point)
    }

    fn screen_to_page(&self, point: Point) -> Point {
        self.camera().screen_to_page(point)
    }
}
