//! Stateless adapter between the generation subsystem and the canvas engine.

use crate::element::{CanvasElement, ElementAttrs, ElementId, ElementPatch};
use crate::engine::{CanvasEngine, ChangeEvent};
use crate::error::{CanvasError, CanvasResult};
use kurbo::{Point, Rect, Size};

/// Translates domain operations into engine calls.
///
/// Holds no state besides the engine itself; every read goes to the engine.
#[derive(Debug)]
pub struct Gateway<E: CanvasEngine> {
    engine: E,
}

impl<E: CanvasEngine> Gateway<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Direct engine access, for hosts simulating user input.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    pub fn is_ready(&self) -> bool {
        self.engine.is_mounted()
    }

    /// Create an element. Fails with [`CanvasError::EngineNotReady`] before mount.
    pub fn create_element(
        &mut self,
        position: Point,
        size: Size,
        attrs: ElementAttrs,
    ) -> CanvasResult<ElementId> {
        if !self.engine.is_mounted() {
            return Err(CanvasError::EngineNotReady);
        }
        Ok(self.engine.create_element(position, size, attrs))
    }

    /// Update an element. Returns false, without error, if it has been deleted.
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> bool {
        let updated = self.engine.update_element(id, patch);
        if !updated {
            log::debug!("Skipping update of vanished element {}", id);
        }
        updated
    }

    pub fn delete_elements(&mut self, ids: &[ElementId]) {
        self.engine.delete_elements(ids);
    }

    pub fn query_element(&self, id: ElementId) -> Option<CanvasElement> {
        self.engine.element(id)
    }

    /// Screen-space bounds of an element under the current camera.
    pub fn query_screen_bounds(&self, id: ElementId) -> Option<Rect> {
        self.engine
            .element(id)
            .map(|element| self.engine.camera().page_rect_to_screen(element.bounds()))
    }

    /// Elements matching `predicate`, back to front.
    pub fn list_elements(&self, predicate: impl Fn(&CanvasElement) -> bool) -> Vec<CanvasElement> {
        self.engine
            .elements()
            .into_iter()
            .filter(|element| predicate(element))
            .collect()
    }

    /// All elements, topmost first.
    pub fn elements_top_down(&self) -> Vec<CanvasElement> {
        let mut elements = self.engine.elements();
        elements.reverse();
        elements
    }

    pub fn selection(&self) -> Vec<ElementId> {
        self.engine.selection()
    }

    /// The single selected element, if exactly one is selected.
    pub fn single_selection(&self) -> Option<ElementId> {
        match self.engine.selection().as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }

    pub fn select(&mut self, ids: &[ElementId]) {
        self.engine.set_selection(ids);
    }

    /// The page point currently shown in the middle of the viewport.
    pub fn viewport_center(&self) -> Point {
        let viewport = self.engine.viewport_size();
        self.engine
            .screen_to_page(Point::new(viewport.width / 2.0, viewport.height / 2.0))
    }

    pub fn bring_to_front(&mut self, ids: &[ElementId]) {
        self.engine.bring_to_front(ids);
    }

    pub fn send_to_back(&mut self, ids: &[ElementId]) {
        self.engine.send_to_back(ids);
    }

    pub fn drain_changes(&mut self) -> Vec<ChangeEvent> {
        self.engine.drain_changes()
    }
}
