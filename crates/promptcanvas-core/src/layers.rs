//! Layer panel read model.
//!
//! Layers are always derived from the engine's elements and never stored.
//! Index 0 is the topmost element.

use crate::element::{CanvasElement, ElementId, ElementPatch};
use crate::engine::CanvasEngine;
use crate::gateway::Gateway;
use crate::request::{GenerationRequest, MediaKind};
use kurbo::{Point, Size};

/// One row of the layer panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: ElementId,
    pub name: String,
    pub url: String,
    /// Center of the element in page coordinates.
    pub position: Point,
    pub size: Size,
    pub visible: bool,
    pub locked: bool,
    pub kind: MediaKind,
    pub generation_config: Option<GenerationRequest>,
}

impl Layer {
    pub fn from_element(element: &CanvasElement) -> Self {
        let generation_config = element.generation_request();
        let name = generation_config
            .as_ref()
            .map(|req| req.prompt.as_str())
            .filter(|prompt| !prompt.trim().is_empty())
            .or_else(|| Some(element.prompt.as_str()).filter(|p| !p.trim().is_empty()))
            .unwrap_or(element.kind.label())
            .to_string();

        Self {
            id: element.id,
            name,
            url: element.media_url.clone(),
            position: element.center(),
            size: element.size,
            visible: element.is_visible(),
            locked: element.locked,
            kind: element.kind,
            generation_config,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.url.is_empty()
    }
}

/// Map elements to layers, preserving their order.
pub fn project_layers(elements: &[CanvasElement]) -> Vec<Layer> {
    elements.iter().map(Layer::from_element).collect()
}

/// Current layers, topmost first.
pub fn layers<E: CanvasEngine>(gateway: &Gateway<E>) -> Vec<Layer> {
    project_layers(&gateway.elements_top_down())
}

/// Move the layer at `from` to `to` (both indices into the top-first list).
///
/// Issues a single `bring_to_front` or `send_to_back` so the engine z-order
/// matches the reordered list. Out-of-range indices are ignored.
pub fn reorder<E: CanvasEngine>(gateway: &mut Gateway<E>, from: usize, to: usize) {
    let mut order: Vec<ElementId> = gateway.elements_top_down().iter().map(|e| e.id).collect();
    if from >= order.len() || to >= order.len() || from == to {
        return;
    }

    let moved = order.remove(from);
    order.insert(to, moved);

    if to == order.len() - 1 {
        gateway.send_to_back(&[moved]);
    } else {
        // Everything above and including the moved layer goes to the front,
        // back to front so the topmost ends up last.
        let mut front: Vec<ElementId> = order[..=to].to_vec();
        front.reverse();
        gateway.bring_to_front(&front);
    }
}

/// Show or hide a layer.
pub fn set_visibility<E: CanvasEngine>(gateway: &mut Gateway<E>, id: ElementId, visible: bool) -> bool {
    gateway.update_element(
        id,
        &ElementPatch {
            opacity: Some(if visible { 1.0 } else { 0.0 }),
            ..ElementPatch::default()
        },
    )
}

/// Lock or unlock a layer.
pub fn set_locked<E: CanvasEngine>(gateway: &mut Gateway<E>, id: ElementId, locked: bool) -> bool {
    gateway.update_element(
        id,
        &ElementPatch {
            locked: Some(locked),
            ..ElementPatch::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementAttrs;
    use crate::engine::MemoryEngine;

    fn gateway_with(n: usize) -> (Gateway<MemoryEngine>, Vec<ElementId>) {
        let mut gateway = Gateway::new(MemoryEngine::new());
        let ids = (0..n)
            .map(|i| {
                let request =
                    GenerationRequest::new(MediaKind::Image, "image-standard", format!("prompt {}", i));
                gateway
                    .create_element(
                        Point::new(i as f64 * 10.0, 0.0),
                        Size::new(10.0, 10.0),
                        ElementAttrs::placeholder(&request).unwrap(),
                    )
                    .unwrap()
            })
            .collect();
        (gateway, ids)
    }

    fn layer_ids(gateway: &Gateway<MemoryEngine>) -> Vec<ElementId> {
        layers(gateway).iter().map(|l| l.id).collect()
    }

    #[test]
    fn test_projection_fields() {
        let (gateway, ids) = gateway_with(1);
        let layer = &layers(&gateway)[0];
        assert_eq!(layer.id, ids[0]);
        assert_eq!(layer.name, "prompt 0");
        assert_eq!(layer.position, Point::new(5.0, 5.0));
        assert!(layer.visible);
        assert!(!layer.locked);
        assert!(layer.is_pending());
        assert_eq!(layer.generation_config.as_ref().unwrap().prompt, "prompt 0");
    }

    #[test]
    fn test_name_falls_back_to_kind() {
        let mut gateway = Gateway::new(MemoryEngine::new());
        gateway
            .create_element(
                Point::ZERO,
                Size::new(1.0, 1.0),
                ElementAttrs::media(MediaKind::Video, "clip.mp4"),
            )
            .unwrap();
        let layer = &layers(&gateway)[0];
        assert_eq!(layer.name, "Video");
        assert!(layer.generation_config.is_none());
    }

    #[test]
    fn test_projection_is_pure() {
        let (gateway, _) = gateway_with(3);
        let elements = gateway.elements_top_down();
        assert_eq!(project_layers(&elements), project_layers(&elements));
    }

    #[test]
    fn test_top_layer_first() {
        let (gateway, ids) = gateway_with(3);
        assert_eq!(layer_ids(&gateway), vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn test_zorder_change_only_reorders() {
        let (mut gateway, ids) = gateway_with(3);
        let before = layers(&gateway);
        gateway.bring_to_front(&[ids[0]]);
        let after = layers(&gateway);

        assert_eq!(after[0].id, ids[0]);
        let mut a = before.clone();
        let mut b = after.clone();
        a.sort_by_key(|l| l.id);
        b.sort_by_key(|l| l.id);
        assert_eq!(a, b);
    }

    #[test]
    fn test_reorder_matches_list_move() {
        for (from, to) in [(0, 3), (3, 0), (1, 2), (2, 1), (0, 1), (3, 2), (1, 3)] {
            let (mut gateway, _) = gateway_with(4);
            let mut expected = layer_ids(&gateway);
            let moved = expected.remove(from);
            expected.insert(to, moved);

            reorder(&mut gateway, from, to);
            assert_eq!(layer_ids(&gateway), expected, "from {} to {}", from, to);
        }
    }

    #[test]
    fn test_reorder_out_of_range_is_ignored() {
        let (mut gateway, _) = gateway_with(2);
        let before = layer_ids(&gateway);
        reorder(&mut gateway, 0, 5);
        assert_eq!(layer_ids(&gateway), before);
    }

    #[test]
    fn test_visibility_and_lock() {
        let (mut gateway, ids) = gateway_with(1);
        assert!(set_visibility(&mut gateway, ids[0], false));
        assert!(set_locked(&mut gateway, ids[0], true));
        let layer = &layers(&gateway)[0];
        assert!(!layer.visible);
        assert!(layer.locked);
    }
}
