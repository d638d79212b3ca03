//! Canvas elements as seen through the engine capability surface.

use crate::request::{GenerationRequest, MediaKind};
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Engine-assigned element identifier.
pub type ElementId = Uuid;

/// A positioned media element on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasElement {
    pub id: ElementId,
    /// Top-left corner in page coordinates.
    pub position: Point,
    pub size: Size,
    /// Empty while the element is a pending placeholder.
    pub media_url: String,
    pub kind: MediaKind,
    pub prompt: String,
    /// Opaque blob; generated elements carry their originating request.
    pub metadata: serde_json::Value,
    pub opacity: f64,
    pub locked: bool,
    /// When the placeholder received its final media, in unix milliseconds.
    pub resolved_at: Option<u64>,
}

impl CanvasElement {
    /// Build an element from creation attributes.
    pub fn from_attrs(id: ElementId, position: Point, size: Size, attrs: ElementAttrs) -> Self {
        Self {
            id,
            position,
            size,
            media_url: attrs.media_url,
            kind: attrs.kind,
            prompt: attrs.prompt,
            metadata: attrs.metadata,
            opacity: attrs.opacity,
            locked: attrs.locked,
            resolved_at: None,
        }
    }

    /// Page-space bounds.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn center(&self) -> Point {
        self.bounds().center()
    }

    pub fn is_pending(&self) -> bool {
        self.media_url.is_empty()
    }

    pub fn is_visible(&self) -> bool {
        self.opacity == 1.0
    }

    /// The request this element was generated from, if any.
    pub fn generation_request(&self) -> Option<GenerationRequest> {
        if self.metadata.is_null() {
            return None;
        }
        serde_json::from_value(self.metadata.clone()).ok()
    }

    /// Apply a partial update.
    pub fn apply(&mut self, patch: &ElementPatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(size) = patch.size {
            self.size = size;
        }
        if let Some(url) = &patch.media_url {
            self.media_url = url.clone();
        }
        if let Some(prompt) = &patch.prompt {
            self.prompt = prompt.clone();
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = opacity;
        }
        if let Some(locked) = patch.locked {
            self.locked = locked;
        }
        if let Some(resolved_at) = patch.resolved_at {
            self.resolved_at = Some(resolved_at);
        }
    }
}

/// Domain attributes for a new element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementAttrs {
    pub kind: MediaKind,
    pub media_url: String,
    pub prompt: String,
    pub metadata: serde_json::Value,
    pub opacity: f64,
    pub locked: bool,
}

impl ElementAttrs {
    /// Attributes of a pending placeholder for `request`.
    pub fn placeholder(request: &GenerationRequest) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind: request.kind,
            media_url: String::new(),
            prompt: request.prompt.clone(),
            metadata: serde_json::to_value(request)?,
            opacity: 1.0,
            locked: false,
        })
    }

    /// Attributes of finished media with no generation metadata (uploads).
    pub fn media(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            media_url: url.into(),
            prompt: String::new(),
            metadata: serde_json::Value::Null,
            opacity: 1.0,
            locked: false,
        }
    }
}

/// A partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub media_url: Option<String>,
    pub prompt: Option<String>,
    pub opacity: Option<f64>,
    pub locked: Option<bool>,
    pub resolved_at: Option<u64>,
}

impl ElementPatch {
    /// Patch that turns a placeholder into finished media.
    pub fn resolved(url: impl Into<String>, at_ms: u64) -> Self {
        Self {
            media_url: Some(url.into()),
            resolved_at: Some(at_ms),
            ..Self::default()
        }
    }

    pub fn moved_to(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }
}
