//! Generation model catalog and per-model limits.

use crate::error::{CanvasError, CanvasResult};
use crate::request::MediaKind;
use serde::{Deserialize, Serialize};

/// Limits and capabilities of one generation model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    pub kind: MediaKind,
    pub max_reference_images: usize,
    pub max_style_modifiers: usize,
    /// Whether start/end frames are accepted (video models).
    #[serde(default)]
    pub supports_frames: bool,
}

/// The set of models a request may target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelCatalog {
    models: Vec<ModelSpec>,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ModelCatalog {
    /// Create a catalog from explicit model specs.
    pub fn new(models: Vec<ModelSpec>) -> Self {
        Self { models }
    }

    /// The models shipped with the application.
    pub fn builtin() -> Self {
        Self::new(vec![
            ModelSpec {
                id: "image-standard".into(),
                kind: MediaKind::Image,
                max_reference_images: 1,
                max_style_modifiers: 3,
                supports_frames: false,
            },
            ModelSpec {
                id: "image-pro".into(),
                kind: MediaKind::Image,
                max_reference_images: 4,
                max_style_modifiers: 5,
                supports_frames: false,
            },
            ModelSpec {
                id: "video-standard".into(),
                kind: MediaKind::Video,
                max_reference_images: 1,
                max_style_modifiers: 2,
                supports_frames: true,
            },
        ])
    }

    /// Look up a model by id.
    pub fn get(&self, id: &str) -> CanvasResult<&ModelSpec> {
        self.models
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| CanvasError::UnknownModel(id.to_string()))
    }

    /// Models producing the given media kind.
    pub fn for_kind(&self, kind: MediaKind) -> impl Iterator<Item = &ModelSpec> {
        self.models.iter().filter(move |m| m.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
