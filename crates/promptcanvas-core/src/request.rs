//! Generation requests submitted by the UI.

use crate::error::{CanvasError, CanvasResult};
use crate::models::ModelSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Largest batch a single request may produce.
pub const MAX_BATCH_COUNT: u32 = 4;

/// Kind of media produced by a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    /// Human readable label, used as a fallback layer name.
    pub fn label(&self) -> &'static str {
        match self {
            MediaKind::Image => "Image",
            MediaKind::Video => "Video",
        }
    }
}

/// Aspect ratio token selected in the generation settings.
///
/// Serialized as its token (`"16:9"`). Unknown tokens parse to
/// [`AspectRatio::Square`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape16x9,
    Portrait9x16,
    Landscape4x3,
    Portrait3x4,
    /// Use the source image's own ratio; resolved by the caller.
    Keep,
}

impl AspectRatio {
    /// Parse a ratio token, falling back to `1:1`.
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            "16:9" => Self::Landscape16x9,
            "9:16" => Self::Portrait9x16,
            "4:3" => Self::Landscape4x3,
            "3:4" => Self::Portrait3x4,
            "keep" => Self::Keep,
            _ => Self::Square,
        }
    }

    /// The token for this ratio.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape16x9 => "16:9",
            Self::Portrait9x16 => "9:16",
            Self::Landscape4x3 => "4:3",
            Self::Portrait3x4 => "3:4",
            Self::Keep => "keep",
        }
    }

    /// Width over height, or `None` for [`AspectRatio::Keep`].
    pub fn ratio(&self) -> Option<(u32, u32)> {
        match self {
            Self::Square => Some((1, 1)),
            Self::Landscape16x9 => Some((16, 9)),
            Self::Portrait9x16 => Some((9, 16)),
            Self::Landscape4x3 => Some((4, 3)),
            Self::Portrait3x4 => Some((3, 4)),
            Self::Keep => None,
        }
    }
}

impl From<String> for AspectRatio {
    fn from(token: String) -> Self {
        Self::parse(&token)
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.token().to_string()
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A finished upload: media URL plus its pixel dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl ReferenceImage {
    pub fn new(url: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            url: url.into(),
            width,
            height,
        }
    }
}

/// A weighted style modifier applied to the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleModifier {
    pub id: String,
    /// Strength in `[0, 1]`.
    pub weight: f64,
}

impl StyleModifier {
    pub fn new(id: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            weight,
        }
    }
}

/// One generation request. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub kind: MediaKind,
    pub model_id: String,
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    /// Batch size, 1 to [`MAX_BATCH_COUNT`].
    pub count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<ReferenceImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<ReferenceImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_frame: Option<ReferenceImage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub style_modifiers: Vec<StyleModifier>,
}

impl GenerationRequest {
    /// Create a request with a single output and no references.
    pub fn new(kind: MediaKind, model_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            model_id: model_id.into(),
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::default(),
            count: 1,
            reference_images: Vec::new(),
            start_frame: None,
            end_frame: None,
            style_modifiers: Vec::new(),
        }
    }

    /// Set the aspect ratio.
    pub fn with_aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    /// Set the batch count.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Add a reference image.
    pub fn with_reference_image(mut self, image: ReferenceImage) -> Self {
        self.reference_images.push(image);
        self
    }

    /// Append a style modifier.
    pub fn with_style_modifier(mut self, modifier: StyleModifier) -> Self {
        self.style_modifiers.push(modifier);
        self
    }

    /// Set the start and end frames of a video request.
    pub fn with_frames(mut self, start: Option<ReferenceImage>, end: Option<ReferenceImage>) -> Self {
        self.start_frame = start;
        self.end_frame = end;
        self
    }

    /// The image whose dimensions resolve a `keep` aspect ratio.
    pub fn source_image(&self) -> Option<&ReferenceImage> {
        self.reference_images.first().or(self.start_frame.as_ref())
    }

    /// Check this request against the limits of `model`.
    pub fn validate(&self, model: &ModelSpec) -> CanvasResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(CanvasError::InvalidRequest("prompt is empty".into()));
        }
        if !(1..=MAX_BATCH_COUNT).contains(&self.count) {
            return Err(CanvasError::InvalidRequest(format!(
                "batch count must be between 1 and {}, got {}",
                MAX_BATCH_COUNT, self.count
            )));
        }
        if model.kind != self.kind {
            return Err(CanvasError::InvalidRequest(format!(
                "model {} does not produce {} output",
                model.id,
                self.kind.label().to_lowercase()
            )));
        }
        if (self.start_frame.is_some() || self.end_frame.is_some()) && !model.supports_frames {
            return Err(CanvasError::InvalidRequest(format!(
                "model {} does not accept start or end frames",
                model.id
            )));
        }
        if self.reference_images.len() > model.max_reference_images {
            return Err(CanvasError::CapacityExceeded {
                what: "reference images",
                limit: model.max_reference_images,
                requested: self.reference_images.len(),
            });
        }
        if self.style_modifiers.len() > model.max_style_modifiers {
            return Err(CanvasError::CapacityExceeded {
                what: "style modifiers",
                limit: model.max_style_modifiers,
                requested: self.style_modifiers.len(),
            });
        }

        let mut seen = HashSet::new();
        for modifier in &self.style_modifiers {
            if !(0.0..=1.0).contains(&modifier.weight) {
                return Err(CanvasError::InvalidRequest(format!(
                    "style modifier {} has weight {} outside [0, 1]",
                    modifier.id, modifier.weight
                )));
            }
            if !seen.insert(modifier.id.as_str()) {
                return Err(CanvasError::InvalidRequest(format!(
                    "style modifier {} listed twice",
                    modifier.id
                )));
            }
        }

        Ok(())
    }
}
