//! PromptCanvas Core Library
//!
//! Generation tasks and canvas element synchronization: placeholders are laid
//! out on an infinite canvas, tracked while media is generated, and resolved
//! in place. Platform-agnostic; the canvas itself sits behind [`CanvasEngine`].

pub mod camera;
pub mod clock;
pub mod config;
pub mod element;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod layers;
pub mod layout;
pub mod models;
pub mod notice;
pub mod request;
pub mod stabilizer;
pub mod studio;
pub mod tasks;

pub use camera::Camera;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, StudioConfig};
pub use element::{CanvasElement, ElementAttrs, ElementId, ElementPatch};
pub use engine::{CanvasEngine, ChangeEvent, ChangeScope, ChangeSource, MemoryEngine};
pub use error::{CanvasError, CanvasResult};
pub use gateway::Gateway;
pub use layers::Layer;
pub use models::{ModelCatalog, ModelSpec};
pub use notice::{Notice, NoticeBoard};
pub use request::{AspectRatio, GenerationRequest, MediaKind, ReferenceImage, StyleModifier, MAX_BATCH_COUNT};
pub use stabilizer::{BoundsStabilizer, SettleState, StableBounds};
pub use studio::Studio;
pub use tasks::{
    GenerationTask, ProgressSource, ProgressUpdate, ResolvedMedia, RetryPolicy, SimulatedProgress,
    TaskEvent, TaskId, TaskManager, TaskStatus, TrackingPolicy,
};
