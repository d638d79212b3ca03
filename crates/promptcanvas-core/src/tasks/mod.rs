//! Generation tasks: placeholder creation, progress tracking and resolution.

mod manager;
mod progress;
mod retry;

pub use manager::TaskManager;
pub use progress::{ProgressSource, ProgressUpdate, ResolvedMedia, SimulatedProgress};
pub use retry::RetryPolicy;

use crate::clock::{Duration, Instant};
use crate::element::ElementId;
use crate::request::GenerationRequest;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task identifier.
pub type TaskId = Uuid;

/// Lifecycle of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Generating,
    /// Waiting for the retry backoff after a failed attempt.
    Retrying,
    /// Terminal; the task is removed once it gets here.
    Done,
    /// Terminal; attempts were exhausted.
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Which elements of a batch get their own task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingPolicy {
    /// One task bound to the first cell resolves the whole batch.
    #[default]
    LeadOnly,
    /// Every cell gets its own task resolving only that cell.
    EveryElement,
}

/// An in-flight generation.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub id: TaskId,
    /// The element carrying the progress overlay.
    pub element_id: ElementId,
    /// Elements resolved when this task completes, `element_id` first.
    pub batch: Vec<ElementId>,
    pub status: TaskStatus,
    /// Percent complete, 0 to 100.
    pub progress: u8,
    pub started_at: Instant,
    pub estimated_duration: Duration,
    pub request: GenerationRequest,
    /// 1-based attempt number.
    pub attempt: u32,
    pub retry_at: Option<Instant>,
}

impl GenerationTask {
    /// Estimated time left, assuming linear progress.
    pub fn estimated_remaining(&self) -> Duration {
        self.estimated_duration
            .mul_f64(f64::from(100 - self.progress.min(100)) / 100.0)
    }
}

/// Notifications produced by [`TaskManager::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// Progress of a live task after this tick.
    Progress {
        task_id: TaskId,
        element_id: ElementId,
        progress: u8,
    },
    /// All surviving elements of a batch received their media.
    BatchCompleted {
        request: GenerationRequest,
        element_ids: Vec<ElementId>,
    },
    /// A task gave up after exhausting its retries.
    BatchFailed {
        request: GenerationRequest,
        element_ids: Vec<ElementId>,
        reason: String,
    },
}
