//! Progress sources driving generation tasks.

use super::{GenerationTask, TaskId};
use crate::element::ElementId;
use crate::request::MediaKind;

/// Media produced for one element of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMedia {
    pub element_id: ElementId,
    pub url: String,
}

/// Result of polling a progress source once.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    /// Still running, now at this percentage.
    Progress(u8),
    /// Finished; media for the task's batch.
    Completed(Vec<ResolvedMedia>),
    /// The attempt failed.
    Failed(String),
}

/// Where task progress comes from.
///
/// The task manager polls once per tick. A backend-driven source would
/// buffer server events or poll a job endpoint and report the latest state.
pub trait ProgressSource {
    /// Report the state of `task` for this tick.
    fn poll(&mut self, task: &GenerationTask) -> ProgressUpdate;

    /// Forget a task that completed, failed or was cancelled.
    fn release(&mut self, _task_id: TaskId) {}
}

/// Fixed-step simulation: advances every task by `step` percent per poll.
#[derive(Debug, Clone)]
pub struct SimulatedProgress {
    step: u8,
}

impl Default for SimulatedProgress {
    fn default() -> Self {
        Self::new(5)
    }
}

impl SimulatedProgress {
    pub fn new(step: u8) -> Self {
        Self {
            step: step.clamp(1, 100),
        }
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    /// Placeholder media URL for a simulated result.
    fn media_url(task: &GenerationTask, element_id: ElementId, index: usize) -> String {
        let size = task.request.aspect_ratio.token().replace(':', "x");
        match task.request.kind {
            MediaKind::Image => format!(
                "https://picsum.photos/seed/{}-{}/{}.jpg",
                element_id.simple(),
                index,
                size
            ),
            MediaKind::Video => format!(
                "https://media.promptcanvas.dev/sim/{}-{}/{}.mp4",
                element_id.simple(),
                index,
                size
            ),
        }
    }
}

impl ProgressSource for SimulatedProgress {
    fn poll(&mut self, task: &GenerationTask) -> ProgressUpdate {
        let next = task.progress.saturating_add(self.step);
        if next < 100 {
            return ProgressUpdate::Progress(next);
        }
        ProgressUpdate::Completed(
            task.batch
                .iter()
                .enumerate()
                .map(|(index, &element_id)| ResolvedMedia {
                    element_id,
                    url: Self::media_url(task, element_id, index),
                })
                .collect(),
        )
    }
}
