//! Task manager: turns requests into placeholders and placeholders into media.

use super::{
    GenerationTask, ProgressSource, ProgressUpdate, ResolvedMedia, RetryPolicy, TaskEvent,
    TaskId, TaskStatus, TrackingPolicy,
};
use crate::clock::{Clock, Duration};
use crate::config::StudioConfig;
use crate::element::{ElementAttrs, ElementId, ElementPatch};
use crate::engine::CanvasEngine;
use crate::error::CanvasResult;
use crate::gateway::Gateway;
use crate::layout;
use crate::request::GenerationRequest;
use kurbo::Point;
use uuid::Uuid;

/// Owns the live generation tasks.
///
/// Tasks are kept in registration order and processed in that order on each
/// tick. Finished, failed and cancelled tasks are discarded.
pub struct TaskManager<P: ProgressSource> {
    tasks: Vec<GenerationTask>,
    source: P,
    retry: RetryPolicy,
    base_edge: f64,
    grid_gap: f64,
    estimated_duration: Duration,
    events: Vec<TaskEvent>,
}

impl<P: ProgressSource> TaskManager<P> {
    pub fn new(source: P, config: &StudioConfig) -> Self {
        Self {
            tasks: Vec::new(),
            source,
            retry: config.retry,
            base_edge: config.base_edge,
            grid_gap: config.grid_gap,
            estimated_duration: config.estimated_duration(),
            events: Vec::new(),
        }
    }

    /// Place the placeholders of a batch and start tracking it.
    ///
    /// Returns the ids of every created element, cell 0 first. If the engine
    /// rejects a creation partway through, the placeholders already created
    /// are removed again.
    pub fn submit<E: CanvasEngine>(
        &mut self,
        gateway: &mut Gateway<E>,
        request: GenerationRequest,
        center: Point,
        policy: TrackingPolicy,
        clock: &dyn Clock,
    ) -> CanvasResult<Vec<ElementId>> {
        let model_id = request.model_id.clone();
        let size = layout::size_for_request(&request, self.base_edge);
        let count = request.count.max(1) as usize;
        let plan = layout::plan_grid(center, size, count, self.grid_gap);
        let attrs = ElementAttrs::placeholder(&request)?;

        let mut created = Vec::with_capacity(count);
        for position in plan.cells(size, count, self.grid_gap) {
            match gateway.create_element(position, size, attrs.clone()) {
                Ok(id) => created.push(id),
                Err(err) => {
                    if !created.is_empty() {
                        gateway.delete_elements(&created);
                    }
                    return Err(err);
                }
            }
        }

        match policy {
            TrackingPolicy::LeadOnly => {
                self.register(created[0], created.clone(), request, clock);
            }
            TrackingPolicy::EveryElement => {
                for &id in &created {
                    self.register(id, vec![id], request.clone(), clock);
                }
            }
        }

        log::info!(
            "Submitted {} placeholder(s) of {}x{} for model {}",
            created.len(),
            size.width,
            size.height,
            model_id
        );
        Ok(created)
    }

    fn register(
        &mut self,
        element_id: ElementId,
        batch: Vec<ElementId>,
        request: GenerationRequest,
        clock: &dyn Clock,
    ) {
        if self.task_for_element(element_id).is_some() {
            log::warn!("Element {} already has a task; not registering another", element_id);
            return;
        }
        self.tasks.push(GenerationTask {
            id: Uuid::new_v4(),
            element_id,
            batch,
            status: TaskStatus::Generating,
            progress: 0,
            started_at: clock.now(),
            estimated_duration: self.estimated_duration,
            request,
            attempt: 1,
            retry_at: None,
        });
    }

    /// Advance every live task by one step.
    pub fn tick<E: CanvasEngine>(&mut self, gateway: &mut Gateway<E>, clock: &dyn Clock) {
        let now = clock.now();
        let tasks = std::mem::take(&mut self.tasks);
        let mut live = Vec::with_capacity(tasks.len());

        for mut task in tasks {
            if gateway.query_element(task.element_id).is_none() {
                log::debug!(
                    "Dropping task {}: element {} was deleted",
                    task.id,
                    task.element_id
                );
                self.source.release(task.id);
                continue;
            }

            if task.status == TaskStatus::Retrying {
                match task.retry_at {
                    Some(at) if now < at => {
                        live.push(task);
                        continue;
                    }
                    _ => {
                        task.status = TaskStatus::Generating;
                        task.retry_at = None;
                        task.progress = 0;
                        task.attempt += 1;
                        task.started_at = now;
                    }
                }
            }

            match self.source.poll(&task) {
                ProgressUpdate::Progress(progress) => {
                    task.progress = task.progress.max(progress.min(100));
                    self.emit_progress(&task);
                    live.push(task);
                }
                ProgressUpdate::Completed(media) => {
                    task.progress = 100;
                    self.emit_progress(&task);
                    self.complete(gateway, task, media, clock.unix_millis());
                }
                ProgressUpdate::Failed(reason) => {
                    if self.retry.should_retry(task.attempt) {
                        let delay = self.retry.delay_after(task.attempt);
                        log::warn!(
                            "Generation attempt {} of task {} failed ({}); retrying in {:?}",
                            task.attempt,
                            task.id,
                            reason,
                            delay
                        );
                        task.status = TaskStatus::Retrying;
                        task.retry_at = Some(now + delay);
                        live.push(task);
                    } else {
                        self.fail(gateway, task, reason);
                    }
                }
            }
        }

        self.tasks = live;
    }

    fn complete<E: CanvasEngine>(
        &mut self,
        gateway: &mut Gateway<E>,
        mut task: GenerationTask,
        media: Vec<ResolvedMedia>,
        resolved_at: u64,
    ) {
        let mut element_ids = Vec::with_capacity(media.len());
        for m in media {
            if !task.batch.contains(&m.element_id) {
                continue;
            }
            if gateway.update_element(m.element_id, &ElementPatch::resolved(m.url, resolved_at)) {
                element_ids.push(m.element_id);
            }
        }

        task.status = TaskStatus::Done;
        self.source.release(task.id);
        log::info!(
            "Generation task {} finished: {} of {} element(s) resolved",
            task.id,
            element_ids.len(),
            task.batch.len()
        );
        self.events.push(TaskEvent::BatchCompleted {
            request: task.request,
            element_ids,
        });
    }

    fn fail<E: CanvasEngine>(
        &mut self,
        gateway: &Gateway<E>,
        mut task: GenerationTask,
        reason: String,
    ) {
        task.status = TaskStatus::Failed;
        self.source.release(task.id);
        log::warn!(
            "Generation task {} failed after {} attempt(s): {}",
            task.id,
            task.attempt,
            reason
        );
        let element_ids = task
            .batch
            .iter()
            .copied()
            .filter(|&id| gateway.query_element(id).is_some())
            .collect();
        self.events.push(TaskEvent::BatchFailed {
            request: task.request,
            element_ids,
            reason,
        });
    }

    fn emit_progress(&mut self, task: &GenerationTask) {
        self.events.push(TaskEvent::Progress {
            task_id: task.id,
            element_id: task.element_id,
            progress: task.progress,
        });
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<TaskEvent> {
        std::mem::take(&mut self.events)
    }

    /// Live tasks in registration order.
    pub fn tasks(&self) -> &[GenerationTask] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> Option<&GenerationTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// The task whose progress overlay sits on `element_id`.
    pub fn task_for_element(&self, element_id: ElementId) -> Option<&GenerationTask> {
        self.tasks.iter().find(|t| t.element_id == element_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn source(&self) -> &P {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut P {
        &mut self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::engine::MemoryEngine;
    use crate::error::CanvasError;
    use crate::request::{AspectRatio, MediaKind};
    use crate::tasks::SimulatedProgress;
    use std::collections::HashMap;

    fn request(count: u32) -> GenerationRequest {
        GenerationRequest::new(MediaKind::Image, "image-standard", "a red fox")
            .with_aspect_ratio(AspectRatio::Square)
            .with_count(count)
    }

    fn setup() -> (TaskManager<SimulatedProgress>, Gateway<MemoryEngine>, ManualClock) {
        let config = StudioConfig::default();
        (
            TaskManager::new(SimulatedProgress::new(config.progress_step), &config),
            Gateway::new(MemoryEngine::new()),
            ManualClock::new(),
        )
    }

    fn run_ticks<P: ProgressSource>(
        manager: &mut TaskManager<P>,
        gateway: &mut Gateway<MemoryEngine>,
        clock: &ManualClock,
        ticks: usize,
    ) {
        for _ in 0..ticks {
            clock.advance(Duration::from_millis(150));
            manager.tick(gateway, clock);
        }
    }

    /// Source that fails a fixed number of polls, then completes.
    struct FlakySource {
        failures_left: u32,
    }

    impl ProgressSource for FlakySource {
        fn poll(&mut self, task: &GenerationTask) -> ProgressUpdate {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return ProgressUpdate::Failed("backend unavailable".into());
            }
            ProgressUpdate::Completed(
                task.batch
                    .iter()
                    .map(|&element_id| ResolvedMedia {
                        element_id,
                        url: "https://cdn/out.png".into(),
                    })
                    .collect(),
            )
        }
    }

    #[test]
    fn test_submit_creates_placeholders_and_one_task() {
        let (mut manager, mut gateway, clock) = setup();
        let ids = manager
            .submit(&mut gateway, request(3), Point::ZERO, TrackingPolicy::LeadOnly, &clock)
            .unwrap();

        assert_eq!(ids.len(), 3);
        assert_eq!(gateway.engine().len(), 3);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.tasks()[0].element_id, ids[0]);
        assert_eq!(manager.tasks()[0].batch, ids);
        for id in &ids {
            let element = gateway.query_element(*id).unwrap();
            assert!(element.is_pending());
            assert_eq!(element.generation_request(), Some(request(3)));
        }
    }

    #[test]
    fn test_every_element_policy() {
        let (mut manager, mut gateway, clock) = setup();
        let ids = manager
            .submit(&mut gateway, request(4), Point::ZERO, TrackingPolicy::EveryElement, &clock)
            .unwrap();

        assert_eq!(manager.len(), 4);
        for id in &ids {
            let task = manager.task_for_element(*id).unwrap();
            assert_eq!(task.batch, vec![*id]);
        }
    }

    fn completed_batches(manager: &mut TaskManager<SimulatedProgress>) -> Vec<Vec<ElementId>> {
        manager
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                TaskEvent::BatchCompleted { element_ids, .. } => Some(element_ids),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_every_element_policy_resolves_each_cell() {
        let (mut manager, mut gateway, clock) = setup();
        let ids = manager
            .submit(&mut gateway, request(3), Point::ZERO, TrackingPolicy::EveryElement, &clock)
            .unwrap();

        run_ticks(&mut manager, &mut gateway, &clock, 20);
        assert_eq!(
            completed_batches(&mut manager),
            vec![vec![ids[0]], vec![ids[1]], vec![ids[2]]]
        );
        assert!(manager.is_empty());
        for id in ids {
            assert!(!gateway.query_element(id).unwrap().is_pending());
        }
    }

    #[test]
    fn test_every_element_policy_drops_only_deleted_cell() {
        let (mut manager, mut gateway, clock) = setup();
        let ids = manager
            .submit(&mut gateway, request(3), Point::ZERO, TrackingPolicy::EveryElement, &clock)
            .unwrap();
        run_ticks(&mut manager, &mut gateway, &clock, 5);

        gateway.engine_mut().user_delete(&[ids[1]]);
        run_ticks(&mut manager, &mut gateway, &clock, 1);
        assert_eq!(manager.len(), 2);
        assert!(manager.task_for_element(ids[1]).is_none());

        run_ticks(&mut manager, &mut gateway, &clock, 20);
        assert_eq!(completed_batches(&mut manager), vec![vec![ids[0]], vec![ids[2]]]);
        assert!(manager.is_empty());
        assert!(!gateway.query_element(ids[0]).unwrap().is_pending());
        assert!(!gateway.query_element(ids[2]).unwrap().is_pending());
    }

    #[test]
    fn test_progress_is_monotonic_and_resolves_whole_batch() {
        let (mut manager, mut gateway, clock) = setup();
        let ids = manager
            .submit(&mut gateway, request(2), Point::ZERO, TrackingPolicy::LeadOnly, &clock)
            .unwrap();

        let mut seen = Vec::new();
        let mut completed = Vec::new();
        for _ in 0..25 {
            clock.advance(Duration::from_millis(150));
            manager.tick(&mut gateway, &clock);
            for event in manager.drain_events() {
                match event {
                    TaskEvent::Progress { progress, .. } => seen.push(progress),
                    TaskEvent::BatchCompleted { element_ids, .. } => completed.push(element_ids),
                    TaskEvent::BatchFailed { .. } => panic!("unexpected failure"),
                }
            }
        }

        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&100));
        assert_eq!(seen.len(), 20);
        assert_eq!(completed, vec![ids.clone()]);
        assert!(manager.is_empty());
        for id in ids {
            let element = gateway.query_element(id).unwrap();
            assert!(!element.is_pending());
            assert!(element.resolved_at.is_some());
        }
    }

    #[test]
    fn test_deleting_lead_element_drops_task() {
        let (mut manager, mut gateway, clock) = setup();
        let ids = manager
            .submit(&mut gateway, request(2), Point::ZERO, TrackingPolicy::LeadOnly, &clock)
            .unwrap();
        run_ticks(&mut manager, &mut gateway, &clock, 3);
        manager.drain_events();

        gateway.engine_mut().user_delete(&[ids[0]]);
        gateway.engine_mut().drain_changes();
        run_ticks(&mut manager, &mut gateway, &clock, 1);
        assert!(manager.is_empty());
        assert!(manager.drain_events().is_empty());

        run_ticks(&mut manager, &mut gateway, &clock, 30);
        assert!(manager.drain_events().is_empty());
        assert!(gateway.engine_mut().drain_changes().is_empty());
        assert!(gateway.query_element(ids[1]).unwrap().is_pending());
    }

    #[test]
    fn test_deleted_sibling_is_skipped_on_completion() {
        let (mut manager, mut gateway, clock) = setup();
        let ids = manager
            .submit(&mut gateway, request(3), Point::ZERO, TrackingPolicy::LeadOnly, &clock)
            .unwrap();
        gateway.engine_mut().user_delete(&[ids[1]]);

        run_ticks(&mut manager, &mut gateway, &clock, 20);
        let completed: Vec<_> = manager
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                TaskEvent::BatchCompleted { element_ids, .. } => Some(element_ids),
                _ => None,
            })
            .collect();
        assert_eq!(completed, vec![vec![ids[0], ids[2]]]);
    }

    #[test]
    fn test_submit_before_mount_leaves_nothing_behind() {
        let config = StudioConfig::default();
        let mut manager = TaskManager::new(SimulatedProgress::default(), &config);
        let mut gateway = Gateway::new(MemoryEngine::unmounted());
        let clock = ManualClock::new();

        let result = manager.submit(&mut gateway, request(2), Point::ZERO, TrackingPolicy::LeadOnly, &clock);
        assert!(matches!(result, Err(CanvasError::EngineNotReady)));
        assert!(manager.is_empty());
        assert!(gateway.engine().is_empty());
    }

    #[test]
    fn test_independent_batches() {
        let (mut manager, mut gateway, clock) = setup();
        let first = manager
            .submit(&mut gateway, request(1), Point::ZERO, TrackingPolicy::LeadOnly, &clock)
            .unwrap();
        run_ticks(&mut manager, &mut gateway, &clock, 10);
        let second = manager
            .submit(&mut gateway, request(1), Point::new(500.0, 0.0), TrackingPolicy::LeadOnly, &clock)
            .unwrap();
        manager.drain_events();

        let mut progress: HashMap<ElementId, u8> = HashMap::new();
        run_ticks(&mut manager, &mut gateway, &clock, 10);
        let mut completed = Vec::new();
        for event in manager.drain_events() {
            match event {
                TaskEvent::Progress { element_id, progress: p, .. } => {
                    progress.insert(element_id, p);
                }
                TaskEvent::BatchCompleted { element_ids, .. } => completed.extend(element_ids),
                _ => {}
            }
        }
        assert_eq!(completed, first);
        assert_eq!(progress[&second[0]], 50);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_failure_retries_with_backoff() {
        let config = StudioConfig::default();
        let mut manager = TaskManager::new(FlakySource { failures_left: 1 }, &config);
        let mut gateway = Gateway::new(MemoryEngine::new());
        let clock = ManualClock::new();
        let ids = manager
            .submit(&mut gateway, request(1), Point::ZERO, TrackingPolicy::LeadOnly, &clock)
            .unwrap();

        manager.tick(&mut gateway, &clock);
        assert_eq!(manager.tasks()[0].status, TaskStatus::Retrying);

        // Still inside the one second backoff.
        clock.advance(Duration::from_millis(900));
        manager.tick(&mut gateway, &clock);
        assert_eq!(manager.tasks()[0].status, TaskStatus::Retrying);
        assert!(gateway.query_element(ids[0]).unwrap().is_pending());

        clock.advance(Duration::from_millis(100));
        manager.tick(&mut gateway, &clock);
        assert!(manager.is_empty());
        assert_eq!(gateway.query_element(ids[0]).unwrap().media_url, "https://cdn/out.png");
    }

    #[test]
    fn test_failure_after_exhausted_attempts() {
        let mut config = StudioConfig::default();
        config.retry = RetryPolicy {
            max_attempts: 2,
            initial_delay_ms: 10,
            ..RetryPolicy::default()
        };
        let mut manager = TaskManager::new(FlakySource { failures_left: 5 }, &config);
        let mut gateway = Gateway::new(MemoryEngine::new());
        let clock = ManualClock::new();
        let ids = manager
            .submit(&mut gateway, request(2), Point::ZERO, TrackingPolicy::LeadOnly, &clock)
            .unwrap();

        manager.tick(&mut gateway, &clock);
        clock.advance(Duration::from_millis(10));
        manager.tick(&mut gateway, &clock);

        assert!(manager.is_empty());
        let events = manager.drain_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            TaskEvent::BatchFailed { element_ids, reason, .. } => {
                assert_eq!(element_ids, &ids);
                assert_eq!(reason, "backend unavailable");
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(gateway.query_element(ids[1]).unwrap().is_pending());
    }

    #[test]
    fn test_estimated_remaining() {
        let (mut manager, mut gateway, clock) = setup();
        manager
            .submit(&mut gateway, request(1), Point::ZERO, TrackingPolicy::LeadOnly, &clock)
            .unwrap();
        run_ticks(&mut manager, &mut gateway, &clock, 10);
        let task = &manager.tasks()[0];
        assert_eq!(task.progress, 50);
        assert_eq!(task.estimated_remaining(), Duration::from_millis(1_500));
    }
}
