//! UI-facing entry point of the generation subsystem.
//!
//! A [`Studio`] owns the gateway to the canvas engine, the task manager, the
//! selection bounds stabilizer and the notice board. The host calls
//! [`Studio::tick`] every [`StudioConfig::tick_interval`] and
//! [`Studio::sync_engine_changes`] whenever the engine reports a change.

use crate::clock::{Clock, SystemClock};
use crate::config::StudioConfig;
use crate::element::ElementId;
use crate::engine::{CanvasEngine, ChangeScope};
use crate::error::CanvasResult;
use crate::gateway::Gateway;
use crate::layers::{self, Layer};
use crate::notice::{Notice, NoticeBoard};
use crate::request::GenerationRequest;
use crate::stabilizer::{BoundsStabilizer, StableBounds};
use crate::tasks::{
    GenerationTask, ProgressSource, SimulatedProgress, TaskEvent, TaskId, TaskManager,
};
use std::collections::VecDeque;

/// Called with the request and the resolved element ids of a finished batch.
pub type BatchCompletedCallback = Box<dyn FnMut(&GenerationRequest, &[ElementId])>;
/// Called every tick with the progress of each live task.
pub type TaskProgressCallback = Box<dyn FnMut(TaskId, ElementId, u8)>;
/// Called when a batch gives up, with the failure reason.
pub type BatchFailedCallback = Box<dyn FnMut(&GenerationRequest, &[ElementId], &str)>;

/// The generation subsystem wired to one canvas engine.
pub struct Studio<E: CanvasEngine, P: ProgressSource = SimulatedProgress, C: Clock = SystemClock> {
    gateway: Gateway<E>,
    tasks: TaskManager<P>,
    stabilizer: BoundsStabilizer,
    notices: NoticeBoard,
    /// Requests waiting for the engine to mount.
    pending: VecDeque<GenerationRequest>,
    config: StudioConfig,
    clock: C,
    on_batch_completed: Vec<BatchCompletedCallback>,
    on_task_progress: Vec<TaskProgressCallback>,
    on_batch_failed: Vec<BatchFailedCallback>,
    document_revision: u64,
}

impl<E: CanvasEngine> Studio<E> {
    /// A studio with simulated progress and the system clock.
    pub fn new(engine: E, config: StudioConfig) -> Self {
        Self::with_clock(engine, config, SystemClock)
    }
}

impl<E: CanvasEngine, C: Clock> Studio<E, SimulatedProgress, C> {
    /// A studio with simulated progress and the given clock.
    pub fn with_clock(engine: E, config: StudioConfig, clock: C) -> Self {
        let source = SimulatedProgress::new(config.progress_step);
        Studio::with_parts(engine, source, clock, config, Vec::new())
    }
}

impl<E: CanvasEngine, P: ProgressSource, C: Clock> Studio<E, P, C> {
    /// Assemble a studio. `pending` requests are submitted once the engine mounts.
    pub fn with_parts(
        engine: E,
        source: P,
        clock: C,
        config: StudioConfig,
        pending: impl IntoIterator<Item = GenerationRequest>,
    ) -> Self {
        Self {
            gateway: Gateway::new(engine),
            tasks: TaskManager::new(source, &config),
            stabilizer: BoundsStabilizer::new(config.settle_delay(), config.settle_threshold_px),
            notices: NoticeBoard::new(config.notice_duration()),
            pending: pending.into_iter().collect(),
            config,
            clock,
            on_batch_completed: Vec::new(),
            on_task_progress: Vec::new(),
            on_batch_failed: Vec::new(),
            document_revision: 0,
        }
    }

    /// Validate a request and place its placeholders around the viewport center.
    ///
    /// Validation and capacity errors are also posted as notices. Before the
    /// engine mounts this fails with
    /// [`CanvasError::EngineNotReady`](crate::error::CanvasError::EngineNotReady); use
    /// [`Studio::queue_generation`] to defer instead.
    pub fn submit_generation(&mut self, request: GenerationRequest) -> CanvasResult<Vec<ElementId>> {
        if let Err(err) = self.validate(&request) {
            if err.is_user_facing() {
                self.notices.push(err.to_string(), self.clock.now());
            }
            return Err(err);
        }

        let center = self.gateway.viewport_center();
        self.tasks.submit(
            &mut self.gateway,
            request,
            center,
            self.config.tracking,
            &self.clock,
        )
    }

    fn validate(&self, request: &GenerationRequest) -> CanvasResult<()> {
        let model = self.config.models.get(&request.model_id)?;
        request.validate(model)
    }

    /// Submit now if the engine is ready, otherwise hold the request until it is.
    pub fn queue_generation(&mut self, request: GenerationRequest) {
        self.pending.push_back(request);
        self.drain_pending();
    }

    fn drain_pending(&mut self) {
        if !self.gateway.is_ready() {
            return;
        }
        while let Some(request) = self.pending.pop_front() {
            if let Err(err) = self.submit_generation(request) {
                log::warn!("Dropping queued generation request: {}", err);
            }
        }
    }

    /// Advance generation tasks and settle selection bounds.
    pub fn tick(&mut self) {
        self.drain_pending();
        self.tasks.tick(&mut self.gateway, &self.clock);
        self.dispatch_task_events();
        self.sync_engine_changes();
        self.stabilizer.poll(self.clock.now());
    }

    fn dispatch_task_events(&mut self) {
        for event in self.tasks.drain_events() {
            match event {
                TaskEvent::Progress {
                    task_id,
                    element_id,
                    progress,
                } => {
                    for callback in &mut self.on_task_progress {
                        callback(task_id, element_id, progress);
                    }
                }
                TaskEvent::BatchCompleted {
                    request,
                    element_ids,
                } => {
                    if self.config.select_on_complete && !element_ids.is_empty() {
                        self.gateway.select(&element_ids);
                    }
                    for callback in &mut self.on_batch_completed {
                        callback(&request, &element_ids);
                    }
                }
                TaskEvent::BatchFailed {
                    request,
                    element_ids,
                    reason,
                } => {
                    self.notices
                        .push(format!("Generation failed: {}", reason), self.clock.now());
                    for callback in &mut self.on_batch_failed {
                        callback(&request, &element_ids, &reason);
                    }
                }
            }
        }
    }

    /// Consume the engine's change notifications.
    ///
    /// Submits queued requests once the engine has mounted, bumps the document
    /// revision on document-scope changes and re-samples the selection bounds.
    /// Returns true if anything changed.
    pub fn sync_engine_changes(&mut self) -> bool {
        self.drain_pending();

        let changes = self.gateway.drain_changes();
        if changes.is_empty() {
            return false;
        }
        if changes.iter().any(|c| c.scope == ChangeScope::Document) {
            self.document_revision += 1;
        }
        self.refresh_selection_bounds();
        true
    }

    fn refresh_selection_bounds(&mut self) {
        let Some(id) = self.gateway.single_selection() else {
            self.stabilizer.reset();
            return;
        };
        match self.gateway.query_screen_bounds(id) {
            Some(bounds) => {
                self.stabilizer.observe(id, bounds, self.clock.now());
            }
            None => self.stabilizer.reset(),
        }
    }

    /// Debounced screen bounds of `element_id` while it is the selected element.
    pub fn stable_bounds(&self, element_id: ElementId) -> Option<StableBounds> {
        self.stabilizer.stable_bounds(element_id)
    }

    /// Layer panel rows, topmost first.
    pub fn layers(&self) -> Vec<Layer> {
        layers::layers(&self.gateway)
    }

    pub fn reorder_layer(&mut self, from: usize, to: usize) {
        layers::reorder(&mut self.gateway, from, to);
    }

    pub fn set_layer_visibility(&mut self, id: ElementId, visible: bool) -> bool {
        layers::set_visibility(&mut self.gateway, id, visible)
    }

    pub fn set_layer_locked(&mut self, id: ElementId, locked: bool) -> bool {
        layers::set_locked(&mut self.gateway, id, locked)
    }

    pub fn on_batch_completed(&mut self, callback: impl FnMut(&GenerationRequest, &[ElementId]) + 'static) {
        self.on_batch_completed.push(Box::new(callback));
    }

    pub fn on_task_progress(&mut self, callback: impl FnMut(TaskId, ElementId, u8) + 'static) {
        self.on_task_progress.push(Box::new(callback));
    }

    pub fn on_batch_failed(
        &mut self,
        callback: impl FnMut(&GenerationRequest, &[ElementId], &str) + 'static,
    ) {
        self.on_batch_failed.push(Box::new(callback));
    }

    /// Notices that have not expired yet.
    pub fn notices(&mut self) -> &[Notice] {
        let now = self.clock.now();
        self.notices.active(now)
    }

    /// Live tasks in registration order.
    pub fn tasks(&self) -> &[GenerationTask] {
        self.tasks.tasks()
    }

    pub fn task_for_element(&self, element_id: ElementId) -> Option<&GenerationTask> {
        self.tasks.task_for_element(element_id)
    }

    pub fn has_live_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Incremented whenever the engine reports a document-scope change.
    pub fn document_revision(&self) -> u64 {
        self.document_revision
    }

    pub fn gateway(&self) -> &Gateway<E> {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut Gateway<E> {
        &mut self.gateway
    }

    pub fn engine(&self) -> &E {
        self.gateway.engine()
    }

    pub fn engine_mut(&mut self) -> &mut E {
        self.gateway.engine_mut()
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<E: CanvasEngine, P: ProgressSource, C: Clock> std::fmt::Debug for Studio<E, P, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("live_tasks", &self.tasks.len())
            .field("pending", &self.pending.len())
            .field("document_revision", &self.document_revision)
            .finish_non_exhaustive()
    }
}
