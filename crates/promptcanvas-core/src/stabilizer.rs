//! Debounced screen bounds for the selected element.
//!
//! Overlay UI (toolbars, labels, progress veils) anchors to the bounds
//! published here instead of the raw per-frame bounds, so it stays still
//! while an element is being dragged, resized or the camera is moving.
//!
//! ```text
//! Unknown --first sample--> Settled --change >= threshold--> Moving
//!                              ^                                |
//!                              +---- quiet for settle delay ----+
//! ```

use crate::clock::{Duration, Instant};
use crate::element::ElementId;
use kurbo::Rect;

/// Debounce state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleState {
    /// Nothing tracked, or the tracked element went away.
    Unknown,
    /// Published bounds match the element.
    Settled,
    /// The element is changing; publication is withheld.
    Moving,
}

/// Bounds consumers may anchor overlay UI to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StableBounds {
    /// Last published bounds, in screen coordinates.
    pub bounds: Rect,
    /// True while the element is changing; overlay chrome should hide.
    pub is_settling: bool,
    /// Incremented every time new bounds are published.
    pub revision: u64,
}

/// Tracks one element's screen bounds and publishes them once they settle.
#[derive(Debug, Clone)]
pub struct BoundsStabilizer {
    settle_delay: Duration,
    threshold: f64,
    tracked: Option<ElementId>,
    state: SettleState,
    published: Option<Rect>,
    /// Most recent sample, published once the element goes quiet.
    latest: Option<Rect>,
    /// Sample at the last qualifying change; later samples are measured against it.
    anchor: Option<Rect>,
    last_change: Option<Instant>,
    revision: u64,
}

impl BoundsStabilizer {
    pub fn new(settle_delay: Duration, threshold: f64) -> Self {
        Self {
            settle_delay,
            threshold,
            tracked: None,
            state: SettleState::Unknown,
            published: None,
            latest: None,
            anchor: None,
            last_change: None,
            revision: 0,
        }
    }

    pub fn state(&self) -> SettleState {
        self.state
    }

    pub fn tracked(&self) -> Option<ElementId> {
        self.tracked
    }

    /// Forget everything; used when the selection clears or the element vanishes.
    pub fn reset(&mut self) {
        self.tracked = None;
        self.state = SettleState::Unknown;
        self.published = None;
        self.latest = None;
        self.anchor = None;
        self.last_change = None;
    }

    /// Feed a bounds sample for `element_id`. Returns true if bounds were published.
    pub fn observe(&mut self, element_id: ElementId, sample: Rect, now: Instant) -> bool {
        if self.tracked != Some(element_id) {
            self.reset();
            self.tracked = Some(element_id);
        }

        let mut published = self.poll(now);

        match self.state {
            SettleState::Unknown => {
                self.publish(sample);
                published = true;
            }
            SettleState::Settled => {
                if self.published.is_some_and(|p| self.differs(p, sample)) {
                    self.state = SettleState::Moving;
                    self.latest = Some(sample);
                    self.anchor = Some(sample);
                    self.last_change = Some(now);
                }
            }
            SettleState::Moving => {
                if self.anchor.is_none_or(|a| self.differs(a, sample)) {
                    self.anchor = Some(sample);
                    self.last_change = Some(now);
                }
                self.latest = Some(sample);
            }
        }

        published
    }

    /// Publish the latest sample once the settle delay has passed without
    /// further change. Returns true if bounds were published.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.state != SettleState::Moving {
            return false;
        }
        let quiet = self
            .last_change
            .is_some_and(|changed| now.saturating_duration_since(changed) >= self.settle_delay);
        match (quiet, self.latest) {
            (true, Some(latest)) => {
                self.publish(latest);
                true
            }
            _ => false,
        }
    }

    /// Bounds to anchor overlay UI for `element_id`, if it is the tracked one.
    pub fn stable_bounds(&self, element_id: ElementId) -> Option<StableBounds> {
        if self.tracked != Some(element_id) {
            return None;
        }
        self.published.map(|bounds| StableBounds {
            bounds,
            is_settling: self.state == SettleState::Moving,
            revision: self.revision,
        })
    }

    fn publish(&mut self, bounds: Rect) {
        self.published = Some(bounds);
        self.latest = Some(bounds);
        self.anchor = None;
        self.state = SettleState::Settled;
        self.last_change = None;
        self.revision += 1;
    }

    fn differs(&self, a: Rect, b: Rect) -> bool {
        (a.x0 - b.x0).abs() >= self.threshold
            || (a.y0 - b.y0).abs() >= self.threshold
            || (a.width() - b.width()).abs() >= self.threshold
            || (a.height() - b.height()).abs() >= self.threshold
    }
}
