//! Transient user notices.

use crate::clock::{Duration, Instant};

/// A message shown to the user until it expires.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub message: String,
    pub expires_at: Instant,
}

/// Auto-dismissing notices, oldest first.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    duration: Duration,
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            notices: Vec::new(),
        }
    }

    /// Post a notice. Repeating the newest message refreshes it instead.
    pub fn push(&mut self, message: impl Into<String>, now: Instant) {
        self.notices.retain(|n| n.expires_at > now);
        let message = message.into();
        let expires_at = now + self.duration;
        match self.notices.last_mut() {
            Some(last) if last.message == message => last.expires_at = expires_at,
            _ => self.notices.push(Notice { message, expires_at }),
        }
    }

    /// Notices still visible at `now`; expired ones are dropped.
    pub fn active(&mut self, now: Instant) -> &[Notice] {
        self.notices.retain(|n| n.expires_at > now);
        &self.notices
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }
}
