//! Single-slot, auto-dismissing notification channel.
//!
//! A new notification replaces whatever is showing. Expiry is evaluated
//! lazily when the slot is read, so nothing has to run in the background.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub is_error: bool,
    pub shown_at: Instant,
}

#[derive(Debug)]
pub struct Notifier {
    slot: Option<Notification>,
    ttl: Duration,
    /// Number of notifications shown so far.
    sequence: u64,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: None,
            ttl,
            sequence: 0,
        }
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.show(message, false);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(message, true);
    }

    pub fn show(&mut self, message: impl Into<String>, is_error: bool) {
        let message = message.into();
        tracing::debug!(is_error, message = %message, "Notification");
        self.slot = Some(Notification {
            message,
            is_error,
            shown_at: Instant::now(),
        });
        self.sequence += 1;
    }

    /// The visible notification, if it has not expired yet.
    pub fn current(&self) -> Option<&Notification> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<&Notification> {
        self.slot
            .as_ref()
            .filter(|n| now.saturating_duration_since(n.shown_at) < self.ttl)
    }

    /// Last notification shown, expired or not.
    pub fn last(&self) -> Option<&Notification> {
        self.slot.as_ref()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn dismiss(&mut self) {
        self.slot = None;
    }
}
