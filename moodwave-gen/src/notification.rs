//! Final-artifact notification channel
//!
//! Single-slot publish/subscribe: job clients publish when a job that already
//! returned a provisional entry later produces its final local artifact. At
//! most one handler is registered; subscribing replaces the previous one and
//! events published with no handler are dropped.

use std::fmt;
use std::sync::{Arc, Mutex};

/// A late final artifact for an already-returned job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalReady {
    pub job_id: String,
    pub local_ref: String,
}

type Handler = Arc<dyn Fn(FinalReady) + Send + Sync>;

/// Handle to the channel; clones share the same slot
#[derive(Clone, Default)]
pub struct NotificationChannel {
    slot: Arc<Mutex<Option<Handler>>>,
}

impl NotificationChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`, replacing any earlier one
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(FinalReady) + Send + Sync + 'static,
    {
        *self.lock_slot() = Some(Arc::new(handler));
    }

    /// Remove the current handler, if any
    pub fn unsubscribe(&self) {
        *self.lock_slot() = None;
    }

    pub fn has_subscriber(&self) -> bool {
        self.lock_slot().is_some()
    }

    /// Deliver to the current handler; a no-op without one
    ///
    /// The handler runs after the slot lock is released, so it may itself
    /// subscribe or unsubscribe.
    pub fn publish(&self, job_id: impl Into<String>, local_ref: impl Into<String>) {
        let handler = self.lock_slot().clone();
        let event = FinalReady {
            job_id: job_id.into(),
            local_ref: local_ref.into(),
        };

        match handler {
            Some(handler) => handler(event),
            None => tracing::debug!(job_id = %event.job_id, "Final artifact dropped, no subscriber"),
        }
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Option<Handler>> {
        // Handlers never run under this lock; a poisoned slot is still valid.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationChannel")
            .field("subscribed", &self.has_subscriber())
            .finish()
    }
}
