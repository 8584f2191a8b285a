//! Event types for the Moodwave event system
//!
//! Provides the shared event definitions and the EventBus used by the
//! orchestrator to publish queue and generation progress.

mod playback_types;
mod queue_types;

pub use playback_types::PlaybackState;
pub use queue_types::{GenerationTrigger, NavigationCause};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Moodwave event types
///
/// Events are broadcast via EventBus and serialize with a `type` tag so a
/// presentation layer can forward them verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MoodwaveEvent {
    /// Mood trajectory computed for a new session
    TrajectoryPlanned {
        /// Ordered mood labels; index N drives queue slot N
        moods: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A queue slot was locked and its job started
    GenerationStarted {
        queue_index: usize,
        /// Mood assigned to the slot by the trajectory
        mood: String,
        trigger: GenerationTrigger,
        timestamp: DateTime<Utc>,
    },

    /// A generated song was appended to the queue
    SongQueued {
        queue_index: usize,
        title: String,
        provider: String,
        /// Audio reference the entry starts with (may be a stream)
        audio_ref: String,
        timestamp: DateTime<Utc>,
    },

    /// A job failed; the slot is empty again and may be retried
    GenerationFailed {
        queue_index: usize,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// A queued entry's audio reference was replaced in place
    EntryUpgraded {
        queue_index: usize,
        audio_ref: String,
        timestamp: DateTime<Utc>,
    },

    /// A final artifact arrived for the playing entry and was staged
    ///
    /// Merged (and reported as EntryUpgraded) once the entry stops being current.
    UpgradeDeferred {
        queue_index: usize,
        timestamp: DateTime<Utc>,
    },

    /// The queue cursor moved
    CurrentIndexChanged {
        old_index: usize,
        new_index: usize,
        cause: NavigationCause,
        timestamp: DateTime<Utc>,
    },

    /// Player reported a playing/paused transition
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: DateTime<Utc>,
    },
}

impl MoodwaveEvent {
    /// Short event name, used for logging
    pub fn kind(&self) -> &'static str {
        match self {
            MoodwaveEvent::TrajectoryPlanned { .. } => "TrajectoryPlanned",
            MoodwaveEvent::GenerationStarted { .. } => "GenerationStarted",
            MoodwaveEvent::SongQueued { .. } => "SongQueued",
            MoodwaveEvent::GenerationFailed { .. } => "GenerationFailed",
            MoodwaveEvent::EntryUpgraded { .. } => "EntryUpgraded",
            MoodwaveEvent::UpgradeDeferred { .. } => "UpgradeDeferred",
            MoodwaveEvent::CurrentIndexChanged { .. } => "CurrentIndexChanged",
            MoodwaveEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
        }
    }
}

/// Fan-out of [`MoodwaveEvent`]s to any number of listeners
///
/// Sending never waits: a listener that falls more than `capacity` events
/// behind sees `RecvError::Lagged` and skips ahead.
///
/// ```
/// use moodwave_common::events::{EventBus, MoodwaveEvent};
///
/// let bus = EventBus::new(16);
/// let mut listener = bus.subscribe();
/// bus.emit_lossy(MoodwaveEvent::UpgradeDeferred {
///     queue_index: 0,
///     timestamp: chrono::Utc::now(),
/// });
/// assert_eq!(listener.try_recv().map(|e| e.kind()), Ok("UpgradeDeferred"));
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MoodwaveEvent>,
}

impl EventBus {
    /// `capacity` is the per-listener backlog
    pub fn new(capacity: usize) -> Self {
        let (sender, _initial) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Listener for events sent from now on
    pub fn subscribe(&self) -> broadcast::Receiver<MoodwaveEvent> {
        self.sender.subscribe()
    }

    /// Send, dropping the event if nobody listens
    pub fn emit_lossy(&self, event: MoodwaveEvent) {
        tracing::trace!(event = event.kind(), "Emitting event");
        if self.sender.send(event).is_err() {
            tracing::trace!("No event listeners");
        }
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
