//! Generation orchestrator
//!
//! Owns the song queue, the index-to-mood trajectory and the playback-driven
//! policy deciding when the next song is generated.
//!
//! Slot `k > 0` is generated only when the player is playing, entry `k - 1`
//! is current and has been listened to without interruption for the dwell
//! time, no slot is locked, the trajectory has a mood for `k` and the queue
//! does not hold `k` yet. Late final artifacts arrive on the
//! [`NotificationChannel`] and are spliced in without touching the current
//! entry.
//!
//! Session state sits behind a std mutex that is never held across an
//! await, so player callbacks and the notification handler stay synchronous.

pub mod queue;
pub mod slots;

mod dwell;

pub use queue::{SongQueue, UpgradeOutcome};
pub use slots::SlotState;

use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use moodwave_common::events::{
    EventBus, GenerationTrigger, MoodwaveEvent, NavigationCause, PlaybackState,
};

use crate::context::{EnvironmentContext, EnvironmentSource, HealthSnapshot, HealthSource};
use crate::jobs::{GenerationRequest, SongGenerator, SongQueueEntry};
use crate::lyrics::{LyricsGenerator, FALLBACK_LYRICS};
use crate::notification::{FinalReady, NotificationChannel};
use crate::prompt::{build_prompt, UserInput};
use crate::trajectory;
use dwell::DwellTimer;
use slots::GenerationLock;

/// Orchestrator tuning
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Continuous listening time before the next slot is generated
    pub listen_before_generate: Duration,
    pub trajectory_steps: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            listen_before_generate: Duration::from_millis(10_000),
            trajectory_steps: trajectory::DEFAULT_STEPS,
        }
    }
}

/// External collaborators
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn SongGenerator>,
    pub lyrics: Arc<dyn LyricsGenerator>,
    pub health: Arc<dyn HealthSource>,
    pub environment: Arc<dyn EnvironmentSource>,
}

/// Why initial generation did not start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// Blank form fields
    IncompleteInput(Vec<&'static str>),
    MissingHealth,
    EmptyTrajectory,
}

/// Why a generation trigger was a no-op
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ShutDown,
    /// No session started yet
    NotStarted,
    NotPlaying,
    NoCurrentEntry,
    DwellNotElapsed,
    /// A job already holds the lock for this index
    AlreadyLocked(usize),
    /// No mood for this index
    TrajectoryExhausted(usize),
    AlreadyQueued(usize),
    /// Result arrived after the queue moved past this index
    Superseded(usize),
}

/// Result of one generation trigger
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Filled { index: usize },
    Failed { index: usize, error: String },
    Blocked(BlockReason),
    Skipped(SkipReason),
}

/// Read-only view for a presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub entries: Vec<SongQueueEntry>,
    pub current_index: usize,
    pub locked_index: Option<usize>,
    pub trajectory: Vec<String>,
    /// One state per trajectory mood
    pub slots: Vec<SlotState>,
    pub staged_indices: Vec<usize>,
    pub playback_state: PlaybackState,
}

#[derive(Debug, Default)]
struct SessionState {
    input: Option<UserInput>,
    environment: EnvironmentContext,
    trajectory: Vec<String>,
    queue: SongQueue,
    lock: GenerationLock,
    dwell: DwellTimer,
    playback: PlaybackState,
    shut_down: bool,
}

impl SessionState {
    /// Playing, with a current entry whose successor slot still needs a song
    fn dwell_target(&self) -> Option<(usize, String)> {
        if self.shut_down || !self.playback.is_playing() {
            return None;
        }
        let current = self.queue.current()?;
        let next = self.queue.current_index() + 1;
        if next < self.trajectory.len() && next == self.queue.len() {
            Some((self.queue.current_index(), current.audio_ref.clone()))
        } else {
            None
        }
    }
}

struct Inner {
    state: Mutex<SessionState>,
    collaborators: Collaborators,
    notifications: NotificationChannel,
    events: EventBus,
    settings: OrchestratorSettings,
}

#[derive(Clone, Copy)]
enum Direction {
    Previous,
    Next,
}

/// Handle to one generation session; clones share the session
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Create the orchestrator and subscribe it to `notifications`
    pub fn new(
        settings: OrchestratorSettings,
        collaborators: Collaborators,
        notifications: NotificationChannel,
        events: EventBus,
    ) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(SessionState::default()),
            collaborators,
            notifications,
            events,
            settings,
        });

        let weak = Arc::downgrade(&inner);
        inner.notifications.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_final_ready(event);
            }
        });

        Self { inner }
    }

    /// Plan the trajectory for `input` and generate the first song
    pub async fn start(&self, input: UserInput, health: Option<HealthSnapshot>) -> GenerationOutcome {
        if let Err(reason) = precheck(&input, health.as_ref()) {
            warn!(reason = ?reason, "Session not started");
            return GenerationOutcome::Blocked(reason);
        }

        let moods = trajectory::plan(
            &input.current_mood,
            &input.desired_mood,
            self.inner.settings.trajectory_steps,
        );
        info!(moods = ?moods, "Trajectory planned");
        self.inner.events.emit_lossy(MoodwaveEvent::TrajectoryPlanned {
            moods: moods.clone(),
            timestamp: Utc::now(),
        });

        self.request_initial_generation(input, health, moods).await
    }

    /// Generate queue index 0 with `trajectory[0]` as its mood
    ///
    /// Blocked when the input is incomplete, no health snapshot is available
    /// or the trajectory is empty. May be repeated after a failure.
    pub async fn request_initial_generation(
        &self,
        input: UserInput,
        health: Option<HealthSnapshot>,
        trajectory: Vec<String>,
    ) -> GenerationOutcome {
        let health = match precheck(&input, health.as_ref()) {
            Ok(health) => health,
            Err(reason) => {
                warn!(reason = ?reason, "Initial generation blocked");
                return GenerationOutcome::Blocked(reason);
            }
        };
        let Some(mood) = trajectory.first().cloned() else {
            return GenerationOutcome::Blocked(BlockReason::EmptyTrajectory);
        };

        {
            let mut state = self.inner.lock_state();
            if state.shut_down {
                return GenerationOutcome::Skipped(SkipReason::ShutDown);
            }
            if !state.queue.is_empty() {
                return GenerationOutcome::Skipped(SkipReason::AlreadyQueued(0));
            }
            if let Err(locked) = state.lock.try_lock(0) {
                return GenerationOutcome::Skipped(SkipReason::AlreadyLocked(locked));
            }

            state.input = Some(input);
            state.trajectory = trajectory;
            self.inner.emit_started(0, &mood, GenerationTrigger::Initial);
        }

        let environment = self
            .inner
            .collaborators
            .environment
            .fetch_environment_context()
            .await;
        debug!(environment = ?environment, "Environment context fetched");
        self.inner.lock_state().environment = environment;

        self.inner.execute(0, mood, Some(health)).await
    }

    /// Generate the slot after the current entry if every trigger condition holds
    ///
    /// This is what the dwell timer calls; a call while a slot is locked is
    /// a no-op.
    pub async fn generate_next(&self) -> GenerationOutcome {
        self.inner.trigger_next(GenerationTrigger::Manual).await
    }

    /// Player input
    pub fn set_playback_state(&self, playback: PlaybackState) {
        let mut state = self.inner.lock_state();
        let old = state.playback;
        state.playback = playback;

        if old != playback {
            debug!(old = %old, new = %playback, "Playback state changed");
            self.inner.events.emit_lossy(MoodwaveEvent::PlaybackStateChanged {
                old_state: old,
                new_state: playback,
                timestamp: Utc::now(),
            });
        }
        self.inner.refresh_dwell(&mut state, false);
    }

    /// Step back; false at index 0
    pub fn previous(&self) -> bool {
        self.inner
            .navigate(Direction::Previous, NavigationCause::UserPrevious)
    }

    /// Step forward; false at the last entry (nothing is generated on demand)
    pub fn next(&self) -> bool {
        self.inner.navigate(Direction::Next, NavigationCause::UserNext)
    }

    /// Player input: the current song ended
    pub fn playback_finished(&self) -> bool {
        self.inner.navigate(Direction::Next, NavigationCause::AutoAdvance)
    }

    /// Start a fresh dwell window for the current entry
    ///
    /// Returns true if a window was armed.
    pub fn retry(&self) -> bool {
        let mut state = self.inner.lock_state();
        self.inner.refresh_dwell(&mut state, true);
        state.dwell.armed_index().is_some()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let state = self.inner.lock_state();
        let queue_len = state.queue.len();

        QueueSnapshot {
            entries: state.queue.entries().to_vec(),
            current_index: state.queue.current_index(),
            locked_index: state.lock.locked_index(),
            trajectory: state.trajectory.clone(),
            slots: (0..state.trajectory.len())
                .map(|index| state.lock.slot_state(index, queue_len))
                .collect(),
            staged_indices: state.queue.staged_indices(),
            playback_state: state.playback,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<MoodwaveEvent> {
        self.inner.events.subscribe()
    }

    /// Cancel the dwell timer and detach from the notification channel
    ///
    /// In-flight jobs run to completion; their results are discarded.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.lock_state();
            state.shut_down = true;
            state.dwell.cancel();
        }
        self.inner.notifications.unsubscribe();
        info!("Orchestrator shut down");
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit_started(&self, index: usize, mood: &str, trigger: GenerationTrigger) {
        info!(queue_index = index, mood = %mood, trigger = %trigger, "Generation started");
        self.events.emit_lossy(MoodwaveEvent::GenerationStarted {
            queue_index: index,
            mood: mood.to_string(),
            trigger,
            timestamp: Utc::now(),
        });
    }

    async fn trigger_next(self: &Arc<Self>, trigger: GenerationTrigger) -> GenerationOutcome {
        let acquired = {
            let mut state = self.lock_state();
            self.acquire_next(&mut state, trigger)
        };

        match acquired {
            Ok((index, mood)) => self.execute(index, mood, None).await,
            Err(reason) => {
                debug!(reason = ?reason, trigger = %trigger, "Next generation skipped");
                GenerationOutcome::Skipped(reason)
            }
        }
    }

    /// Check every trigger condition and lock the next slot
    fn acquire_next(
        &self,
        state: &mut SessionState,
        trigger: GenerationTrigger,
    ) -> Result<(usize, String), SkipReason> {
        if state.shut_down {
            return Err(SkipReason::ShutDown);
        }
        if state.input.is_none() || state.trajectory.is_empty() {
            return Err(SkipReason::NotStarted);
        }
        if !state.playback.is_playing() {
            return Err(SkipReason::NotPlaying);
        }
        if state.queue.is_empty() {
            return Err(SkipReason::NoCurrentEntry);
        }

        let current = state.queue.current_index();
        let index = current + 1;

        if let Some(locked) = state.lock.locked_index() {
            return Err(SkipReason::AlreadyLocked(locked));
        }
        if !state
            .dwell
            .has_elapsed(current, self.settings.listen_before_generate)
        {
            return Err(SkipReason::DwellNotElapsed);
        }
        let Some(mood) = state.trajectory.get(index).cloned() else {
            return Err(SkipReason::TrajectoryExhausted(index));
        };
        if state.queue.len() > index {
            return Err(SkipReason::AlreadyQueued(index));
        }

        state.lock.try_lock(index).map_err(SkipReason::AlreadyLocked)?;
        self.emit_started(index, &mood, trigger);
        Ok((index, mood))
    }

    /// Run one locked slot's job and merge its result; always releases the lock
    async fn execute(
        self: &Arc<Self>,
        index: usize,
        mood: String,
        health: Option<HealthSnapshot>,
    ) -> GenerationOutcome {
        let health = match health {
            Some(health) => health,
            None => self.collaborators.health.fetch_health_snapshot().await,
        };

        let (input, environment) = {
            let state = self.lock_state();
            (
                state.input.clone().unwrap_or_default(),
                state.environment.clone(),
            )
        };

        let prompt = build_prompt(&input, &mood, &health, &environment);
        let lyrics = match self.collaborators.lyrics.generate_lyrics(&prompt).await {
            Ok(lyrics) => lyrics,
            Err(e) => {
                warn!(queue_index = index, error = %e, "Lyrics generation failed, using fallback");
                FALLBACK_LYRICS.to_string()
            }
        };

        let request = GenerationRequest {
            lyrics,
            style_hint: input.favorite_genre.clone(),
            mood_hint: mood,
            queue_index: index,
        };
        let result = self.collaborators.generator.generate(request).await;

        let mut state = self.lock_state();
        state.lock.release(index);

        let outcome = match result {
            Ok(_) if state.shut_down => GenerationOutcome::Skipped(SkipReason::ShutDown),
            Ok(mut entry) => {
                entry.queue_index = index;
                let title = entry.title.clone();
                let provider = entry.provider;
                let audio_ref = entry.audio_ref.clone();

                match state.queue.append(entry) {
                    Ok(early_final) => {
                        info!(
                            queue_index = index,
                            title = %title,
                            provider = %provider,
                            "Song queued"
                        );
                        self.events.emit_lossy(MoodwaveEvent::SongQueued {
                            queue_index: index,
                            title,
                            provider: provider.to_string(),
                            audio_ref,
                            timestamp: Utc::now(),
                        });
                        if let Some(upgrade) = early_final {
                            self.report_upgrade(&state, upgrade);
                        }
                        GenerationOutcome::Filled { index }
                    }
                    Err(superseded) => {
                        warn!(
                            queue_index = index,
                            queue_len = superseded.queue_len,
                            "Discarding superseded song"
                        );
                        GenerationOutcome::Skipped(SkipReason::Superseded(index))
                    }
                }
            }
            Err(e) => {
                error!(queue_index = index, error = %e, "Song generation failed");
                self.events.emit_lossy(MoodwaveEvent::GenerationFailed {
                    queue_index: index,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                GenerationOutcome::Failed {
                    index,
                    error: e.to_string(),
                }
            }
        };

        if !matches!(outcome, GenerationOutcome::Filled { .. }) {
            state.queue.clear_unmatched();
        }
        self.refresh_dwell(&mut state, false);
        outcome
    }

    fn navigate(self: &Arc<Self>, direction: Direction, cause: NavigationCause) -> bool {
        let mut state = self.lock_state();
        let moved = match direction {
            Direction::Previous => state.queue.previous(),
            Direction::Next => state.queue.next(),
        };

        let Some((old_index, new_index)) = moved else {
            debug!(cause = %cause, "Navigation at queue boundary ignored");
            return false;
        };

        debug!(old_index, new_index, cause = %cause, "Current index changed");
        self.events.emit_lossy(MoodwaveEvent::CurrentIndexChanged {
            old_index,
            new_index,
            cause,
            timestamp: Utc::now(),
        });

        for (queue_index, audio_ref) in state.queue.merge_staged() {
            info!(queue_index, "Staged upgrade merged");
            self.events.emit_lossy(MoodwaveEvent::EntryUpgraded {
                queue_index,
                audio_ref,
                timestamp: Utc::now(),
            });
        }

        self.refresh_dwell(&mut state, false);
        true
    }

    fn handle_final_ready(&self, event: FinalReady) {
        let mut state = self.lock_state();
        if state.shut_down {
            return;
        }
        let outcome = state.queue.apply_final(&event.job_id, event.local_ref);
        self.report_upgrade(&state, outcome);
    }

    fn report_upgrade(&self, state: &SessionState, outcome: UpgradeOutcome) {
        match outcome {
            UpgradeOutcome::Upgraded(queue_index) => {
                let audio_ref = state
                    .queue
                    .get(queue_index)
                    .map(|e| e.audio_ref.clone())
                    .unwrap_or_default();
                info!(queue_index, audio_ref = %audio_ref, "Entry upgraded to final artifact");
                self.events.emit_lossy(MoodwaveEvent::EntryUpgraded {
                    queue_index,
                    audio_ref,
                    timestamp: Utc::now(),
                });
            }
            UpgradeOutcome::Staged(queue_index) => {
                info!(queue_index, "Final artifact staged until entry stops playing");
                self.events.emit_lossy(MoodwaveEvent::UpgradeDeferred {
                    queue_index,
                    timestamp: Utc::now(),
                });
            }
            UpgradeOutcome::UnknownJob => {}
        }
    }

    /// Keep the dwell timer in line with the current entry
    ///
    /// Re-arms when the watched entry changed (or always with `force`) and
    /// cancels when there is nothing to watch.
    fn refresh_dwell(self: &Arc<Self>, state: &mut SessionState, force: bool) {
        match state.dwell_target() {
            None => {
                if state.dwell.cancel() {
                    debug!("Dwell timer cancelled");
                }
            }
            Some((index, audio_ref)) => {
                if !force && state.dwell.is_armed_for(index, &audio_ref) {
                    return;
                }
                let dwell = self.settings.listen_before_generate;
                let (token, deadline) = state.dwell.arm(index, &audio_ref, dwell);
                debug!(queue_index = index, dwell_ms = dwell.as_millis() as u64, "Dwell timer armed");
                spawn_dwell_task(Arc::downgrade(self), token, deadline);
            }
        }
    }
}

/// Input completeness and health availability
fn precheck(input: &UserInput, health: Option<&HealthSnapshot>) -> Result<HealthSnapshot, BlockReason> {
    if !input.is_complete() {
        return Err(BlockReason::IncompleteInput(input.missing_fields()));
    }
    health.copied().ok_or(BlockReason::MissingHealth)
}

fn spawn_dwell_task(inner: Weak<Inner>, token: CancellationToken, deadline: Instant) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep_until(deadline) => {
                if let Some(inner) = inner.upgrade() {
                    let outcome = inner.trigger_next(GenerationTrigger::Dwell).await;
                    debug!(outcome = ?outcome, "Dwell timer fired");
                }
            }
        }
    });
}
