//! Orchestrator behavior under virtual time
//!
//! Every test runs on a paused clock; sleeps in the test body advance it
//! deterministically past dwell deadlines and fake job latencies.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::sleep;

use moodwave_common::events::{EventBus, MoodwaveEvent, PlaybackState};
use moodwave_gen::context::{
    HealthSnapshot, StaticEnvironmentSource, StaticHealthSource,
};
use moodwave_gen::error::GenerationError;
use moodwave_gen::jobs::{
    GenerationRequest, JobClient, MockTiming, Provider, SongGenerator, SongQueueEntry,
};
use moodwave_gen::lyrics::MockLyricist;
use moodwave_gen::notification::NotificationChannel;
use moodwave_gen::orchestrator::{
    BlockReason, Collaborators, GenerationOutcome, Orchestrator, OrchestratorSettings,
    SkipReason, SlotState,
};
use moodwave_gen::prompt::UserInput;

const DWELL: Duration = Duration::from_secs(10);
const JOB_LATENCY: Duration = Duration::from_secs(1);

/// Generator with a fixed latency and a scripted failure list
struct FakeGenerator {
    calls: AtomicUsize,
    failures: Mutex<VecDeque<bool>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeGenerator {
    fn new() -> Arc<Self> {
        Self::with_failures(&[])
    }

    /// `script[n]` true makes call `n` fail; calls past the script succeed
    fn with_failures(script: &[bool]) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failures: Mutex::new(script.iter().copied().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn moods(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.mood_hint.clone())
            .collect()
    }
}

#[async_trait]
impl SongGenerator for FakeGenerator {
    fn provider(&self) -> Provider {
        Provider::Suno
    }

    async fn generate(&self, request: GenerationRequest) -> Result<SongQueueEntry, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        let fail = self.failures.lock().unwrap().pop_front().unwrap_or(false);

        sleep(JOB_LATENCY).await;

        if fail {
            return Err(GenerationError::Submission {
                provider: Provider::Suno,
                message: "HTTP 503".to_string(),
            });
        }

        let index = request.queue_index;
        Ok(SongQueueEntry {
            queue_index: index,
            audio_ref: format!("https://cdn.example/stream-{}.mp3", index),
            title: format!("Song {}", index),
            approx_duration_secs: 30.0,
            provider: Provider::Suno,
            job_id: Some(format!("job-{}", index)),
        })
    }
}

fn input() -> UserInput {
    UserInput {
        name: "Ada".to_string(),
        age: "36".to_string(),
        current_mood: "Sad".to_string(),
        desired_mood: "Joyful".to_string(),
        favorite_genre: "Jazz".to_string(),
        favorite_band: "Miles Davis".to_string(),
        activity: "Cooking".to_string(),
    }
}

fn health() -> Option<HealthSnapshot> {
    Some(HealthSnapshot {
        heart_rate: Some(72.0),
        steps: Some(4000),
    })
}

fn orchestrator_with(
    generator: Arc<dyn SongGenerator>,
    notifications: NotificationChannel,
    steps: usize,
) -> Orchestrator {
    Orchestrator::new(
        OrchestratorSettings {
            listen_before_generate: DWELL,
            trajectory_steps: steps,
        },
        Collaborators {
            generator,
            lyrics: Arc::new(MockLyricist::new("Ada", None, "Sad", "Joyful")),
            health: Arc::new(StaticHealthSource::new(HealthSnapshot::default())),
            environment: Arc::new(StaticEnvironmentSource::default()),
        },
        notifications,
        EventBus::new(128),
    )
}

fn drain(rx: &mut broadcast::Receiver<MoodwaveEvent>) -> Vec<MoodwaveEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn count_upgrades(events: &[MoodwaveEvent], index: usize) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, MoodwaveEvent::EntryUpgraded { queue_index, .. } if *queue_index == index))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_start_plans_trajectory_and_fills_first_slot() {
    let generator = FakeGenerator::new();
    let orchestrator = orchestrator_with(generator.clone(), NotificationChannel::new(), 5);

    let outcome = orchestrator.start(input(), health()).await;
    assert_eq!(outcome, GenerationOutcome::Filled { index: 0 });

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.trajectory.len(), 5);
    assert_eq!(snapshot.trajectory[0], "Sad");
    assert_eq!(snapshot.trajectory[4], "Joyful");
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.current_index, 0);
    assert_eq!(snapshot.locked_index, None);
    assert_eq!(snapshot.slots[0], SlotState::Filled);
    assert_eq!(snapshot.slots[1], SlotState::Empty);
    assert_eq!(generator.moods(), vec!["Sad".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_dwell_generates_next_slot_once() {
    let generator = FakeGenerator::new();
    let orchestrator = orchestrator_with(generator.clone(), NotificationChannel::new(), 5);
    orchestrator.start(input(), health()).await;

    orchestrator.set_playback_state(PlaybackState::Playing);
    sleep(Duration::from_millis(9_500)).await;
    assert_eq!(generator.calls(), 1);
    assert_eq!(orchestrator.snapshot().locked_index, None);

    // Dwell fired; job in flight
    sleep(Duration::from_secs(1)).await;
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.locked_index, Some(1));
    assert_eq!(snapshot.slots[1], SlotState::Generating);
    assert_eq!(
        orchestrator.generate_next().await,
        GenerationOutcome::Skipped(SkipReason::AlreadyLocked(1))
    );

    sleep(Duration::from_secs(1)).await;
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.locked_index, None);
    assert_eq!(snapshot.entries[1].queue_index, 1);
    assert_eq!(generator.calls(), 2);
    assert_eq!(generator.moods()[1], snapshot.trajectory[1]);

    // Slot 2 waits until entry 1 is current
    sleep(Duration::from_secs(30)).await;
    assert_eq!(generator.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_pause_restarts_listen_window() {
    let generator = FakeGenerator::new();
    let orchestrator = orchestrator_with(generator.clone(), NotificationChannel::new(), 5);
    orchestrator.start(input(), health()).await;

    orchestrator.set_playback_state(PlaybackState::Playing);
    sleep(Duration::from_secs(8)).await;
    orchestrator.set_playback_state(PlaybackState::Paused);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(generator.calls(), 1);

    orchestrator.set_playback_state(PlaybackState::Playing);
    sleep(Duration::from_secs(8)).await;
    assert_eq!(generator.calls(), 1);

    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(generator.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_cancels_dwell_and_respects_bounds() {
    let generator = FakeGenerator::new();
    let orchestrator = orchestrator_with(generator.clone(), NotificationChannel::new(), 5);
    orchestrator.start(input(), health()).await;

    assert!(!orchestrator.previous());
    assert!(!orchestrator.next());
    assert_eq!(orchestrator.snapshot().current_index, 0);

    orchestrator.set_playback_state(PlaybackState::Playing);
    sleep(DWELL + Duration::from_millis(1_500)).await;
    assert_eq!(orchestrator.snapshot().entries.len(), 2);

    // Entry 1 becomes current: a fresh window starts for slot 2
    assert!(orchestrator.next());
    sleep(Duration::from_secs(5)).await;
    assert!(orchestrator.previous());
    sleep(Duration::from_secs(8)).await;
    assert_eq!(generator.calls(), 2);

    assert!(orchestrator.next());
    sleep(DWELL + Duration::from_millis(1_500)).await;
    assert_eq!(generator.calls(), 3);
    assert_eq!(orchestrator.snapshot().entries.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_failure_empties_slot_until_retry() {
    let generator = FakeGenerator::with_failures(&[false, true]);
    let orchestrator = orchestrator_with(generator.clone(), NotificationChannel::new(), 5);
    let mut events = orchestrator.subscribe_events();
    orchestrator.start(input(), health()).await;

    orchestrator.set_playback_state(PlaybackState::Playing);
    sleep(DWELL + Duration::from_millis(1_500)).await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(generator.calls(), 2);
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.locked_index, None);
    assert_eq!(snapshot.slots[1], SlotState::Empty);
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        MoodwaveEvent::GenerationFailed { queue_index: 1, .. }
    )));

    // No automatic retry
    sleep(Duration::from_secs(60)).await;
    assert_eq!(generator.calls(), 2);

    assert!(orchestrator.retry());
    sleep(DWELL + Duration::from_millis(1_500)).await;
    assert_eq!(generator.calls(), 3);
    assert_eq!(orchestrator.snapshot().entries.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_final_artifact_deferred_for_current_entry() {
    let notifications = NotificationChannel::new();
    let generator = FakeGenerator::new();
    let orchestrator = orchestrator_with(generator.clone(), notifications.clone(), 5);
    let mut events = orchestrator.subscribe_events();
    orchestrator.start(input(), health()).await;
    orchestrator.set_playback_state(PlaybackState::Playing);

    notifications.publish("job-0", "/music/final-0.mp3");
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.entries[0].audio_ref, "https://cdn.example/stream-0.mp3");
    assert_eq!(snapshot.staged_indices, vec![0]);

    sleep(DWELL + Duration::from_millis(1_500)).await;

    // Not current: replaced immediately
    notifications.publish("job-1", "/music/final-1.mp3");
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.entries[1].audio_ref, "/music/final-1.mp3");
    assert_eq!(snapshot.entries[0].audio_ref, "https://cdn.example/stream-0.mp3");

    assert!(orchestrator.next());
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.entries[0].audio_ref, "/music/final-0.mp3");
    assert_eq!(snapshot.entries[0].title, "Song 0");
    assert!(snapshot.staged_indices.is_empty());

    let events = drain(&mut events);
    assert!(events
        .iter()
        .any(|e| matches!(e, MoodwaveEvent::UpgradeDeferred { queue_index: 0, .. })));
    assert_eq!(count_upgrades(&events, 0), 1);
    assert_eq!(count_upgrades(&events, 1), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_final_artifact_is_ignored() {
    let notifications = NotificationChannel::new();
    let orchestrator = orchestrator_with(FakeGenerator::new(), notifications.clone(), 5);
    orchestrator.start(input(), health()).await;

    notifications.publish("job-unknown", "/music/other.mp3");
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.entries[0].audio_ref, "https://cdn.example/stream-0.mp3");
    assert!(snapshot.staged_indices.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_discards_in_flight_result() {
    let notifications = NotificationChannel::new();
    let generator = FakeGenerator::new();
    let orchestrator = orchestrator_with(generator.clone(), notifications.clone(), 5);
    orchestrator.start(input(), health()).await;
    assert!(notifications.has_subscriber());

    orchestrator.set_playback_state(PlaybackState::Playing);
    sleep(DWELL + Duration::from_millis(500)).await;
    assert_eq!(orchestrator.snapshot().locked_index, Some(1));

    orchestrator.shutdown();
    assert!(!notifications.has_subscriber());

    sleep(Duration::from_secs(2)).await;
    let snapshot = orchestrator.snapshot();
    assert_eq!(generator.calls(), 2);
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.locked_index, None);
    assert_eq!(
        orchestrator.generate_next().await,
        GenerationOutcome::Skipped(SkipReason::ShutDown)
    );
}

#[tokio::test(start_paused = true)]
async fn test_trajectory_end_stops_generation() {
    let generator = FakeGenerator::new();
    // No intermediate samples: just the two endpoint moods
    let orchestrator = orchestrator_with(generator.clone(), NotificationChannel::new(), 0);
    orchestrator.start(input(), health()).await;
    orchestrator.set_playback_state(PlaybackState::Playing);

    sleep(DWELL + Duration::from_millis(1_500)).await;
    assert!(orchestrator.next());
    sleep(Duration::from_secs(60)).await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(generator.calls(), 2);
    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.trajectory.len(), 2);
    assert_eq!(snapshot.slots, vec![SlotState::Filled, SlotState::Filled]);
}

#[tokio::test(start_paused = true)]
async fn test_preconditions_block_or_skip() {
    let generator = FakeGenerator::new();
    let orchestrator = orchestrator_with(generator.clone(), NotificationChannel::new(), 5);

    assert_eq!(
        orchestrator.generate_next().await,
        GenerationOutcome::Skipped(SkipReason::NotStarted)
    );

    let mut incomplete = input();
    incomplete.favorite_band = "  ".to_string();
    assert_eq!(
        orchestrator.start(incomplete, health()).await,
        GenerationOutcome::Blocked(BlockReason::IncompleteInput(vec!["favorite_band"]))
    );
    assert_eq!(
        orchestrator.start(input(), None).await,
        GenerationOutcome::Blocked(BlockReason::MissingHealth)
    );
    assert_eq!(
        orchestrator
            .request_initial_generation(input(), health(), Vec::new())
            .await,
        GenerationOutcome::Blocked(BlockReason::EmptyTrajectory)
    );
    assert_eq!(generator.calls(), 0);

    orchestrator.start(input(), health()).await;
    assert_eq!(
        orchestrator.start(input(), health()).await,
        GenerationOutcome::Skipped(SkipReason::AlreadyQueued(0))
    );
    assert_eq!(
        orchestrator.generate_next().await,
        GenerationOutcome::Skipped(SkipReason::NotPlaying)
    );

    orchestrator.set_playback_state(PlaybackState::Playing);
    assert_eq!(
        orchestrator.generate_next().await,
        GenerationOutcome::Skipped(SkipReason::DwellNotElapsed)
    );
    assert_eq!(generator.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_initial_failure_can_be_repeated() {
    let generator = FakeGenerator::with_failures(&[true]);
    let orchestrator = orchestrator_with(generator.clone(), NotificationChannel::new(), 5);

    let outcome = orchestrator.start(input(), health()).await;
    assert!(matches!(outcome, GenerationOutcome::Failed { index: 0, .. }));
    assert!(orchestrator.snapshot().entries.is_empty());

    let outcome = orchestrator.start(input(), health()).await;
    assert_eq!(outcome, GenerationOutcome::Filled { index: 0 });
    assert_eq!(generator.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_mock_session_upgrades_each_entry_once() {
    let notifications = NotificationChannel::new();
    let client = JobClient::mock(Provider::Suno, MockTiming::default(), notifications.clone());
    let orchestrator = orchestrator_with(Arc::new(client), notifications, 5);
    let mut events = orchestrator.subscribe_events();

    assert_eq!(
        orchestrator.start(input(), health()).await,
        GenerationOutcome::Filled { index: 0 }
    );
    let first = orchestrator.snapshot().entries[0].clone();
    assert!(first.audio_ref.starts_with("https://"));
    assert!(!first.audio_ref.ends_with("?quality=final"));

    orchestrator.set_playback_state(PlaybackState::Playing);
    // Final for entry 0 is staged, entry 1 arrives and upgrades in place
    sleep(DWELL + Duration::from_secs(5)).await;

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.entries[0].audio_ref, first.audio_ref);
    assert!(snapshot.entries[1].audio_ref.ends_with("?quality=final"));

    assert!(orchestrator.next());
    let snapshot = orchestrator.snapshot();
    let upgraded = &snapshot.entries[0];
    assert_eq!(upgraded.audio_ref, format!("{}?quality=final", first.audio_ref));
    assert_eq!(upgraded.title, first.title);
    assert_eq!(upgraded.provider, Provider::Suno);
    assert_eq!(upgraded.job_id, first.job_id);

    assert!(orchestrator.previous());
    assert!(orchestrator.next());
    assert_eq!(count_upgrades(&drain(&mut events), 0), 1);
}
