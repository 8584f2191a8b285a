//! Simulated player
//!
//! Stands in for a real audio player: reports playing, "plays" each current
//! entry for its approximate duration (divided by a speed factor) and
//! advances the queue. Stalls at the queue tail until the next song lands.

use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use moodwave_common::events::{MoodwaveEvent, PlaybackState};
use moodwave_common::time::format_mm_ss;

use crate::orchestrator::Orchestrator;

pub struct SimulatedPlayer {
    orchestrator: Orchestrator,
    speed: f64,
    max_songs: usize,
}

impl SimulatedPlayer {
    /// `speed` > 1 plays faster than real time; `max_songs` of 0 means no limit
    pub fn new(orchestrator: Orchestrator, speed: f64, max_songs: usize) -> Self {
        Self {
            orchestrator,
            speed,
            max_songs,
        }
    }

    /// Play until the song limit or the end of the trajectory; returns songs played
    pub async fn run(&self) -> usize {
        let mut events = self.orchestrator.subscribe_events();
        let mut played = 0;

        self.orchestrator.set_playback_state(PlaybackState::Playing);

        loop {
            let snapshot = self.orchestrator.snapshot();
            let Some(entry) = snapshot.entries.get(snapshot.current_index).cloned() else {
                warn!("Nothing to play");
                break;
            };

            info!(
                queue_index = entry.queue_index,
                title = %entry.title,
                duration = %format_mm_ss(entry.approx_duration_secs),
                audio_ref = %entry.audio_ref,
                "Now playing"
            );
            tokio::time::sleep(play_time(entry.approx_duration_secs, self.speed)).await;
            played += 1;

            if self.max_songs > 0 && played >= self.max_songs {
                info!(played, "Song limit reached");
                break;
            }

            if self.orchestrator.playback_finished() {
                continue;
            }

            // At the tail: wait for the next song unless the trajectory is done
            if snapshot.current_index + 1 >= snapshot.trajectory.len() {
                info!(played, "Trajectory complete");
                break;
            }
            if !self.wait_for_next(&mut events).await {
                break;
            }
        }

        self.orchestrator.set_playback_state(PlaybackState::Paused);
        played
    }

    /// Block until the queue can advance; false if the event stream closed
    async fn wait_for_next(
        &self,
        events: &mut tokio::sync::broadcast::Receiver<MoodwaveEvent>,
    ) -> bool {
        info!("Waiting for the next song");
        loop {
            if self.orchestrator.playback_finished() {
                return true;
            }

            match events.recv().await {
                Ok(MoodwaveEvent::GenerationFailed { queue_index, error, .. }) => {
                    warn!(queue_index, error = %error, "Next song failed, retrying");
                    self.orchestrator.retry();
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return false,
            }
        }
    }
}

/// Wall time for a song of `duration_secs`
///
/// Falls back to real time when `speed` is not positive or the scaled time
/// does not fit a `Duration`.
fn play_time(duration_secs: f64, speed: f64) -> Duration {
    let duration_secs = duration_secs.max(0.0);
    let real_time = Duration::try_from_secs_f64(duration_secs).unwrap_or(Duration::ZERO);
    if !(speed.is_finite() && speed > 0.0) {
        return real_time;
    }
    Duration::try_from_secs_f64(duration_secs / speed).unwrap_or(real_time)
}
