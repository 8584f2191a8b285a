//! Listen-before-generate dwell timer bookkeeping
//!
//! The timer is keyed on the current entry (index and audio reference). It
//! is armed while that entry plays and cancelled on pause, navigation and
//! shutdown. The spawned task only holds the cancellation token; whether the
//! dwell really elapsed is re-checked against this state when it fires.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct ArmedDwell {
    index: usize,
    audio_ref: String,
    since: Instant,
    token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct DwellTimer {
    armed: Option<ArmedDwell>,
}

impl DwellTimer {
    /// Armed for exactly this entry
    pub fn is_armed_for(&self, index: usize, audio_ref: &str) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|a| a.index == index && a.audio_ref == audio_ref)
    }

    pub fn armed_index(&self) -> Option<usize> {
        self.armed.as_ref().map(|a| a.index)
    }

    /// Replace any armed timer; returns the new token and deadline
    pub fn arm(
        &mut self,
        index: usize,
        audio_ref: &str,
        dwell: Duration,
    ) -> (CancellationToken, Instant) {
        self.cancel();

        let since = Instant::now();
        let token = CancellationToken::new();
        self.armed = Some(ArmedDwell {
            index,
            audio_ref: audio_ref.to_string(),
            since,
            token: token.clone(),
        });
        (token, since + dwell)
    }

    /// Cancel the armed timer; true if one was armed
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some(armed) => {
                armed.token.cancel();
                true
            }
            None => false,
        }
    }

    /// The full dwell window has passed on `index` without interruption
    pub fn has_elapsed(&self, index: usize, dwell: Duration) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|a| a.index == index && a.since.elapsed() >= dwell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_requires_full_window() {
        let dwell = Duration::from_secs(10);
        let mut timer = DwellTimer::default();
        let (_token, _) = timer.arm(0, "a.mp3", dwell);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(!timer.has_elapsed(0, dwell));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(timer.has_elapsed(0, dwell));
        assert!(!timer.has_elapsed(1, dwell));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_cancels_previous_and_restarts_window() {
        let dwell = Duration::from_secs(10);
        let mut timer = DwellTimer::default();
        let (first, _) = timer.arm(0, "a.mp3", dwell);

        tokio::time::advance(Duration::from_secs(8)).await;
        let (second, _) = timer.arm(0, "a.mp3", dwell);
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());

        tokio::time::advance(Duration::from_secs(8)).await;
        assert!(!timer.has_elapsed(0, dwell));
        assert!(timer.is_armed_for(0, "a.mp3"));
        assert!(!timer.is_armed_for(0, "b.mp3"));

        assert!(timer.cancel());
        assert!(second.is_cancelled());
        assert_eq!(timer.armed_index(), None);
        assert!(!timer.cancel());
    }
}
