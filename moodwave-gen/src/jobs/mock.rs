//! Offline mock jobs
//!
//! Returns a provisional entry after a fixed delay, then independently
//! publishes a different final reference on the notification channel.

use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{GenerationRequest, Provider, SongQueueEntry};
use crate::notification::NotificationChannel;

const MOCK_TITLE: &str = "Mock Song";
const MOCK_DURATION_SECS: f64 = 30.0;
/// Public domain sample tracks, numbered 1..=16
const MOCK_TRACK_COUNT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockTiming {
    /// Latency before the provisional entry is returned
    pub song_delay: Duration,
    /// Delay between the return and the final-artifact notification
    pub final_delay: Duration,
}

impl Default for MockTiming {
    fn default() -> Self {
        Self {
            song_delay: Duration::from_millis(1500),
            final_delay: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockJobs {
    provider: Provider,
    timing: MockTiming,
}

impl MockJobs {
    pub fn new(provider: Provider, timing: MockTiming) -> Self {
        Self { provider, timing }
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        notifications: &NotificationChannel,
    ) -> SongQueueEntry {
        tokio::time::sleep(self.timing.song_delay).await;

        let job_id = format!("mock-{}", Uuid::new_v4());
        let stream_ref = mock_track_url(request.queue_index);
        let final_ref = format!("{}?quality=final", stream_ref);

        info!(
            provider = %self.provider,
            job_id = %job_id,
            queue_index = request.queue_index,
            "Mock song ready"
        );

        let publisher = notifications.clone();
        let final_delay = self.timing.final_delay;
        let notify_id = job_id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(final_delay).await;
            debug!(job_id = %notify_id, "Publishing mock final artifact");
            publisher.publish(notify_id, final_ref);
        });

        SongQueueEntry {
            queue_index: request.queue_index,
            audio_ref: stream_ref,
            title: MOCK_TITLE.to_string(),
            approx_duration_secs: MOCK_DURATION_SECS,
            provider: self.provider,
            job_id: Some(job_id),
        }
    }
}

fn mock_track_url(queue_index: usize) -> String {
    format!(
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-{}.mp3",
        queue_index % MOCK_TRACK_COUNT + 1
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::FinalReady;
    use std::sync::{Arc, Mutex};

    fn request(queue_index: usize) -> GenerationRequest {
        GenerationRequest {
            lyrics: "Uplifting song".to_string(),
            style_hint: "Pop".to_string(),
            mood_hint: "Sad".to_string(),
            queue_index,
        }
    }

    #[test]
    fn test_track_urls_wrap() {
        assert!(mock_track_url(0).ends_with("SoundHelix-Song-1.mp3"));
        assert!(mock_track_url(16).ends_with("SoundHelix-Song-1.mp3"));
        assert!(mock_track_url(3).ends_with("SoundHelix-Song-4.mp3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_returns_then_notifies() {
        let channel = NotificationChannel::new();
        let seen: Arc<Mutex<Vec<FinalReady>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        channel.subscribe(move |event| sink.lock().unwrap().push(event));

        let mock = MockJobs::new(Provider::Suno, MockTiming::default());
        let started = tokio::time::Instant::now();
        let entry = mock.generate(&request(0), &channel).await;

        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert_eq!(entry.title, "Mock Song");
        assert_eq!(entry.provider, Provider::Suno);
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(2001)).await;
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(Some(&seen[0].job_id), entry.job_id.as_ref());
        assert_ne!(seen[0].local_ref, entry.audio_ref);
    }
}
