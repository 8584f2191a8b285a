//! Fixed-interval status polling shared by all live backends

use std::time::Duration;
use tracing::{debug, warn};

use super::{Backend, JobStatus};
use crate::error::GenerationError;

/// Delay between status queries and the query budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(5000), 60)
    }
}

/// Where polling stopped
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Streamable preview (two-phase milestone)
    Streamable {
        stream_ref: String,
        title: Option<String>,
        duration_secs: Option<f64>,
    },
    /// Final downloadable artifact
    Final {
        audio_ref: String,
        title: Option<String>,
        duration_secs: Option<f64>,
    },
}

/// Poll `job_id` until it settles
///
/// Each attempt waits `policy.interval` and then queries once. With
/// `accept_stream` set, a `TextReady` status ends polling early. A failed
/// query costs one attempt; running out of attempts is a timeout.
pub async fn poll_job(
    backend: &Backend,
    job_id: &str,
    policy: PollPolicy,
    accept_stream: bool,
) -> Result<PollOutcome, GenerationError> {
    let provider = backend.provider();

    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;

        let status = match backend.status(job_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(job_id = %job_id, attempt = attempt, error = %e, "Status query failed");
                continue;
            }
        };

        debug!(job_id = %job_id, attempt = attempt, status = ?status, "Polled job status");

        match status {
            JobStatus::Succeeded {
                audio_ref,
                title,
                duration_secs,
            } => {
                return Ok(PollOutcome::Final {
                    audio_ref,
                    title,
                    duration_secs,
                })
            }
            JobStatus::TextReady {
                stream_ref,
                title,
                duration_secs,
            } if accept_stream => {
                return Ok(PollOutcome::Streamable {
                    stream_ref,
                    title,
                    duration_secs,
                })
            }
            JobStatus::Failed { reason } => {
                return Err(GenerationError::ProviderReported {
                    provider,
                    job_id: job_id.to_string(),
                    reason,
                })
            }
            JobStatus::TextReady { .. } | JobStatus::Submitted => {}
        }
    }

    Err(GenerationError::Timeout {
        provider,
        job_id: job_id.to_string(),
        attempts: policy.max_attempts,
    })
}
