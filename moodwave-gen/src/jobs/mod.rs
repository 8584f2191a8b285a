//! Song generation job clients
//!
//! One [`JobClient`] per configured provider hides the provider's
//! submission and polling protocol behind [`SongGenerator::generate`].
//!
//! Two protocol shapes exist:
//! - single-phase: poll until the final artifact exists, persist it, return it
//! - two-phase: return as soon as a streamable reference exists, keep polling
//!   in the background and publish the persisted final artifact on the
//!   [`NotificationChannel`]
//!
//! Mock mode synthesizes results offline and exercises the same late
//! notification path as the two-phase protocol.

mod mock;
mod mureka;
mod poll;
mod replicate;
mod suno;

pub use mock::{MockJobs, MockTiming};
pub use mureka::MurekaApi;
pub use poll::{PollOutcome, PollPolicy};
pub use replicate::ReplicateApi;
pub use suno::SunoApi;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::artifacts::ArtifactStore;
use crate::error::{Error, GenerationError};
use crate::notification::NotificationChannel;

const USER_AGENT: &str = concat!("Moodwave/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT_SECS: u64 = 30;

/// Assumed length when a backend does not report one
pub const DEFAULT_DURATION_SECS: f64 = 180.0;

/// Song generation backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Suno,
    Replicate,
    Mureka,
}

/// Shape of a provider's job protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolShape {
    SinglePhase,
    TwoPhase,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Suno, Provider::Replicate, Provider::Mureka];

    pub fn shape(self) -> ProtocolShape {
        match self {
            Provider::Suno => ProtocolShape::TwoPhase,
            Provider::Replicate | Provider::Mureka => ProtocolShape::SinglePhase,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Suno => "suno",
            Provider::Replicate => "replicate",
            Provider::Mureka => "mureka",
        }
    }

    /// Environment variable holding this provider's API key
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::Suno => "SUNO_API_KEY",
            Provider::Replicate => "REPLICATE_API_KEY",
            Provider::Mureka => "MUREKA_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suno" => Ok(Provider::Suno),
            "replicate" => Ok(Provider::Replicate),
            "mureka" => Ok(Provider::Mureka),
            other => Err(Error::Config(format!(
                "Unknown provider '{}' (expected suno, replicate or mureka)",
                other
            ))),
        }
    }
}

/// Input of one generation job
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub lyrics: String,
    /// Musical style, typically the listener's favorite genre
    pub style_hint: String,
    pub mood_hint: String,
    pub queue_index: usize,
}

impl GenerationRequest {
    /// Title used when the backend does not supply one
    fn fallback_title(&self) -> String {
        format!("{} #{}", self.mood_hint, self.queue_index + 1)
    }

    /// Combined style/mood tag line sent to backends
    fn tags(&self) -> String {
        match (self.style_hint.trim(), self.mood_hint.trim()) {
            ("", mood) => mood.to_string(),
            (style, "") => style.to_string(),
            (style, mood) => format!("{}, {}", style, mood),
        }
    }
}

/// One playable song in the queue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongQueueEntry {
    pub queue_index: usize,
    /// Remote stream URL or local file path
    pub audio_ref: String,
    pub title: String,
    pub approx_duration_secs: f64,
    pub provider: Provider,
    /// Backend job id, used to match late final artifacts
    pub job_id: Option<String>,
}

/// Provider-neutral job status
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Submitted,
    /// Two-phase only: a streamable preview exists
    TextReady {
        stream_ref: String,
        title: Option<String>,
        duration_secs: Option<f64>,
    },
    Succeeded {
        audio_ref: String,
        title: Option<String>,
        duration_secs: Option<f64>,
    },
    Failed {
        reason: String,
    },
}

/// Generates one song for a queue slot
#[async_trait]
pub trait SongGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate(&self, request: GenerationRequest) -> Result<SongQueueEntry, GenerationError>;
}

/// Remote backend of a live job client
#[derive(Debug, Clone)]
pub enum Backend {
    Suno(SunoApi),
    Replicate(ReplicateApi),
    Mureka(MurekaApi),
}

impl Backend {
    pub fn provider(&self) -> Provider {
        match self {
            Backend::Suno(_) => Provider::Suno,
            Backend::Replicate(_) => Provider::Replicate,
            Backend::Mureka(_) => Provider::Mureka,
        }
    }

    /// Submit a job and return its backend id
    pub async fn submit(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match self {
            Backend::Suno(api) => api.submit(request).await,
            Backend::Replicate(api) => api.submit(request).await,
            Backend::Mureka(api) => api.submit(request).await,
        }
    }

    /// Query and map one job's status
    pub async fn status(&self, job_id: &str) -> Result<JobStatus, GenerationError> {
        match self {
            Backend::Suno(api) => api.status(job_id).await,
            Backend::Replicate(api) => api.status(job_id).await,
            Backend::Mureka(api) => api.status(job_id).await,
        }
    }
}

/// Connection settings shared by the provider APIs
#[derive(Debug, Clone)]
pub struct ApiEndpoint {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl ApiEndpoint {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Shared HTTP client for backends, lyrics and downloads
pub fn build_http_client() -> Result<reqwest::Client, Error> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?;
    Ok(client)
}

enum Mode {
    Live {
        backend: Backend,
        policy: PollPolicy,
        store: Arc<dyn ArtifactStore>,
    },
    Mock(MockJobs),
}

/// Job client for one provider, live or mock
pub struct JobClient {
    provider: Provider,
    mode: Mode,
    notifications: NotificationChannel,
}

impl JobClient {
    pub fn live(
        backend: Backend,
        policy: PollPolicy,
        store: Arc<dyn ArtifactStore>,
        notifications: NotificationChannel,
    ) -> Self {
        Self {
            provider: backend.provider(),
            mode: Mode::Live {
                backend,
                policy,
                store,
            },
            notifications,
        }
    }

    pub fn mock(provider: Provider, timing: MockTiming, notifications: NotificationChannel) -> Self {
        Self {
            provider,
            mode: Mode::Mock(MockJobs::new(provider, timing)),
            notifications,
        }
    }

    async fn generate_live(
        &self,
        backend: &Backend,
        policy: PollPolicy,
        store: &Arc<dyn ArtifactStore>,
        request: GenerationRequest,
    ) -> Result<SongQueueEntry, GenerationError> {
        let provider = self.provider;
        let job_id = backend.submit(&request).await?;
        info!(
            provider = %provider,
            job_id = %job_id,
            queue_index = request.queue_index,
            "Generation job submitted"
        );

        let accept_stream = provider.shape() == ProtocolShape::TwoPhase;
        let outcome = poll::poll_job(backend, &job_id, policy, accept_stream).await?;

        match outcome {
            PollOutcome::Streamable {
                stream_ref,
                title,
                duration_secs,
            } => {
                info!(job_id = %job_id, "Stream ready, finalizing in background");
                spawn_finalize(
                    backend.clone(),
                    job_id.clone(),
                    policy,
                    store.clone(),
                    self.notifications.clone(),
                );

                Ok(SongQueueEntry {
                    queue_index: request.queue_index,
                    audio_ref: stream_ref,
                    title: title.unwrap_or_else(|| request.fallback_title()),
                    approx_duration_secs: duration_secs.unwrap_or(DEFAULT_DURATION_SECS),
                    provider,
                    job_id: Some(job_id),
                })
            }
            PollOutcome::Final {
                audio_ref,
                title,
                duration_secs,
            } => {
                let local_ref = store.persist(&audio_ref, &artifact_name(provider, &job_id)).await?;

                Ok(SongQueueEntry {
                    queue_index: request.queue_index,
                    audio_ref: local_ref,
                    title: title.unwrap_or_else(|| request.fallback_title()),
                    approx_duration_secs: duration_secs.unwrap_or(DEFAULT_DURATION_SECS),
                    provider,
                    job_id: Some(job_id),
                })
            }
        }
    }
}

#[async_trait]
impl SongGenerator for JobClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn generate(&self, request: GenerationRequest) -> Result<SongQueueEntry, GenerationError> {
        match &self.mode {
            Mode::Live {
                backend,
                policy,
                store,
            } => self.generate_live(backend, *policy, store, request).await,
            Mode::Mock(mock) => Ok(mock.generate(&request, &self.notifications).await),
        }
    }
}

/// Local file name for a job's final artifact
pub fn artifact_name(provider: Provider, job_id: &str) -> String {
    format!("{}_{}.mp3", provider, job_id)
}

/// Poll a two-phase job to its final artifact, detached from the caller
///
/// Failures are logged only; the provisional entry stays authoritative.
fn spawn_finalize(
    backend: Backend,
    job_id: String,
    policy: PollPolicy,
    store: Arc<dyn ArtifactStore>,
    notifications: NotificationChannel,
) {
    tokio::spawn(async move {
        match finalize(&backend, &job_id, policy, store.as_ref()).await {
            Ok(local_ref) => {
                info!(job_id = %job_id, local_ref = %local_ref, "Final artifact ready");
                notifications.publish(job_id, local_ref);
            }
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Background finalize failed, keeping stream reference");
            }
        }
    });
}

async fn finalize(
    backend: &Backend,
    job_id: &str,
    policy: PollPolicy,
    store: &dyn ArtifactStore,
) -> Result<String, GenerationError> {
    let provider = backend.provider();
    match poll::poll_job(backend, job_id, policy, false).await? {
        PollOutcome::Final { audio_ref, .. } => {
            let local_ref = store.persist(&audio_ref, &artifact_name(provider, job_id)).await?;
            Ok(local_ref)
        }
        PollOutcome::Streamable { .. } => Err(GenerationError::ProviderReported {
            provider,
            job_id: job_id.to_string(),
            reason: "no final artifact".to_string(),
        }),
    }
}
