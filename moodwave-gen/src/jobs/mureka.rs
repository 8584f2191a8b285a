//! Mureka song API backend (single-phase)

use serde::{Deserialize, Serialize};

use super::{ApiEndpoint, GenerationRequest, JobStatus, Provider};
use crate::error::GenerationError;

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    lyrics: &'a str,
    prompt: String,
    model: &'a str,
}

/// Song task as returned by generate and query
#[derive(Debug, Deserialize)]
pub(super) struct SongTask {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    failed_reason: Option<String>,
    #[serde(default)]
    choices: Vec<SongChoice>,
}

#[derive(Debug, Deserialize)]
struct SongChoice {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    /// Milliseconds
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MurekaApi {
    http_client: reqwest::Client,
    endpoint: ApiEndpoint,
}

impl MurekaApi {
    pub fn new(http_client: reqwest::Client, endpoint: ApiEndpoint) -> Self {
        Self {
            http_client,
            endpoint,
        }
    }

    pub(super) async fn submit(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let submission_error = |message: String| GenerationError::Submission {
            provider: Provider::Mureka,
            message,
        };

        let body = GenerateBody {
            lyrics: &request.lyrics,
            prompt: request.tags(),
            model: &self.endpoint.model,
        };

        let response = self
            .http_client
            .post(self.endpoint.url("/v1/song/generate"))
            .bearer_auth(&self.endpoint.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| submission_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(submission_error(format!("HTTP {}: {}", status.as_u16(), error_text)));
        }

        let task: SongTask = response
            .json()
            .await
            .map_err(|e| submission_error(format!("Parse error: {}", e)))?;

        if task.id.is_empty() {
            return Err(submission_error("response carried no task id".to_string()));
        }
        Ok(task.id)
    }

    pub(super) async fn status(&self, job_id: &str) -> Result<JobStatus, GenerationError> {
        let query_error = |message: String| GenerationError::StatusQuery {
            provider: Provider::Mureka,
            message,
        };

        let task: SongTask = self
            .http_client
            .get(self.endpoint.url(&format!("/v1/song/query/{}", job_id)))
            .bearer_auth(&self.endpoint.api_key)
            .send()
            .await
            .map_err(|e| query_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| query_error(e.to_string()))?
            .json()
            .await
            .map_err(|e| query_error(format!("Parse error: {}", e)))?;

        Ok(map_status(&task))
    }
}

pub(super) fn map_status(task: &SongTask) -> JobStatus {
    match task.status.as_str() {
        "succeeded" => {
            let choice = task.choices.first();
            match choice.and_then(|c| c.url.clone()).filter(|u| !u.is_empty()) {
                Some(audio_ref) => JobStatus::Succeeded {
                    audio_ref,
                    title: choice.and_then(|c| c.title.clone()),
                    duration_secs: choice.and_then(|c| c.duration).map(|ms| ms / 1000.0),
                },
                None => JobStatus::Failed {
                    reason: "succeeded without choices".to_string(),
                },
            }
        }
        "failed" | "timeouted" | "cancelled" => JobStatus::Failed {
            reason: task
                .failed_reason
                .clone()
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| task.status.clone()),
        },
        // preparing, queued, running, streaming
        _ => JobStatus::Submitted,
    }
}
