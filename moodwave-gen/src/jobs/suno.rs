//! Suno API backend (two-phase)
//!
//! A task first exposes a stream URL (`TEXT_SUCCESS` / `FIRST_SUCCESS`) and
//! only later a downloadable `audioUrl` (`SUCCESS`).

use serde::{Deserialize, Serialize};

use super::{ApiEndpoint, GenerationRequest, JobStatus, Provider};
use crate::error::GenerationError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    prompt: &'a str,
    style: String,
    title: String,
    custom_mode: bool,
    instrumental: bool,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    data: Option<SubmitData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitData {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct RecordInfoResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    data: Option<RecordInfo>,
}

/// `data` object of a record-info response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RecordInfo {
    #[serde(default)]
    status: String,
    #[serde(default)]
    response: Option<RecordResponse>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordResponse {
    #[serde(default)]
    suno_data: Vec<SunoTrack>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SunoTrack {
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default)]
    stream_audio_url: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

/// Suno generate / record-info client
#[derive(Debug, Clone)]
pub struct SunoApi {
    http_client: reqwest::Client,
    endpoint: ApiEndpoint,
}

impl SunoApi {
    pub fn new(http_client: reqwest::Client, endpoint: ApiEndpoint) -> Self {
        Self {
            http_client,
            endpoint,
        }
    }

    pub(super) async fn submit(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let submission_error = |message: String| GenerationError::Submission {
            provider: Provider::Suno,
            message,
        };

        let body = SubmitBody {
            prompt: &request.lyrics,
            style: request.tags(),
            title: request.fallback_title(),
            custom_mode: true,
            instrumental: false,
            model: &self.endpoint.model,
        };

        let response = self
            .http_client
            .post(self.endpoint.url("/api/v1/generate"))
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

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| submission_error(format!("Parse error: {}", e)))?;

        match parsed.data {
            Some(data) if parsed.code == 200 && !data.task_id.is_empty() => Ok(data.task_id),
            _ => Err(submission_error(format!(
                "code {}: {}",
                parsed.code,
                parsed.msg.unwrap_or_else(|| "no task id".to_string())
            ))),
        }
    }

    pub(super) async fn status(&self, job_id: &str) -> Result<JobStatus, GenerationError> {
        let query_error = |message: String| GenerationError::StatusQuery {
            provider: Provider::Suno,
            message,
        };

        let response = self
            .http_client
            .get(self.endpoint.url("/api/v1/generate/record-info"))
            .query(&[("taskId", job_id)])
            .bearer_auth(&self.endpoint.api_key)
            .send()
            .await
            .map_err(|e| query_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| query_error(e.to_string()))?;

        let parsed: RecordInfoResponse = response
            .json()
            .await
            .map_err(|e| query_error(format!("Parse error: {}", e)))?;

        match parsed.data {
            Some(info) => Ok(map_status(&info)),
            None => Err(query_error(format!(
                "code {}: {}",
                parsed.code,
                parsed.msg.unwrap_or_else(|| "no data".to_string())
            ))),
        }
    }
}

/// Map a record-info `data` object to a job status
pub(super) fn map_status(info: &RecordInfo) -> JobStatus {
    let track = info
        .response
        .as_ref()
        .and_then(|r| r.suno_data.first());
    let title = track.and_then(|t| t.title.clone()).filter(|t| !t.is_empty());
    let duration_secs = track.and_then(|t| t.duration);
    let non_empty = |url: Option<&String>| url.filter(|u| !u.is_empty()).cloned();

    let status = info.status.as_str();
    match status {
        "PENDING" => JobStatus::Submitted,
        "TEXT_SUCCESS" | "FIRST_SUCCESS" => {
            match non_empty(track.and_then(|t| t.stream_audio_url.as_ref())) {
                Some(stream_ref) => JobStatus::TextReady {
                    stream_ref,
                    title,
                    duration_secs,
                },
                None => JobStatus::Submitted,
            }
        }
        "SUCCESS" => match non_empty(track.and_then(|t| t.audio_url.as_ref())) {
            Some(audio_ref) => JobStatus::Succeeded {
                audio_ref,
                title,
                duration_secs,
            },
            None => JobStatus::Submitted,
        },
        s if s.ends_with("FAILED") || s == "SENSITIVE_WORD_ERROR" => JobStatus::Failed {
            reason: info
                .error_message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| s.to_string()),
        },
        _ => JobStatus::Submitted,
    }
}
