//! Replicate predictions backend (single-phase)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ApiEndpoint, GenerationRequest, JobStatus, Provider};
use crate::error::GenerationError;

#[derive(Debug, Serialize)]
struct PredictionBody<'a> {
    version: &'a str,
    input: PredictionInput<'a>,
}

#[derive(Debug, Serialize)]
struct PredictionInput<'a> {
    prompt: String,
    lyrics: &'a str,
}

/// A prediction as returned by both create and get
#[derive(Debug, Deserialize)]
pub(super) struct Prediction {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// Replicate predictions client
///
/// `ApiEndpoint::model` carries the model version hash.
#[derive(Debug, Clone)]
pub struct ReplicateApi {
    http_client: reqwest::Client,
    endpoint: ApiEndpoint,
}

impl ReplicateApi {
    pub fn new(http_client: reqwest::Client, endpoint: ApiEndpoint) -> Self {
        Self {
            http_client,
            endpoint,
        }
    }

    pub(super) async fn submit(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let submission_error = |message: String| GenerationError::Submission {
            provider: Provider::Replicate,
            message,
        };

        let body = PredictionBody {
            version: &self.endpoint.model,
            input: PredictionInput {
                prompt: request.tags(),
                lyrics: &request.lyrics,
            },
        };

        let response = self
            .http_client
            .post(self.endpoint.url("/v1/predictions"))
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

        let prediction: Prediction = response
            .json()
            .await
            .map_err(|e| submission_error(format!("Parse error: {}", e)))?;

        if prediction.id.is_empty() {
            return Err(submission_error("response carried no prediction id".to_string()));
        }
        Ok(prediction.id)
    }

    pub(super) async fn status(&self, job_id: &str) -> Result<JobStatus, GenerationError> {
        let query_error = |message: String| GenerationError::StatusQuery {
            provider: Provider::Replicate,
            message,
        };

        let prediction: Prediction = self
            .http_client
            .get(self.endpoint.url(&format!("/v1/predictions/{}", job_id)))
            .bearer_auth(&self.endpoint.api_key)
            .send()
            .await
            .map_err(|e| query_error(e.to_string()))?
            .error_for_status()
            .map_err(|e| query_error(e.to_string()))?
            .json()
            .await
            .map_err(|e| query_error(format!("Parse error: {}", e)))?;

        Ok(map_status(&prediction))
    }
}

/// Map a prediction to a job status
pub(super) fn map_status(prediction: &Prediction) -> JobStatus {
    match prediction.status.as_str() {
        "succeeded" => match prediction.output.as_ref().and_then(output_url) {
            Some(audio_ref) => JobStatus::Succeeded {
                audio_ref,
                title: None,
                duration_secs: None,
            },
            None => JobStatus::Failed {
                reason: "succeeded without output".to_string(),
            },
        },
        "failed" | "canceled" => JobStatus::Failed {
            reason: match &prediction.error {
                Some(Value::String(message)) if !message.is_empty() => message.clone(),
                Some(Value::Null) | None => prediction.status.clone(),
                Some(other) => other.to_string(),
            },
        },
        // starting, processing
        _ => JobStatus::Submitted,
    }
}

/// Output is a URL string or an array whose first element is one
fn output_url(output: &Value) -> Option<String> {
    let url = match output {
        Value::String(url) => url.as_str(),
        Value::Array(items) => items.first()?.as_str()?,
        _ => return None,
    };
    (!url.is_empty()).then(|| url.to_string())
}
