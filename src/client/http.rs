// HTTP implementation of the generation backend boundary

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use super::GenerationClient;
use crate::errors::ClientError;
use crate::models::{
    GenerationMode, JobState, JobStatus, StorySubmission, VoiceProfile, VoiceSample,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoryRequestDto<'a> {
    mode: GenerationMode,
    script: &'a str,
    voice_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar_image_url: Option<&'a str>,
}

impl<'a> From<&'a StorySubmission> for StoryRequestDto<'a> {
    fn from(submission: &'a StorySubmission) -> Self {
        Self {
            mode: submission.mode,
            script: &submission.script,
            voice_id: &submission.voice_id,
            title: submission.title(),
            avatar_image_url: submission.avatar_image_url(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoryResponseDto {
    job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatusDto {
    #[serde(default)]
    job_id: String,
    status: String,
    #[serde(default)]
    progress: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    download_url: Option<String>,
}

impl JobStatusDto {
    fn into_status(self, requested_id: &str) -> JobStatus {
        let job_id = if self.job_id.is_empty() {
            requested_id.to_string()
        } else {
            self.job_id
        };
        JobStatus::new(
            job_id,
            JobState::parse(&self.status),
            self.progress,
            self.message.unwrap_or_default(),
            self.download_url,
        )
    }
}

/// [`GenerationClient`] backed by the backend's REST API.
#[derive(Debug, Clone)]
pub struct HttpGenerationClient {
    client: Client,
    base_url: Url,
}

impl HttpGenerationClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Validation(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "Base URL '{}' cannot carry a path",
                base_url
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation(format!("Invalid base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Pull a human-readable message out of an error response body.
async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(body) => body["message"]
            .as_str()
            .or_else(|| body["error"].as_str())
            .map(str::to_string)
            .unwrap_or(text),
        Err(_) => text,
    }
}

#[async_trait]
impl GenerationClient for HttpGenerationClient {
    async fn submit_story(&self, submission: &StorySubmission) -> Result<String, ClientError> {
        let url = self.endpoint(&["api", "v1", "stories"])?;
        let response = self
            .client
            .post(url)
            .json(&StoryRequestDto::from(submission))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(ClientError::Validation(error_message(response).await));
        }
        if !status.is_success() {
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let body: StoryResponseDto = response.json().await?;
        if body.job_id.trim().is_empty() {
            return Err(ClientError::Decode(
                "Server accepted the story but returned an empty job id".to_string(),
            ));
        }
        tracing::debug!("Story submitted as job {}", body.job_id);
        Ok(body.job_id)
    }

    async fn fetch_job(&self, job_id: &str) -> Result<JobStatus, ClientError> {
        let url = self.endpoint(&["api", "v1", "jobs", job_id])?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        // The backend answers an unknown id with 400 rather than 404.
        if status == StatusCode::NOT_FOUND || status == StatusCode::BAD_REQUEST {
            let message = error_message(response).await;
            tracing::debug!("Job {} not found: {}", job_id, message);
            return Err(ClientError::NotFound(job_id.to_string()));
        }
        if !status.is_success() {
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let dto: JobStatusDto = response.json().await?;
        Ok(dto.into_status(job_id))
    }

    async fn clone_voice(&self, sample: VoiceSample) -> Result<VoiceProfile, ClientError> {
        let url = self.endpoint(&["api", "v1", "voices"])?;
        let part = reqwest::multipart::Part::bytes(sample.bytes)
            .file_name(sample.file_name)
            .mime_str(&sample.mime_type)
            .map_err(|e| {
                ClientError::Validation(format!("Invalid MIME type '{}': {}", sample.mime_type, e))
            })?;
        let mut form = reqwest::multipart::Form::new().part("file", part);
        if let Some(label) = sample.label.filter(|l| !l.trim().is_empty()) {
            form = form.text("label", label);
        }

        let response = self.client.post(url).multipart(form).send().await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(ClientError::Validation(error_message(response).await));
        }
        if !status.is_success() {
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        Ok(response.json().await?)
    }
}
