use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a server-side generation job.
///
/// The backend reports this as a free-form string. It is parsed once at the
/// client boundary; anything outside the known stages is kept verbatim in
/// `Other` and treated as still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobState {
    Received,
    Running,
    Completed,
    Failed,
    Other(String),
}

impl JobState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "RECEIVED" => JobState::Received,
            "RUNNING" => JobState::Running,
            "COMPLETED" => JobState::Completed,
            "FAILED" => JobState::Failed,
            _ => JobState::Other(raw.trim().to_string()),
        }
    }

    /// `Completed` and `Failed` end a tracking session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobState::Received => "RECEIVED",
            JobState::Running => "RUNNING",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
            JobState::Other(raw) => raw,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for JobState {
    fn from(raw: String) -> Self {
        JobState::parse(&raw)
    }
}

impl From<JobState> for String {
    fn from(state: JobState) -> Self {
        state.as_str().to_string()
    }
}

/// Snapshot of a job as last reported by the backend.
///
/// Values are never mutated after construction; every poll yields a fresh
/// `JobStatus` that replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    job_id: String,
    #[serde(rename = "status")]
    state: JobState,
    progress: u8,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    download_url: Option<String>,
}

impl JobStatus {
    /// Progress is clamped to 0..=100. A download URL is only kept for a
    /// completed job.
    pub fn new(
        job_id: impl Into<String>,
        state: JobState,
        progress: i64,
        message: impl Into<String>,
        download_url: Option<String>,
    ) -> Self {
        let download_url = match state {
            JobState::Completed => download_url.filter(|url| !url.is_empty()),
            _ => None,
        };
        Self {
            job_id: job_id.into(),
            state,
            progress: progress.clamp(0, 100) as u8,
            message: message.into(),
            download_url,
        }
    }

    /// Placeholder entry recorded right after a submission is accepted.
    pub fn accepted(job_id: impl Into<String>) -> Self {
        Self::new(job_id, JobState::Received, 0, "Job accepted", None)
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn download_url(&self) -> Option<&str> {
        self.download_url.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
