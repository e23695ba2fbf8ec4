use thiserror::Error;

/// Failures reported by a [`GenerationClient`](crate::client::GenerationClient).
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("Transport error: {message}")]
    Transport { message: String, transient: bool },

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
}

impl ClientError {
    /// Network-class failures (connect refused, timeouts) that may clear up on
    /// their own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ClientError::Transport {
                transient: true,
                ..
            }
        )
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::Decode(err.to_string());
        }
        ClientError::Transport {
            transient: err.is_connect() || err.is_timeout(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

/// Errors returned to callers of the [`JobTracker`](crate::tracker::JobTracker).
///
/// Poll failures are not in here: they are delivered to observers as a
/// [`TrackerEvent::PollFailed`](crate::tracker::events::TrackerEvent).
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Submission failed: {0}")]
    SubmissionFailed(#[source] ClientError),

    #[error("Job id must not be empty")]
    InvalidJobId,
}
