use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::JobStatus;

/// Generic message delivered to observers when a status poll fails.
pub const POLL_FAILED_MESSAGE: &str = "Status query failed";

/// Update published by a tracking session.
///
/// A session publishes zero or more `Status` events and ends either on a
/// terminal `Status`, a single `PollFailed`, or silently on cancellation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum TrackerEvent {
    Status {
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },
    PollFailed {
        job_id: String,
        error: String,
        detail: String,
        timestamp: DateTime<Utc>,
    },
}

impl TrackerEvent {
    pub fn job_id(&self) -> &str {
        match self {
            TrackerEvent::Status { status, .. } => status.job_id(),
            TrackerEvent::PollFailed { job_id, .. } => job_id,
        }
    }

    /// True when no further events will follow for this job's session.
    pub fn ends_session(&self) -> bool {
        match self {
            TrackerEvent::Status { status, .. } => status.is_terminal(),
            TrackerEvent::PollFailed { .. } => true,
        }
    }
}
