//! Client-side tracking of server-side generation jobs.
//!
//! - `JobTracker` runs one polling session per job id
//! - `JobRegistry` keeps the most recently updated jobs
//! - `TrackerEvent` is what sessions publish to observers

pub mod events;
pub mod registry;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, oneshot};

use crate::client::GenerationClient;
use crate::errors::{ClientError, TrackError};
use crate::models::{ClientConfig, JobStatus, PollFailurePolicy, StorySubmission};

pub use events::{TrackerEvent, POLL_FAILED_MESSAGE};
pub use registry::JobRegistry;

/// Handle to an active polling session.
struct Session {
    id: u64,
    cancel_tx: oneshot::Sender<()>,
}

/// State shared between the tracker and its session tasks.
struct Inner {
    client: Arc<dyn GenerationClient>,
    registry: Arc<JobRegistry>,
    event_tx: broadcast::Sender<TrackerEvent>,
    poll_interval: Duration,
    failure_policy: PollFailurePolicy,
    sessions: Mutex<HashMap<String, Session>>,
    next_session_id: AtomicU64,
}

impl Inner {
    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish `event` if session `session_id` still owns `job_id`.
    ///
    /// Runs under the sessions lock so a cancelled session can never publish
    /// after `cancel` returns. Returns false when the session is gone.
    fn publish(&self, job_id: &str, session_id: u64, event: TrackerEvent) -> bool {
        let mut sessions = self.sessions();
        if !sessions.get(job_id).is_some_and(|s| s.id == session_id) {
            return false;
        }
        if event.ends_session() {
            sessions.remove(job_id);
        }
        if let TrackerEvent::Status { status, .. } = &event {
            self.registry.upsert(status.clone());
        }
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
        true
    }

    fn should_retry(&self, err: &ClientError, consecutive_failures: u32) -> bool {
        match self.failure_policy {
            PollFailurePolicy::StopOnFailure => false,
            PollFailurePolicy::RetryTransient { max_retries } => {
                err.is_transient() && consecutive_failures < max_retries
            }
        }
    }
}

/// Drives status polling for submitted jobs.
///
/// Each tracked job gets its own tokio task that polls, publishes and sleeps
/// until the job reaches a terminal state, a poll fails, or the session is
/// cancelled. Dropping the tracker cancels every session.
pub struct JobTracker {
    inner: Arc<Inner>,
}

impl JobTracker {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        registry: Arc<JobRegistry>,
        event_tx: broadcast::Sender<TrackerEvent>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                registry,
                event_tx,
                poll_interval: config.poll_interval(),
                failure_policy: config.poll_failure_policy,
                sessions: Mutex::new(HashMap::new()),
                next_session_id: AtomicU64::new(1),
            }),
        }
    }

    /// Build a tracker with its own registry and event channel sized from
    /// `config`.
    pub fn from_config(client: Arc<dyn GenerationClient>, config: &ClientConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.broadcast_capacity.max(1));
        let registry = Arc::new(JobRegistry::new(config.max_jobs));
        Self::new(client, registry, event_tx, config)
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.inner.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn is_tracking(&self, job_id: &str) -> bool {
        self.inner.sessions().contains_key(job_id)
    }

    pub fn active_sessions(&self) -> usize {
        self.inner.sessions().len()
    }

    /// Submit a story and start tracking the job the backend creates for it.
    ///
    /// Nothing is tracked when submission fails. On success the registry is
    /// seeded with an "accepted" entry until the first poll replaces it.
    pub async fn submit(&self, submission: &StorySubmission) -> Result<String, TrackError> {
        submission
            .validate()
            .map_err(|msg| TrackError::SubmissionFailed(ClientError::Validation(msg)))?;

        let job_id = self
            .inner
            .client
            .submit_story(submission)
            .await
            .map_err(|e| {
                tracing::warn!("Story submission failed: {}", e);
                TrackError::SubmissionFailed(e)
            })?;

        tracing::info!("Story accepted as job {}", job_id);
        self.inner.registry.upsert(JobStatus::accepted(&job_id));
        self.start_tracking(&job_id)?;
        Ok(job_id)
    }

    /// Start polling `job_id`. Returns `Ok(false)` if a session for it is
    /// already active.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_tracking(&self, job_id: &str) -> Result<bool, TrackError> {
        if job_id.trim().is_empty() {
            return Err(TrackError::InvalidJobId);
        }

        let mut sessions = self.inner.sessions();
        if sessions.contains_key(job_id) {
            tracing::debug!("Job {} is already being tracked", job_id);
            return Ok(false);
        }

        let session_id = self.inner.next_session_id.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        sessions.insert(
            job_id.to_string(),
            Session {
                id: session_id,
                cancel_tx,
            },
        );

        tracing::info!("Tracking job {}", job_id);
        tokio::spawn(run_session(
            Arc::clone(&self.inner),
            job_id.to_string(),
            session_id,
            cancel_rx,
        ));
        Ok(true)
    }

    /// Cancel the session for `job_id`. Returns false if none was active.
    pub fn cancel(&self, job_id: &str) -> bool {
        match self.inner.sessions().remove(job_id) {
            Some(session) => {
                tracing::debug!("Cancelling tracking of job {}", job_id);
                let _ = session.cancel_tx.send(());
                true
            }
            None => false,
        }
    }

    /// Cancel every active session.
    pub fn shutdown(&self) {
        let drained: Vec<(String, Session)> = self.inner.sessions().drain().collect();
        if !drained.is_empty() {
            tracing::info!("Cancelling {} tracking session(s)", drained.len());
        }
        for (_, session) in drained {
            let _ = session.cancel_tx.send(());
        }
    }
}

impl Drop for JobTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Poll loop for one job.
///
/// Polls and publishes are strictly sequential. The fetch and the wait
/// between polls both race against cancellation, so a cancelled session
/// drops any in-flight request and never polls again.
async fn run_session(
    inner: Arc<Inner>,
    job_id: String,
    session_id: u64,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let mut consecutive_failures: u32 = 0;

    loop {
        let result = tokio::select! {
            biased;
            _ = &mut cancel_rx => {
                tracing::debug!("Tracking of job {} cancelled", job_id);
                return;
            }
            result = inner.client.fetch_job(&job_id) => result,
        };

        match result {
            Ok(status) => {
                consecutive_failures = 0;
                let terminal = status.is_terminal();
                tracing::debug!(
                    "Job {} is {} ({}%)",
                    job_id,
                    status.state(),
                    status.progress()
                );
                let event = TrackerEvent::Status {
                    status,
                    timestamp: Utc::now(),
                };
                if !inner.publish(&job_id, session_id, event) {
                    return;
                }
                if terminal {
                    tracing::info!("Job {} reached a terminal state", job_id);
                    return;
                }
            }
            Err(err) if inner.should_retry(&err, consecutive_failures) => {
                consecutive_failures += 1;
                tracing::warn!(
                    "Transient failure polling job {} (attempt {}): {}",
                    job_id,
                    consecutive_failures,
                    err
                );
            }
            Err(err) => {
                tracing::error!("Polling job {} failed: {}", job_id, err);
                let event = TrackerEvent::PollFailed {
                    job_id: job_id.clone(),
                    error: POLL_FAILED_MESSAGE.to_string(),
                    detail: err.to_string(),
                    timestamp: Utc::now(),
                };
                inner.publish(&job_id, session_id, event);
                return;
            }
        }

        tokio::select! {
            biased;
            _ = &mut cancel_rx => {
                tracing::debug!("Tracking of job {} cancelled", job_id);
                return;
            }
            _ = tokio::time::sleep(inner.poll_interval) => {}
        }
    }
}
