// CLI job commands: submit, watch, status

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;

use super::{build_client, describe_error};
use crate::client::GenerationClient;
use crate::errors::TrackError;
use crate::models::{ClientConfig, JobState, JobStatus, StorySubmission};
use crate::tracker::{JobTracker, TrackerEvent};

/// Render one status line, e.g. `[abc123] RUNNING    40%  rendering`.
pub fn format_status_line(status: &JobStatus) -> String {
    let mut line = format!(
        "[{}] {:<10} {:>3}%",
        status.job_id(),
        status.state().as_str(),
        status.progress()
    );
    if !status.message().is_empty() {
        line.push_str("  ");
        line.push_str(status.message());
    }
    if let Some(url) = status.download_url() {
        line.push_str("\n  Download: ");
        line.push_str(url);
    }
    line
}

fn print_event(event: &TrackerEvent, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    match event {
        TrackerEvent::Status { status, .. } => println!("{}", format_status_line(status)),
        TrackerEvent::PollFailed {
            job_id,
            error,
            detail,
            ..
        } => eprintln!("[{}] {}: {}", job_id, error, detail),
    }
    Ok(())
}

/// Print events until every job in `pending` has ended its session.
///
/// Returns the ids of jobs that ended in FAILED or a failed poll. Ctrl-C
/// cancels all sessions and returns early.
pub async fn follow_events(
    tracker: &JobTracker,
    mut rx: broadcast::Receiver<TrackerEvent>,
    mut pending: HashSet<String>,
    json: bool,
) -> anyhow::Result<Vec<String>> {
    let mut unsuccessful = Vec::new();

    while !pending.is_empty() {
        let event = tokio::select! {
            received = rx.recv() => received,
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Interrupted, stopping.");
                tracker.shutdown();
                break;
            }
        };

        let event = match event {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Event stream lagged, {} update(s) skipped", n);
                settle_finished(tracker, &mut pending, &mut unsuccessful, json)?;
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if !pending.contains(event.job_id()) {
            continue;
        }
        print_event(&event, json)?;

        if event.ends_session() {
            let job_id = event.job_id().to_string();
            let succeeded = matches!(
                &event,
                TrackerEvent::Status { status, .. } if status.state() == &JobState::Completed
            );
            if !succeeded {
                unsuccessful.push(job_id.clone());
            }
            pending.remove(&job_id);
        }
    }

    Ok(unsuccessful)
}

/// Resolve pending jobs whose session ended while events were being skipped.
///
/// Their final event may have been dropped, so the outcome comes from the
/// registry: only a COMPLETED entry counts as success.
fn settle_finished(
    tracker: &JobTracker,
    pending: &mut HashSet<String>,
    unsuccessful: &mut Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let finished: Vec<String> = pending
        .iter()
        .filter(|job_id| !tracker.is_tracking(job_id))
        .cloned()
        .collect();

    for job_id in finished {
        pending.remove(&job_id);
        let latest = tracker.registry().get(&job_id);
        match &latest {
            Some(status) if json => println!("{}", serde_json::to_string(status)?),
            Some(status) => println!("{}", format_status_line(status)),
            None => eprintln!("[{}] finished without a recorded status", job_id),
        }
        let succeeded = latest.is_some_and(|status| status.state() == &JobState::Completed);
        if !succeeded {
            unsuccessful.push(job_id);
        }
    }
    Ok(())
}

fn finish(unsuccessful: Vec<String>) -> anyhow::Result<()> {
    if unsuccessful.is_empty() {
        Ok(())
    } else {
        anyhow::bail!(
            "{} job(s) did not complete: {}",
            unsuccessful.len(),
            unsuccessful.join(", ")
        )
    }
}

/// vpc submit
pub async fn cmd_submit(
    config: &ClientConfig,
    submission: StorySubmission,
    no_follow: bool,
    json: bool,
) -> anyhow::Result<()> {
    let client = build_client(config)?;

    if no_follow {
        submission
            .validate()
            .map_err(|msg| anyhow::anyhow!("Submission failed: {}", msg))?;
        let job_id = client
            .submit_story(&submission)
            .await
            .map_err(|e| describe_error(&e, &config.base_url))?;
        if json {
            println!("{}", serde_json::json!({ "jobId": job_id }));
        } else {
            println!("Story submitted. Job ID: {}", job_id);
        }
        return Ok(());
    }

    let tracker = JobTracker::from_config(client, config);
    // Subscribe before submitting so the first poll cannot be missed.
    let rx = tracker.subscribe();

    let job_id = match tracker.submit(&submission).await {
        Ok(job_id) => job_id,
        Err(TrackError::SubmissionFailed(e)) => {
            return Err(describe_error(&e, &config.base_url).context("Submission failed"))
        }
        Err(e) => return Err(e.into()),
    };
    if !json {
        println!("Story submitted. Job ID: {}", job_id);
    }

    let pending = HashSet::from([job_id]);
    let unsuccessful = follow_events(&tracker, rx, pending, json).await?;
    finish(unsuccessful)
}

/// vpc watch
pub async fn cmd_watch(config: &ClientConfig, job_ids: &[String], json: bool) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let tracker = JobTracker::from_config(client, config);
    let rx = tracker.subscribe();

    let mut pending = HashSet::new();
    for job_id in job_ids {
        if tracker.start_tracking(job_id)? {
            pending.insert(job_id.clone());
        }
    }

    let unsuccessful = follow_events(&tracker, rx, pending, json).await?;
    finish(unsuccessful)
}

/// vpc status
pub async fn cmd_status(config: &ClientConfig, job_id: &str, json: bool) -> anyhow::Result<()> {
    let client: Arc<dyn GenerationClient> = build_client(config)?;
    let status = client
        .fetch_job(job_id)
        .await
        .map_err(|e| describe_error(&e, &config.base_url))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("{}", format_status_line(&status));
    }
    Ok(())
}
