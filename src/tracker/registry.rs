//! Bounded, most-recent-first collection of job statuses.

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::JobStatus;

pub const DEFAULT_MAX_JOBS: usize = 10;

/// Insert `status` at the front of `current`, dropping any older entry for
/// the same job and truncating to `max` entries.
pub fn upsert_into(current: &[JobStatus], status: JobStatus, max: usize) -> Vec<JobStatus> {
    let mut next: Vec<JobStatus> = current
        .iter()
        .filter(|entry| entry.job_id() != status.job_id())
        .cloned()
        .collect();
    next.insert(0, status);
    next.truncate(max);
    next
}

/// Shared registry of the most recently updated jobs.
///
/// Writers are serialised through the watch channel's lock. Readers get an
/// immutable `Arc` snapshot and never hold the lock beyond cloning it.
pub struct JobRegistry {
    max_jobs: usize,
    tx: watch::Sender<Arc<[JobStatus]>>,
}

impl JobRegistry {
    /// A `max_jobs` of zero is raised to one.
    pub fn new(max_jobs: usize) -> Self {
        let (tx, _rx) = watch::channel(Arc::from(Vec::new()));
        Self {
            max_jobs: max_jobs.max(1),
            tx,
        }
    }

    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }

    pub fn upsert(&self, status: JobStatus) {
        let max = self.max_jobs;
        self.tx.send_modify(|current| {
            *current = Arc::from(upsert_into(current, status, max));
        });
    }

    pub fn snapshot(&self) -> Arc<[JobStatus]> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn get(&self, job_id: &str) -> Option<JobStatus> {
        self.tx
            .borrow()
            .iter()
            .find(|status| status.job_id() == job_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver that is notified after every upsert.
    pub fn subscribe(&self) -> watch::Receiver<Arc<[JobStatus]>> {
        self.tx.subscribe()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_JOBS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobState;
    use std::collections::HashSet;

    fn status(job_id: &str, progress: i64) -> JobStatus {
        JobStatus::new(job_id, JobState::Running, progress, "", None)
    }

    fn ids(entries: &[JobStatus]) -> Vec<&str> {
        entries.iter().map(|s| s.job_id()).collect()
    }

    #[test]
    fn test_upsert_into_inserts_at_front() {
        let list = upsert_into(&[], status("a", 0), 10);
        let list = upsert_into(&list, status("b", 0), 10);
        assert_eq!(ids(&list), vec!["b", "a"]);
    }

    #[test]
    fn test_upsert_into_replaces_and_moves_existing_entry() {
        let list = vec![status("c", 0), status("b", 0), status("a", 10)];
        let list = upsert_into(&list, status("a", 90), 10);
        assert_eq!(ids(&list), vec!["a", "c", "b"]);
        assert_eq!(list[0].progress(), 90);
    }

    #[test]
    fn test_upsert_into_evicts_oldest() {
        let list = vec![status("c", 0), status("b", 0), status("a", 0)];
        let list = upsert_into(&list, status("d", 0), 3);
        assert_eq!(ids(&list), vec!["d", "c", "b"]);
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = JobRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(registry.max_jobs(), DEFAULT_MAX_JOBS);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_registry_never_exceeds_max_and_ids_stay_unique() {
        let registry = JobRegistry::new(10);
        // Interleave new ids with updates to existing ones.
        for i in 0..200 {
            let id = format!("job-{}", (i * 7) % 23);
            registry.upsert(status(&id, i % 100));

            let snapshot = registry.snapshot();
            assert!(snapshot.len() <= 10);
            let unique: HashSet<&str> = snapshot.iter().map(|s| s.job_id()).collect();
            assert_eq!(unique.len(), snapshot.len());
            assert_eq!(snapshot[0].job_id(), id);
        }
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn test_registry_get_returns_latest() {
        let registry = JobRegistry::new(5);
        registry.upsert(status("a", 10));
        registry.upsert(status("a", 55));
        assert_eq!(registry.get("a").map(|s| s.progress()), Some(55));
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_upserts() {
        let registry = JobRegistry::new(5);
        registry.upsert(status("a", 0));
        let before = registry.snapshot();
        registry.upsert(status("b", 0));
        assert_eq!(ids(&before), vec!["a"]);
        assert_eq!(ids(&registry.snapshot()), vec!["b", "a"]);
    }

    #[test]
    fn test_zero_max_is_raised_to_one() {
        let registry = JobRegistry::new(0);
        registry.upsert(status("a", 0));
        registry.upsert(status("b", 0));
        assert_eq!(ids(&registry.snapshot()), vec!["b"]);
    }

    #[tokio::test]
    async fn test_subscribe_notified_on_upsert() {
        let registry = JobRegistry::new(5);
        let mut rx = registry.subscribe();
        registry.upsert(status("a", 0));
        rx.changed().await.expect("changed");
        assert_eq!(ids(&rx.borrow_and_update()), vec!["a"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_lose_no_jobs() {
        let registry = Arc::new(JobRegistry::new(100));
        let mut handles = Vec::new();
        for worker in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                for i in 0..10 {
                    registry.upsert(status(&format!("w{}-{}", worker, i), i));
                    tokio::task::yield_now().await;
                }
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }
        assert_eq!(registry.len(), 80);
    }
}
