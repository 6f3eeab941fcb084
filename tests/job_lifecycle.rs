//! Tests del ciclo de vida de jobs usando la API de la librería
//! tests/job_lifecycle.rs
//!
//! El fetcher es un closure y el store es un envoltorio que verifica las
//! invariantes del modelo en cada escritura.

use batch_downloader::error::JobError;
use batch_downloader::jobs::{
    InMemoryJobStore, ItemStatus, Job, JobManager, JobStatus, JobStore, MediaMode, Outcome, WorkerLimits,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Store que delega en `InMemoryJobStore` y registra violaciones de
/// invariantes detectadas después de cada `update`.
struct RecordingStore {
    inner: InMemoryJobStore,
    violations: Mutex<Vec<String>>,
    max_running: AtomicUsize,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryJobStore::new(),
            violations: Mutex::new(Vec::new()),
            max_running: AtomicUsize::new(0),
        }
    }

    fn violations(&self) -> Vec<String> {
        self.violations.lock().unwrap().clone()
    }

    fn check(&self, before: &Job, after: &Job) {
        let mut violations = self.violations.lock().unwrap();

        if after.workers != before.workers || after.id != before.id {
            violations.push(format!("immutable field changed on {}", after.id));
        }
        if !before.items.is_empty() && after.items.len() != before.items.len() {
            violations.push("item count changed after population".to_string());
        }
        for (old, new) in before.items.iter().zip(&after.items) {
            if old.status != new.status && !old.status.can_advance_to(new.status) {
                violations.push(format!("item regressed {:?} -> {:?}", old.status, new.status));
            }
            if new.status != ItemStatus::Error && !new.message.is_empty() {
                violations.push("message set on non-error item".to_string());
            }
        }
        if before.status.is_terminal() && after.status != before.status {
            violations.push("terminal job status changed".to_string());
        }
        if after.status.is_terminal() && after.items.iter().any(|i| !i.status.is_terminal()) {
            violations.push("job terminal with unfinished items".to_string());
        }
        if after.status == JobStatus::Done && after.items.iter().any(|i| i.status != ItemStatus::Done) {
            violations.push("job done with failed items".to_string());
        }

        let running = after.count(ItemStatus::Running);
        if running > after.workers {
            violations.push(format!("{} items running with {} workers", running, after.workers));
        }
        self.max_running.fetch_max(running, Ordering::SeqCst);
    }
}

impl JobStore for RecordingStore {
    fn insert(&self, job: Job) -> bool {
        self.inner.insert(job)
    }

    fn get(&self, job_id: &str) -> Option<Job> {
        self.inner.get(job_id)
    }

    fn update(&self, job_id: &str, f: &mut dyn FnMut(&mut Job)) -> bool {
        let mut before = None;
        let mut after = None;
        let applied = self.inner.update(job_id, &mut |job| {
            before = Some(job.clone());
            f(job);
            after = Some(job.clone());
        });
        if let (Some(before), Some(after)) = (before, after) {
            self.check(&before, &after);
        }
        applied
    }

    fn remove(&self, job_id: &str) -> Option<Job> {
        self.inner.remove(job_id)
    }

    fn count(&self) -> usize {
        self.inner.count()
    }
}

fn manager_with<F>(store: Arc<RecordingStore>, limits: WorkerLimits, fetch: F) -> JobManager
where
    F: Fn(&str, MediaMode, &str) -> Outcome + Send + Sync + 'static,
{
    JobManager::new(store, Arc::new(fetch), limits)
}

/// Espera a que el job sea terminal verificando que el progreso nunca
/// retrocede entre snapshots.
fn poll_until_terminal(manager: &JobManager, job_id: &str) -> Job {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut last_completed = 0;
    loop {
        let job = manager.get_job(job_id).expect("job should exist");
        assert!(job.completed() >= last_completed, "completed count went backwards");
        last_completed = job.completed();

        if job.status.is_terminal() {
            return job;
        }
        assert!(Instant::now() < deadline, "job {} did not finish", job_id);
        thread::sleep(Duration::from_millis(5));
    }
}

// ==================== Scenarios ====================

#[test]
fn test_mixed_outcomes_end_in_error() {
    let store = Arc::new(RecordingStore::new());
    let manager = manager_with(Arc::clone(&store), WorkerLimits::default(), |target, _, _| {
        thread::sleep(Duration::from_millis(10));
        if target.ends_with("/missing") {
            Outcome::Error("HTTP Error 404: Not Found".to_string())
        } else {
            Outcome::Done
        }
    });

    let job_id = manager
        .create_job(
            vec![
                "https://example.com/a".to_string(),
                "https://example.com/missing".to_string(),
                "https://example.com/b".to_string(),
            ],
            MediaMode::Video,
            "best",
            Some(2),
        )
        .unwrap();

    let job = poll_until_terminal(&manager, &job_id);
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.workers, 2);
    assert_eq!(job.items.len(), 3);

    assert_eq!(job.items[0].status, ItemStatus::Done);
    assert_eq!(job.items[0].message, "");
    assert_eq!(job.items[1].status, ItemStatus::Error);
    assert!(!job.items[1].message.is_empty());
    assert_eq!(job.items[2].status, ItemStatus::Done);
    assert_eq!(job.items[2].message, "");

    assert!(store.violations().is_empty(), "{:?}", store.violations());
}

#[test]
fn test_workers_above_max_are_clamped() {
    let store = Arc::new(RecordingStore::new());
    let manager = manager_with(Arc::clone(&store), WorkerLimits::new(2, 4), |_, _, _| Outcome::Done);

    let job_id = manager
        .create_job(vec!["https://example.com/only".to_string()], MediaMode::Audio, "mp3", Some(5))
        .unwrap();

    let job = poll_until_terminal(&manager, &job_id);
    assert_eq!(job.workers, 4);
    assert_eq!(job.status, JobStatus::Done);
    assert!(store.violations().is_empty(), "{:?}", store.violations());
}

#[test]
fn test_unknown_job_is_not_found() {
    let store = Arc::new(RecordingStore::new());
    let manager = manager_with(store, WorkerLimits::default(), |_, _, _| Outcome::Done);

    let result = manager.get_job("00000000-0000-4000-8000-000000000000");
    assert!(matches!(result, Err(JobError::NotFound(_))));
}

#[test]
fn test_empty_targets_rejected_before_registration() {
    let store = Arc::new(RecordingStore::new());
    let manager = manager_with(Arc::clone(&store), WorkerLimits::default(), |_, _, _| Outcome::Done);

    assert_eq!(
        manager.create_job(Vec::new(), MediaMode::Video, "best", None),
        Err(JobError::EmptyTargets)
    );
    assert_eq!(store.count(), 0);
}

// ==================== Properties ====================

#[test]
fn test_concurrency_never_exceeds_workers() {
    let store = Arc::new(RecordingStore::new());
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let (in_flight_w, peak_w) = (Arc::clone(&in_flight), Arc::clone(&peak));
    let manager = manager_with(Arc::clone(&store), WorkerLimits::default(), move |_, _, _| {
        let now = in_flight_w.fetch_add(1, Ordering::SeqCst) + 1;
        peak_w.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(15));
        in_flight_w.fetch_sub(1, Ordering::SeqCst);
        Outcome::Done
    });

    let targets: Vec<String> = (0..12).map(|i| format!("https://example.com/{}", i)).collect();
    let job_id = manager.create_job(targets, MediaMode::Video, "720p", Some(3)).unwrap();

    let job = poll_until_terminal(&manager, &job_id);
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.count(ItemStatus::Done), 12);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(store.max_running.load(Ordering::SeqCst) <= 3);
    assert!(store.violations().is_empty(), "{:?}", store.violations());
}

#[test]
fn test_items_keep_submission_order() {
    let store = Arc::new(RecordingStore::new());
    // Los primeros targets tardan más: terminan después que los últimos
    let manager = manager_with(Arc::clone(&store), WorkerLimits::default(), |target, _, _| {
        let n: u64 = target.rsplit('/').next().and_then(|s| s.parse().ok()).unwrap_or(0);
        thread::sleep(Duration::from_millis(40 - n * 5));
        Outcome::Done
    });

    let targets: Vec<String> = (0..6).map(|i| format!("https://example.com/{}", i)).collect();
    let job_id = manager.create_job(targets.clone(), MediaMode::Video, "best", Some(6)).unwrap();

    let job = poll_until_terminal(&manager, &job_id);
    let got: Vec<String> = job.items.iter().map(|i| i.target.clone()).collect();
    assert_eq!(got, targets);
}

#[test]
fn test_snapshot_reads_are_stable_after_completion() {
    let store = Arc::new(RecordingStore::new());
    let manager = manager_with(Arc::clone(&store), WorkerLimits::default(), |_, _, _| Outcome::Done);

    let job_id = manager
        .create_job(vec!["a".to_string(), "b".to_string()], MediaMode::Video, "best", None)
        .unwrap();
    poll_until_terminal(&manager, &job_id);

    let first = manager.get_job(&job_id).unwrap();
    let second = manager.get_job(&job_id).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_snapshot_is_detached_copy() {
    let store = Arc::new(RecordingStore::new());
    let manager = manager_with(Arc::clone(&store), WorkerLimits::default(), |_, _, _| Outcome::Done);

    let job_id = manager.create_job(vec!["a".to_string()], MediaMode::Video, "best", None).unwrap();
    let mut snapshot = poll_until_terminal(&manager, &job_id);
    snapshot.items.clear();
    snapshot.status = JobStatus::Pending;

    let fresh = manager.get_job(&job_id).unwrap();
    assert_eq!(fresh.status, JobStatus::Done);
    assert_eq!(fresh.items.len(), 1);
}

#[test]
fn test_jobs_run_independently() {
    let store = Arc::new(RecordingStore::new());
    let manager = manager_with(Arc::clone(&store), WorkerLimits::default(), |target, _, _| {
        if target == "slow" {
            thread::sleep(Duration::from_millis(300));
        }
        Outcome::Done
    });

    let slow = manager.create_job(vec!["slow".to_string()], MediaMode::Video, "best", Some(1)).unwrap();
    let fast = manager.create_job(vec!["fast".to_string()], MediaMode::Video, "best", Some(1)).unwrap();

    assert_ne!(slow, fast);
    let fast_job = poll_until_terminal(&manager, &fast);
    assert_eq!(fast_job.status, JobStatus::Done);
    assert!(!manager.get_job(&slow).unwrap().status.is_terminal());

    poll_until_terminal(&manager, &slow);
    assert!(store.violations().is_empty(), "{:?}", store.violations());
}

#[test]
fn test_fresh_job_is_visible_immediately() {
    let store = Arc::new(RecordingStore::new());
    let manager = manager_with(Arc::clone(&store), WorkerLimits::default(), |_, _, _| {
        thread::sleep(Duration::from_millis(50));
        Outcome::Done
    });

    let job_id = manager.create_job(vec!["a".to_string()], MediaMode::Video, "best", None).unwrap();
    let job = manager.get_job(&job_id).unwrap();

    assert!(!job.status.is_terminal());
    assert!(job.items.is_empty() || job.items.len() == 1);
    poll_until_terminal(&manager, &job_id);
}
