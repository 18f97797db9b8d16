//! Job Registry (C1) and its jobs event stream (C2), composed together since
//! every registry mutation immediately drives a broadcast (§4.1, §4.2).

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use digest_store::FailureTracker;

use crate::hub::Hub;
use crate::job::{Job, Status};

#[derive(Debug, Clone)]
pub enum JobEvent {
    Init(HashMap<String, Job>),
    New(Job),
    Update(Job),
}

impl JobEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            JobEvent::Init(_) => "init",
            JobEvent::New(_) => "new",
            JobEvent::Update(_) => "update",
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            JobEvent::Init(jobs) => serde_json::to_value(jobs).expect("Job is serializable"),
            JobEvent::New(job) | JobEvent::Update(job) => {
                serde_json::to_value(job).expect("Job is serializable")
            }
        }
    }
}

pub type JobHandle = Arc<tokio::sync::Mutex<Job>>;

/// Canonical `video_id -> Job` map plus its subscriber hub. The map-level
/// lock is a plain `std::sync::Mutex` — it is only ever held for
/// insert/lookup/clone-out, never across an `.await` (§5).
pub struct JobRegistry {
    jobs: Mutex<HashMap<String, JobHandle>>,
    hub: Hub<JobEvent>,
    failures: Arc<FailureTracker>,
}

impl JobRegistry {
    pub fn new(failures: Arc<FailureTracker>) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            hub: Hub::new(),
            failures,
        }
    }

    pub fn get(&self, video_id: &str) -> Option<JobHandle> {
        self.jobs.lock().unwrap().get(video_id).cloned()
    }

    pub async fn get_all(&self) -> HashMap<String, Job> {
        let handles: Vec<(String, JobHandle)> = self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .map(|(id, handle)| (id.clone(), handle.clone()))
            .collect();

        let mut snapshot = HashMap::with_capacity(handles.len());
        for (id, handle) in handles {
            snapshot.insert(id, handle.lock().await.clone());
        }
        snapshot
    }

    /// §4.1: returns the existing live job, or creates/revives one and
    /// broadcasts `new`. `existed_alive` tells the intake worker whether to
    /// forward the id into the pipeline.
    pub async fn create_or_revive(&self, video_id: &str) -> (bool, JobHandle) {
        let (handle, was_vacant) = {
            let mut jobs = self.jobs.lock().unwrap();
            match jobs.entry(video_id.to_string()) {
                Entry::Occupied(entry) => (entry.get().clone(), false),
                Entry::Vacant(entry) => {
                    let handle = Arc::new(tokio::sync::Mutex::new(Job::new(video_id)));
                    entry.insert(handle.clone());
                    (handle, true)
                }
            }
        };

        if was_vacant {
            let snapshot = handle.lock().await.clone();
            self.hub.broadcast(JobEvent::New(snapshot));
            return (false, handle);
        }

        let mut guard = handle.lock().await;
        if guard.status != Status::Failed {
            drop(guard);
            return (true, handle);
        }

        guard.revive();
        if let Err(err) = self.failures.set_failed(video_id, false, "").await {
            tracing::error!(?err, video_id, "failed to clear persisted failure flag");
        }
        let snapshot = guard.clone();
        drop(guard);
        self.hub.broadcast(JobEvent::New(snapshot));
        (false, handle)
    }

    /// §4.1 `mutate`: holds the job's write lock across the mutation, the
    /// conditional C5 metadata write, and the broadcast.
    pub async fn mutate(&self, handle: &JobHandle, mutator: impl FnOnce(&mut Job)) {
        let mut guard = handle.lock().await;
        let had_meta = guard.progress.video_meta.is_some();
        mutator(&mut guard);

        if !had_meta {
            if let Some(meta) = guard.progress.video_meta.clone() {
                let video_id = guard.video_id.clone();
                if !self.failures.exists(&video_id).await {
                    if let Err(err) = self.failures.create(&video_id, meta).await {
                        tracing::error!(?err, video_id, "failed to persist video metadata");
                    }
                }
            }
        }

        let snapshot = guard.clone();
        self.hub.broadcast(JobEvent::Update(snapshot));
    }

    /// §4.2 `subscribe`: registers the sink, then writes `init` with a
    /// snapshot of every job, ahead of any later broadcast.
    pub async fn subscribe(&self) -> (Uuid, UnboundedReceiver<JobEvent>) {
        let snapshot = self.get_all().await;
        self.hub.subscribe_with_init(JobEvent::Init(snapshot))
    }

    pub fn unsubscribe(&self, id: Uuid) {
        self.hub.unsubscribe(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Status;
    use tempfile::tempdir;

    async fn registry() -> JobRegistry {
        let dir = tempdir().unwrap();
        let failures = FailureTracker::load(dir.path().join("video_meta.json"))
            .await
            .unwrap();
        JobRegistry::new(Arc::new(failures))
    }

    #[tokio::test]
    async fn create_or_revive_first_call_is_not_alive() {
        let registry = registry().await;
        let (existed_alive, handle) = registry.create_or_revive("abc12345678").await;
        assert!(!existed_alive);
        assert_eq!(handle.lock().await.status, Status::Pending);
    }

    #[tokio::test]
    async fn create_or_revive_second_call_is_alive() {
        let registry = registry().await;
        registry.create_or_revive("abc12345678").await;
        let (existed_alive, _) = registry.create_or_revive("abc12345678").await;
        assert!(existed_alive);
    }

    #[tokio::test]
    async fn create_or_revive_resets_a_failed_job() {
        let registry = registry().await;
        let (_, handle) = registry.create_or_revive("abc12345678").await;
        handle.lock().await.fail("boom");

        let (existed_alive, handle) = registry.create_or_revive("abc12345678").await;
        assert!(!existed_alive);
        assert_eq!(handle.lock().await.status, Status::Pending);
    }

    #[tokio::test]
    async fn subscribe_sees_init_before_later_update() {
        let registry = registry().await;
        let (_, handle) = registry.create_or_revive("abc12345678").await;

        let (_id, mut rx) = registry.subscribe().await;
        registry
            .mutate(&handle, |job| job.progress.percentage_string = "50%".into())
            .await;

        match rx.recv().await.unwrap() {
            JobEvent::Init(_) => {}
            other => panic!("expected init first, got {other:?}"),
        }
        match rx.recv().await.unwrap() {
            JobEvent::Update(job) => assert_eq!(job.progress.percentage_string, "50%"),
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_all_reflects_every_job() {
        let registry = registry().await;
        registry.create_or_revive("a").await;
        registry.create_or_revive("b").await;
        assert_eq!(registry.get_all().await.len(), 2);
    }
}
