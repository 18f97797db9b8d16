//! C5 Failure Tracker: the single `video_meta.json` document recording, per
//! video id, the metadata last fetched and whether its most recent job
//! ended in failure (§4.4, §6.4).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use digest_adapters::VideoMeta;

use crate::error::StoreError;
use crate::fs::atomic_write_async;

#[derive(Debug, Clone, Serialize, Deserialize, Default, ToSchema)]
pub struct VideoMetaEntry {
    #[serde(default)]
    pub thumbnail_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub length_seconds: u64,
    #[serde(default)]
    pub upload_date: String,
    #[serde(default)]
    pub job_failed: bool,
    #[serde(default)]
    pub last_error: String,
}

impl From<VideoMeta> for VideoMetaEntry {
    fn from(meta: VideoMeta) -> Self {
        Self {
            thumbnail_url: meta.thumbnail_url,
            title: meta.title,
            creator: meta.creator,
            length_seconds: meta.length_seconds,
            upload_date: meta.upload_date,
            job_failed: false,
            last_error: String::new(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    data: HashMap<String, VideoMetaEntry>,
}

/// Guards the on-disk document with a single async rwlock; every mutation
/// rewrites the whole file atomically (§6.4).
pub struct FailureTracker {
    path: PathBuf,
    doc: RwLock<Document>,
}

impl FailureTracker {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            doc: RwLock::new(doc),
        })
    }

    pub async fn exists(&self, video_id: &str) -> bool {
        self.doc.read().await.data.contains_key(video_id)
    }

    pub async fn read(&self, video_id: &str) -> Option<VideoMetaEntry> {
        self.doc.read().await.data.get(video_id).cloned()
    }

    pub async fn read_all(&self) -> HashMap<String, VideoMetaEntry> {
        self.doc.read().await.data.clone()
    }

    pub async fn create(&self, video_id: &str, meta: VideoMeta) -> Result<(), StoreError> {
        let mut doc = self.doc.write().await;
        doc.data.insert(video_id.to_string(), meta.into());
        self.persist(&doc).await
    }

    pub async fn set_failed(
        &self,
        video_id: &str,
        failed: bool,
        message: impl Into<String>,
    ) -> Result<(), StoreError> {
        let mut doc = self.doc.write().await;
        let entry = doc.data.entry(video_id.to_string()).or_default();
        entry.job_failed = failed;
        entry.last_error = if failed { message.into() } else { String::new() };
        self.persist(&doc).await
    }

    async fn persist(&self, doc: &Document) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(doc)?;
        atomic_write_async(&self.path, &bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_meta() -> VideoMeta {
        VideoMeta {
            thumbnail_url: "https://example.com/thumb.jpg".to_string(),
            title: "A video".to_string(),
            creator: "Someone".to_string(),
            length_seconds: 120,
            upload_date: "2024-01-01".to_string(),
        }
    }

    #[tokio::test]
    async fn load_on_missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let tracker = FailureTracker::load(dir.path().join("video_meta.json"))
            .await
            .unwrap();
        assert!(tracker.read_all().await.is_empty());
    }

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let tracker = FailureTracker::load(dir.path().join("video_meta.json"))
            .await
            .unwrap();

        tracker.create("abc123", sample_meta()).await.unwrap();

        assert!(tracker.exists("abc123").await);
        let entry = tracker.read("abc123").await.unwrap();
        assert_eq!(entry.title, "A video");
        assert!(!entry.job_failed);
    }

    #[tokio::test]
    async fn set_failed_persists_across_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("video_meta.json");

        let tracker = FailureTracker::load(&path).await.unwrap();
        tracker.create("abc123", sample_meta()).await.unwrap();
        tracker
            .set_failed("abc123", true, "transcription timed out")
            .await
            .unwrap();

        let reloaded = FailureTracker::load(&path).await.unwrap();
        let entry = reloaded.read("abc123").await.unwrap();
        assert!(entry.job_failed);
        assert_eq!(entry.last_error, "transcription timed out");

        tracker.set_failed("abc123", false, "").await.unwrap();
        let entry = tracker.read("abc123").await.unwrap();
        assert!(!entry.job_failed);
        assert_eq!(entry.last_error, "");
    }

    #[tokio::test]
    async fn read_all_reflects_multiple_entries() {
        let dir = tempdir().unwrap();
        let tracker = FailureTracker::load(dir.path().join("video_meta.json"))
            .await
            .unwrap();

        tracker.create("a", sample_meta()).await.unwrap();
        tracker.create("b", sample_meta()).await.unwrap();

        assert_eq!(tracker.read_all().await.len(), 2);
    }
}
