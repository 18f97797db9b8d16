//! Deterministic on-disk layout for the four per-video artifacts: audio,
//! chunked audio directory, merged segment list, summary Markdown, and chat
//! transcript (§6.4, §9).

use std::path::{Path, PathBuf};

use digest_adapters::{ChatMessage, RawSegment};

use crate::error::StoreError;
use crate::fs::atomic_write_async;

/// Rooted at a single data directory; every path helper is a pure function
/// of `video_id` so repeated runs land on the same files (idempotence, §8.6).
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn video_dir(&self, video_id: &str) -> PathBuf {
        self.root.join(video_id)
    }

    pub fn audio_path(&self, video_id: &str) -> PathBuf {
        self.video_dir(video_id).join("audio.m4a")
    }

    pub fn chunks_dir(&self, video_id: &str) -> PathBuf {
        self.video_dir(video_id).join("chunks")
    }

    pub fn segments_path(&self, video_id: &str) -> PathBuf {
        self.video_dir(video_id).join("segments.json")
    }

    pub fn summary_path(&self, video_id: &str) -> PathBuf {
        self.video_dir(video_id).join("summary.md")
    }

    pub fn transcript_path(&self, video_id: &str) -> PathBuf {
        self.video_dir(video_id).join("chat.json")
    }

    pub async fn audio_exists(&self, video_id: &str) -> bool {
        tokio::fs::metadata(self.audio_path(video_id)).await.is_ok()
    }

    pub async fn segments_exist(&self, video_id: &str) -> bool {
        tokio::fs::metadata(self.segments_path(video_id))
            .await
            .is_ok()
    }

    pub async fn summary_exists(&self, video_id: &str) -> bool {
        tokio::fs::metadata(self.summary_path(video_id))
            .await
            .is_ok()
    }

    pub async fn write_segments(
        &self,
        video_id: &str,
        segments: &[RawSegment],
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(segments)?;
        atomic_write_async(&self.segments_path(video_id), &bytes).await?;
        Ok(())
    }

    pub async fn read_segments(&self, video_id: &str) -> Result<Vec<RawSegment>, StoreError> {
        let bytes = tokio::fs::read(self.segments_path(video_id)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn write_summary(&self, video_id: &str, markdown: &str) -> Result<(), StoreError> {
        atomic_write_async(&self.summary_path(video_id), markdown.as_bytes()).await
            .map_err(StoreError::from)
    }

    pub async fn read_summary(&self, video_id: &str) -> Result<String, StoreError> {
        Ok(tokio::fs::read_to_string(self.summary_path(video_id)).await?)
    }

    pub async fn read_transcript(&self, video_id: &str) -> Result<Vec<ChatMessage>, StoreError> {
        let path = self.transcript_path(video_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn append_transcript(
        &self,
        video_id: &str,
        messages: &[ChatMessage],
    ) -> Result<(), StoreError> {
        let mut transcript = self.read_transcript(video_id).await?;
        transcript.extend_from_slice(messages);
        let bytes = serde_json::to_vec_pretty(&transcript)?;
        atomic_write_async(&self.transcript_path(video_id), &bytes).await?;
        Ok(())
    }

    pub async fn ensure_chunks_dir(&self, video_id: &str) -> Result<PathBuf, StoreError> {
        let dir = self.chunks_dir(video_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digest_adapters::Role;
    use tempfile::tempdir;

    #[tokio::test]
    async fn paths_are_deterministic_per_video() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        assert_eq!(
            store.audio_path("abc"),
            store.audio_path("abc"),
            "path helpers must be pure"
        );
        assert_ne!(store.audio_path("abc"), store.audio_path("xyz"));
    }

    #[tokio::test]
    async fn segments_round_trip() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let segments = vec![RawSegment {
            start: 0.0,
            end: 1.5,
            text: "hello".to_string(),
        }];

        assert!(!store.segments_exist("abc").await);
        store.write_segments("abc", &segments).await.unwrap();
        assert!(store.segments_exist("abc").await);

        let read_back = store.read_segments("abc").await.unwrap();
        assert_eq!(read_back, segments);
    }

    #[tokio::test]
    async fn summary_round_trip() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        assert!(!store.summary_exists("abc").await);
        store.write_summary("abc", "# Title\n\nbody").await.unwrap();
        assert!(store.summary_exists("abc").await);
        assert_eq!(store.read_summary("abc").await.unwrap(), "# Title\n\nbody");
    }

    #[tokio::test]
    async fn transcript_starts_empty_and_appends() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        assert!(store.read_transcript("abc").await.unwrap().is_empty());

        store
            .append_transcript(
                "abc",
                &[ChatMessage {
                    role: Role::User,
                    content: "hi".to_string(),
                }],
            )
            .await
            .unwrap();
        store
            .append_transcript(
                "abc",
                &[ChatMessage {
                    role: Role::Assistant,
                    content: "hello".to_string(),
                }],
            )
            .await
            .unwrap();

        let transcript = store.read_transcript("abc").await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].content, "hello");
    }
}
