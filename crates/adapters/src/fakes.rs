//! In-memory test doubles for the four adapter traits, used by
//! `digest-core`'s pipeline tests instead of real network/subprocess calls.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use futures_util::{Stream, stream};

use crate::error::AdapterError;
use crate::traits::{ChatModel, MediaAcquirer, Summarizer, Transcriber};
use crate::types::{ChatMessage, RawSegment, VideoMeta};

/// Scripted `MediaAcquirer`: returns fixed metadata, optionally "has"
/// captions, and "downloads" by just creating an empty file at `dest`.
pub struct FakeMediaAcquirer {
    pub meta: VideoMeta,
    pub captions: Option<Vec<RawSegment>>,
    pub progress_updates: Vec<String>,
}

impl FakeMediaAcquirer {
    pub fn with_captions(meta: VideoMeta, captions: Vec<RawSegment>) -> Self {
        Self {
            meta,
            captions: Some(captions),
            progress_updates: vec![],
        }
    }

    pub fn without_captions(meta: VideoMeta, progress_updates: Vec<String>) -> Self {
        Self {
            meta,
            captions: None,
            progress_updates,
        }
    }
}

impl MediaAcquirer for FakeMediaAcquirer {
    async fn fetch_metadata(&self, _video_id: &str) -> Result<VideoMeta, AdapterError> {
        Ok(self.meta.clone())
    }

    async fn probe_captions(
        &self,
        _video_id: &str,
    ) -> Result<Option<Vec<RawSegment>>, AdapterError> {
        Ok(self.captions.clone())
    }

    async fn download_audio(
        &self,
        _video_id: &str,
        dest: &Path,
        on_progress: &(dyn Fn(String) + Send + Sync),
    ) -> Result<(), AdapterError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        for update in &self.progress_updates {
            on_progress(update.clone());
        }
        tokio::fs::write(dest, b"fake-audio").await?;
        Ok(())
    }
}

/// Scripted `Transcriber`: "segments" by producing `n` empty chunk files and
/// returns one fixed set of raw segments per chunk, indexed by call order.
pub struct FakeTranscriber {
    pub chunk_count: usize,
    pub segments_per_chunk: Vec<Vec<RawSegment>>,
    calls: Mutex<usize>,
}

impl FakeTranscriber {
    pub fn new(segments_per_chunk: Vec<Vec<RawSegment>>) -> Self {
        Self {
            chunk_count: segments_per_chunk.len(),
            segments_per_chunk,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Transcriber for FakeTranscriber {
    async fn segment_audio(
        &self,
        _audio_path: &Path,
        _chunk_duration_secs: u64,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, AdapterError> {
        tokio::fs::create_dir_all(out_dir).await?;
        let mut paths = Vec::new();
        for i in 0..self.chunk_count {
            let path = out_dir.join(format!("chunk-{i:04}.mp3"));
            tokio::fs::write(&path, b"fake-chunk").await?;
            paths.push(path);
        }
        Ok(paths)
    }

    async fn transcribe_chunk(&self, _chunk_path: &Path) -> Result<Vec<RawSegment>, AdapterError> {
        let mut calls = self.calls.lock().unwrap();
        let idx = *calls;
        *calls += 1;
        Ok(self
            .segments_per_chunk
            .get(idx)
            .cloned()
            .unwrap_or_default())
    }
}

/// Scripted `Summarizer`: appends the chunk text to whatever summary it was
/// given, so tests can assert on the rolling-summary shape without a real
/// language model.
pub struct FakeSummarizer;

impl Summarizer for FakeSummarizer {
    async fn summarize_chunk(
        &self,
        _system_prompt: &str,
        chunk_text: &str,
        current_summary: &str,
    ) -> Result<String, AdapterError> {
        if current_summary.is_empty() {
            Ok(format!("summary of: {chunk_text}"))
        } else {
            Ok(format!("{current_summary} + {chunk_text}"))
        }
    }
}

/// Scripted `ChatModel`: replays a fixed sequence of tokens, or an error if
/// configured to fail.
pub struct FakeChatModel {
    pub tokens: Vec<String>,
    pub fail_with: Option<String>,
}

impl FakeChatModel {
    pub fn replying(tokens: Vec<String>) -> Self {
        Self {
            tokens,
            fail_with: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            tokens: vec![],
            fail_with: Some(message.into()),
        }
    }
}

impl ChatModel for FakeChatModel {
    fn stream_reply(
        &self,
        _system_prompt: &str,
        _summary: Option<&str>,
        _history: &[ChatMessage],
        _user_message: &str,
    ) -> impl Stream<Item = Result<String, AdapterError>> + Send {
        if let Some(msg) = self.fail_with.clone() {
            stream::iter(vec![Err(AdapterError::Upstream(msg))])
        } else {
            stream::iter(self.tokens.clone().into_iter().map(Ok))
        }
    }
}
