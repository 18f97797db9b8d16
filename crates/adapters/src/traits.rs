use std::path::Path;

use futures_util::Stream;

use crate::error::AdapterError;
use crate::types::{ChatMessage, RawSegment, VideoMeta};

/// Caption probing and raw media acquisition (§4.3 "acquire").
///
/// `download_audio` is expected to write the audio to `dest` and invoke
/// `on_progress` with a free-form percentage string as the downloader
/// reports progress; the core never inspects its contents beyond storing it
/// verbatim in `Job.progress.percentage_string`.
pub trait MediaAcquirer: Send + Sync + 'static {
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMeta, AdapterError>;

    async fn probe_captions(
        &self,
        video_id: &str,
    ) -> Result<Option<Vec<RawSegment>>, AdapterError>;

    async fn download_audio(
        &self,
        video_id: &str,
        dest: &Path,
        on_progress: &(dyn Fn(String) + Send + Sync),
    ) -> Result<(), AdapterError>;
}

/// Segmentation + speech-to-text (§4.3 "transcribe").
///
/// `transcribe_chunk` returns segments timed relative to the start of that
/// chunk (0-based); the caller is responsible for shifting by the cumulative
/// offset to build a contiguous timeline.
pub trait Transcriber: Send + Sync + 'static {
    async fn segment_audio(
        &self,
        audio_path: &Path,
        chunk_duration_secs: u64,
        out_dir: &Path,
    ) -> Result<Vec<std::path::PathBuf>, AdapterError>;

    async fn transcribe_chunk(
        &self,
        chunk_path: &Path,
    ) -> Result<Vec<RawSegment>, AdapterError>;
}

/// Rolling summarization (§4.3 "summarize").
pub trait Summarizer: Send + Sync + 'static {
    async fn summarize_chunk(
        &self,
        system_prompt: &str,
        chunk_text: &str,
        current_summary: &str,
    ) -> Result<String, AdapterError>;
}

/// Streaming chat completion (§4.6).
pub trait ChatModel: Send + Sync + 'static {
    fn stream_reply(
        &self,
        system_prompt: &str,
        summary: Option<&str>,
        history: &[ChatMessage],
        user_message: &str,
    ) -> impl Stream<Item = Result<String, AdapterError>> + Send;
}
