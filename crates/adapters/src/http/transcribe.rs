use std::path::{Path, PathBuf};

use crate::error::AdapterError;
use crate::traits::Transcriber;
use crate::types::RawSegment;

use super::config::HttpAdapterConfig;

/// Default `Transcriber`: segments audio locally via an external `ffmpeg`
/// binary (subprocess adapter — the segmenter is a CLI tool, not a network
/// service) and sends each chunk to an HTTP speech-to-text upstream.
pub struct HttpTranscriber {
    client: reqwest::Client,
    config: HttpAdapterConfig,
    ffmpeg_path: String,
}

impl HttpTranscriber {
    pub fn new(config: HttpAdapterConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<String>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }
}

impl Transcriber for HttpTranscriber {
    async fn segment_audio(
        &self,
        audio_path: &Path,
        chunk_duration_secs: u64,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, AdapterError> {
        tokio::fs::create_dir_all(out_dir).await?;

        let pattern = out_dir.join("chunk-%04d.mp3");
        let status = tokio::process::Command::new(&self.ffmpeg_path)
            .arg("-y")
            .arg("-i")
            .arg(audio_path)
            .arg("-f")
            .arg("segment")
            .arg("-segment_time")
            .arg(chunk_duration_secs.to_string())
            .arg("-c")
            .arg("copy")
            .arg(&pattern)
            .status()
            .await?;

        if !status.success() {
            return Err(AdapterError::Upstream(format!(
                "segmenter exited with status {status}"
            )));
        }

        let mut entries = tokio::fs::read_dir(out_dir).await?;
        let mut chunks = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("mp3") {
                chunks.push(path);
            }
        }
        chunks.sort();
        Ok(chunks)
    }

    async fn transcribe_chunk(&self, chunk_path: &Path) -> Result<Vec<RawSegment>, AdapterError> {
        let bytes = tokio::fs::read(chunk_path).await?;

        let url = format!("{}/transcribe", self.config.base_url);
        let resp = self
            .config
            .authed(self.client.post(&url))
            .header("content-type", "audio/mpeg")
            .body(bytes)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AdapterError::Upstream(e.to_string()))?;

        resp.json::<Vec<RawSegment>>()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))
    }
}
