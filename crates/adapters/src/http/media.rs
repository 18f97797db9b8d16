use std::path::Path;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::AdapterError;
use crate::traits::MediaAcquirer;
use crate::types::{RawSegment, VideoMeta};

use super::config::HttpAdapterConfig;

/// Default `MediaAcquirer`: talks to a downloader service that exposes
/// metadata/caption probing as JSON and raw audio as a byte stream, the
/// same request shape the teacher's `llm-proxy` providers use for their
/// upstream calls (JSON in, `reqwest::Client` out).
pub struct HttpMediaAcquirer {
    client: reqwest::Client,
    config: HttpAdapterConfig,
}

impl HttpMediaAcquirer {
    pub fn new(config: HttpAdapterConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

impl MediaAcquirer for HttpMediaAcquirer {
    async fn fetch_metadata(&self, video_id: &str) -> Result<VideoMeta, AdapterError> {
        let url = format!("{}/metadata/{video_id}", self.config.base_url);
        let resp = self
            .config
            .authed(self.client.get(&url))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AdapterError::Upstream(e.to_string()))?;

        resp.json::<VideoMeta>()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))
    }

    async fn probe_captions(
        &self,
        video_id: &str,
    ) -> Result<Option<Vec<RawSegment>>, AdapterError> {
        let url = format!("{}/captions/{video_id}", self.config.base_url);
        let resp = self.config.authed(self.client.get(&url)).send().await?;

        if resp.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let resp = resp
            .error_for_status()
            .map_err(|e| AdapterError::Upstream(e.to_string()))?;

        let segments = resp
            .json::<Vec<RawSegment>>()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        Ok(Some(segments))
    }

    async fn download_audio(
        &self,
        video_id: &str,
        dest: &Path,
        on_progress: &(dyn Fn(String) + Send + Sync),
    ) -> Result<(), AdapterError> {
        let url = format!("{}/audio/{video_id}", self.config.base_url);
        let resp = self
            .config
            .authed(self.client.get(&url))
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AdapterError::Upstream(e.to_string()))?;

        let total = resp.content_length();
        let mut downloaded: u64 = 0;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;

        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            let pct = match total {
                Some(total) if total > 0 => {
                    format!("{:.1}%", (downloaded as f64 / total as f64) * 100.0)
                }
                _ => format!("{downloaded} bytes"),
            };
            on_progress(pct);
        }

        file.flush().await?;
        Ok(())
    }
}
