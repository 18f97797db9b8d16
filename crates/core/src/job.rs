//! Job data model and the status state machine (§3, §4.3).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use digest_adapters::VideoMeta;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    CheckingForCaptions,
    DownloadedCaptions,
    DownloadingAudio,
    ExtractingAudio,
    Chunking,
    Transcribing,
    Summarizing,
    Finished,
    Failed,
}

impl Status {
    /// Whether `self -> next` is a legal edge in the table at §4.3.
    pub fn can_transition_to(self, next: Status) -> bool {
        use Status::*;
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Pending, CheckingForCaptions)
                | (CheckingForCaptions, DownloadedCaptions)
                | (CheckingForCaptions, DownloadingAudio)
                | (DownloadingAudio, ExtractingAudio)
                | (ExtractingAudio, Chunking)
                | (Chunking, Transcribing)
                | (Transcribing, Summarizing)
                | (DownloadedCaptions, Summarizing)
                | (Summarizing, Finished)
                | (Failed, Pending)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Finished | Status::Failed)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Progress {
    #[serde(rename = "video_meta")]
    pub video_meta: Option<VideoMeta>,
    pub percentage_string: String,
    pub had_captions: bool,
    pub transcription_chunks: u32,
    #[serde(rename = "transcription_chunks_transcribed")]
    pub transcription_chunks_done: u32,
    pub summary_chunks: u32,
    #[serde(rename = "summary_chunks_transcribed")]
    pub summary_chunks_done: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Job {
    pub video_id: String,
    pub status: Status,
    #[serde(default)]
    pub error: String,
    #[serde(rename = "job_progress")]
    pub progress: Progress,
}

/// Returned by [`Job::transition_to`] when an edge outside the §4.3 table is
/// attempted; stage workers treat this as a programming-error bug, not a
/// recoverable condition.
#[derive(Debug, thiserror::Error)]
#[error("illegal job transition {from:?} -> {to:?} for {video_id}")]
pub struct IllegalTransition {
    pub video_id: String,
    pub from: Status,
    pub to: Status,
}

impl Job {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            status: Status::Pending,
            error: String::new(),
            progress: Progress::default(),
        }
    }

    /// Resets a `failed` job back to `pending`, clearing prior error and
    /// progress so a retried run starts clean (§4.1 `create_or_revive`).
    pub fn revive(&mut self) {
        self.status = Status::Pending;
        self.error.clear();
        self.progress = Progress::default();
    }

    pub fn transition_to(&mut self, next: Status) -> Result<(), IllegalTransition> {
        if !self.status.can_transition_to(next) {
            return Err(IllegalTransition {
                video_id: self.video_id.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn fail(&mut self, cause: impl Into<String>) {
        self.status = Status::Failed;
        self.error = cause.into();
    }
}
