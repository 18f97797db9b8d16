use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Metadata extracted once acquisition has a handle on the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VideoMeta {
    pub thumbnail_url: String,
    pub title: String,
    pub creator: String,
    pub length_seconds: u64,
    pub upload_date: String,
}

/// A single timed line of text, in seconds, before any de-duplication or
/// offset-shifting is applied. Produced by caption probing and by the STT
/// service, one vec per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}
