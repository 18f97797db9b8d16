//! Stage-adapter contracts (C4): typed traits for media acquisition,
//! transcription, and summarization, plus one reqwest-backed default
//! implementation of each and in-memory fakes for testing.

mod error;
mod traits;
mod types;

pub mod fakes;
pub mod http;

pub use error::AdapterError;
pub use traits::{ChatModel, MediaAcquirer, Summarizer, Transcriber};
pub use types::{ChatMessage, RawSegment, Role, VideoMeta};
