//! The Job Pipeline Core (C1-C5) and the Streaming Chat Core (C6-C8):
//! generic over the `digest_adapters` trait contracts, with all persistence
//! delegated to `digest_store`.

pub mod chat;
mod error;
mod hub;
mod job;
mod registry;
pub mod stages;

pub use chat::{ChatErrorPolicy, ChatEvent, ChatRoom, ChatRoomRegistry, ChatWorker, SendOutcome};
pub use error::CoreError;
pub use hub::Hub;
pub use job::{IllegalTransition, Job, Progress, Status};
pub use registry::{JobEvent, JobHandle, JobRegistry};
pub use stages::{Pipeline, PipelineConfig, StageError};
