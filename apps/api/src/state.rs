use std::sync::Arc;

use digest_adapters::http::HttpChatModel;
use digest_core::{ChatRoomRegistry, ChatWorker, JobRegistry, Pipeline};
use digest_store::{ArtifactStore, FailureTracker};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<JobRegistry>,
    pub pipeline: Arc<Pipeline>,
    pub rooms: Arc<ChatRoomRegistry>,
    pub chat: Arc<ChatWorker<HttpChatModel>>,
    pub artifacts: Arc<ArtifactStore>,
    pub failures: Arc<FailureTracker>,
}
