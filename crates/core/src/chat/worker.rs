//! Chat Worker (C8): drives one language-model request per room, streaming
//! tokens to the room's hub and appending to the persistent transcript on
//! completion (§4.6).

use std::sync::Arc;

use futures_util::StreamExt;

use digest_adapters::{ChatMessage, ChatModel, Role};
use digest_store::ArtifactStore;

use crate::chat::room::{ChatEvent, ChatRoomRegistry};

/// §10.6: what happens to the transcript when the upstream model call
/// itself fails mid-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatErrorPolicy {
    #[default]
    Embed,
    Omit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted,
    RejectedInUse,
}

pub struct ChatWorker<M> {
    rooms: Arc<ChatRoomRegistry>,
    artifacts: Arc<ArtifactStore>,
    model: Arc<M>,
    system_prompt: Arc<str>,
    error_policy: ChatErrorPolicy,
}

impl<M: ChatModel> ChatWorker<M> {
    pub fn new(
        rooms: Arc<ChatRoomRegistry>,
        artifacts: Arc<ArtifactStore>,
        model: Arc<M>,
        system_prompt: impl Into<Arc<str>>,
        error_policy: ChatErrorPolicy,
    ) -> Self {
        Self {
            rooms,
            artifacts,
            model,
            system_prompt: system_prompt.into(),
            error_policy,
        }
    }

    /// §4.6 protocol steps 1-2: atomic busy test-and-set, then spawns the
    /// streaming worker (step 3) and returns immediately.
    pub async fn send(&self, video_id: &str, message: String) -> SendOutcome {
        let entry = self.rooms.get_or_create(video_id);

        let snapshot = {
            let mut room = entry.room.lock().await;
            if room.is_busy {
                return SendOutcome::RejectedInUse;
            }
            room.is_busy = true;
            room.in_progress_request = message.clone();
            room.in_progress_response.clear();
            room.clone()
        };
        entry.hub.broadcast(ChatEvent::Update(snapshot));

        let rooms = self.rooms.clone();
        let artifacts = self.artifacts.clone();
        let model = self.model.clone();
        let system_prompt = self.system_prompt.clone();
        let policy = self.error_policy;
        let video_id = video_id.to_string();

        tokio::spawn(async move {
            run(rooms, artifacts, model, system_prompt, policy, video_id, message).await;
        });

        SendOutcome::Accepted
    }
}

async fn run<M: ChatModel>(
    rooms: Arc<ChatRoomRegistry>,
    artifacts: Arc<ArtifactStore>,
    model: Arc<M>,
    system_prompt: Arc<str>,
    policy: ChatErrorPolicy,
    video_id: String,
    message: String,
) {
    let Some(entry) = rooms.get(&video_id) else {
        return;
    };

    let transcript = artifacts.read_transcript(&video_id).await.unwrap_or_default();
    let summary = artifacts.read_summary(&video_id).await.ok();

    let mut stream = Box::pin(model.stream_reply(
        &system_prompt,
        summary.as_deref(),
        &transcript,
        &message,
    ));

    let mut error_cause: Option<String> = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(token) => {
                let snapshot = {
                    let mut room = entry.room.lock().await;
                    room.in_progress_response.push_str(&token);
                    room.clone()
                };
                entry.hub.broadcast(ChatEvent::Update(snapshot));
            }
            Err(err) => {
                error_cause = Some(err.to_string());
                break;
            }
        }
    }
    drop(stream);

    if let Some(cause) = &error_cause {
        tracing::error!(video_id = %video_id, cause, "chat upstream failed");
        if policy == ChatErrorPolicy::Embed {
            let snapshot = {
                let mut room = entry.room.lock().await;
                room.in_progress_response.push_str(&format!("Error: {cause}"));
                room.clone()
            };
            entry.hub.broadcast(ChatEvent::Update(snapshot));
        }
    }

    entry.hub.broadcast(ChatEvent::Complete);

    let skip_append = matches!((&error_cause, policy), (Some(_), ChatErrorPolicy::Omit));
    if !skip_append {
        let response = entry.room.lock().await.in_progress_response.clone();
        if !response.is_empty() {
            let messages = [
                ChatMessage {
                    role: Role::User,
                    content: message.clone(),
                },
                ChatMessage {
                    role: Role::Assistant,
                    content: response,
                },
            ];
            if let Err(err) = artifacts.append_transcript(&video_id, &messages).await {
                tracing::error!(?err, video_id = %video_id, "failed to append chat transcript");
            }
        }
    }

    let snapshot = {
        let mut room = entry.room.lock().await;
        room.is_busy = false;
        room.in_progress_request.clear();
        room.in_progress_response.clear();
        room.clone()
    };
    entry.hub.broadcast(ChatEvent::Update(snapshot));

    // §10.7: re-check removal here too — listener_count may have dropped
    // to zero while this response was in flight.
    rooms.maybe_remove(&video_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use digest_adapters::fakes::FakeChatModel;
    use tempfile::tempdir;

    fn store() -> Arc<ArtifactStore> {
        Arc::new(ArtifactStore::new(tempdir().unwrap().into_path()))
    }

    #[tokio::test]
    async fn second_concurrent_send_is_rejected() {
        let rooms = Arc::new(ChatRoomRegistry::new());
        let model = Arc::new(FakeChatModel::replying(vec!["hi".into()]));
        let worker = ChatWorker::new(rooms, store(), model, "persona", ChatErrorPolicy::Embed);

        let first = worker.send("abc12345678", "hello".into()).await;
        let second = worker.send("abc12345678", "again".into()).await;

        assert_eq!(first, SendOutcome::Accepted);
        assert_eq!(second, SendOutcome::RejectedInUse);
    }

    #[tokio::test]
    async fn successful_reply_appends_transcript_and_clears_busy() {
        let rooms = Arc::new(ChatRoomRegistry::new());
        let artifacts = store();
        let model = Arc::new(FakeChatModel::replying(vec!["hi".into(), " there".into()]));
        let worker = ChatWorker::new(
            rooms.clone(),
            artifacts.clone(),
            model,
            "persona",
            ChatErrorPolicy::Embed,
        );

        worker.send("abc12345678", "hello".into()).await;

        for _ in 0..20 {
            if !rooms
                .snapshot("abc12345678")
                .await
                .map(|r| r.is_busy)
                .unwrap_or(false)
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let transcript = artifacts.read_transcript("abc12345678").await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].role, Role::User);
        assert_eq!(transcript[1].content, "hi there");
    }

    #[tokio::test]
    async fn embed_policy_writes_error_into_transcript() {
        let rooms = Arc::new(ChatRoomRegistry::new());
        let artifacts = store();
        let model = Arc::new(FakeChatModel::failing("upstream down"));
        let worker = ChatWorker::new(
            rooms.clone(),
            artifacts.clone(),
            model,
            "persona",
            ChatErrorPolicy::Embed,
        );

        worker.send("abc12345678", "hello".into()).await;
        for _ in 0..20 {
            if !rooms
                .snapshot("abc12345678")
                .await
                .map(|r| r.is_busy)
                .unwrap_or(false)
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let transcript = artifacts.read_transcript("abc12345678").await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert!(transcript[1].content.contains("upstream down"));
    }

    #[tokio::test]
    async fn omit_policy_skips_transcript_append_on_error() {
        let rooms = Arc::new(ChatRoomRegistry::new());
        let artifacts = store();
        let model = Arc::new(FakeChatModel::failing("upstream down"));
        let worker = ChatWorker::new(
            rooms.clone(),
            artifacts.clone(),
            model,
            "persona",
            ChatErrorPolicy::Omit,
        );

        worker.send("abc12345678", "hello".into()).await;
        for _ in 0..20 {
            if !rooms
                .snapshot("abc12345678")
                .await
                .map(|r| r.is_busy)
                .unwrap_or(false)
            {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        let transcript = artifacts.read_transcript("abc12345678").await.unwrap();
        assert!(transcript.is_empty());
    }
}
