//! Chat Room Registry (C6) and its subscriber hub (C7): one room per
//! video-id behind a per-room lock, with listener bookkeeping behind a
//! process-wide map lock (§4.5), mirroring the Job Registry's two-tier
//! locking discipline in `registry.rs`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::hub::Hub;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatRoom {
    pub video_id: String,
    pub is_busy: bool,
    pub in_progress_request: String,
    pub in_progress_response: String,
    pub listener_count: u32,
}

#[derive(Debug, Clone)]
pub enum ChatEvent {
    Init(ChatRoom),
    Update(ChatRoom),
    Complete,
}

impl ChatEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ChatEvent::Init(_) => "init",
            ChatEvent::Update(_) => "update",
            ChatEvent::Complete => "complete",
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            ChatEvent::Init(room) | ChatEvent::Update(room) => {
                serde_json::to_value(room).expect("ChatRoom is serializable")
            }
            ChatEvent::Complete => serde_json::json!({}),
        }
    }
}

/// A room's state lock and its own subscriber hub, so broadcasts only ever
/// reach listeners of this one video (§4.5 "write only to those whose
/// listening_to = video_id").
pub(crate) struct RoomEntry {
    pub(crate) room: tokio::sync::Mutex<ChatRoom>,
    pub(crate) hub: Hub<ChatEvent>,
}

pub(crate) type RoomHandle = Arc<RoomEntry>;

pub struct ChatRoomRegistry {
    rooms: Mutex<HashMap<String, RoomHandle>>,
}

impl ChatRoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, video_id: &str) -> Option<RoomHandle> {
        self.rooms.lock().unwrap().get(video_id).cloned()
    }

    pub(crate) fn get_or_create(&self, video_id: &str) -> RoomHandle {
        self.rooms
            .lock()
            .unwrap()
            .entry(video_id.to_string())
            .or_insert_with(|| {
                Arc::new(RoomEntry {
                    room: tokio::sync::Mutex::new(ChatRoom {
                        video_id: video_id.to_string(),
                        ..Default::default()
                    }),
                    hub: Hub::new(),
                })
            })
            .clone()
    }

    /// §4.5 subscribe flow: look up/create the room, bump the listener
    /// count, then hand the new subscriber an `init` snapshot ahead of any
    /// later `update`/`complete`.
    pub async fn subscribe(&self, video_id: &str) -> (Uuid, UnboundedReceiver<ChatEvent>) {
        let entry = self.get_or_create(video_id);
        let snapshot = {
            let mut room = entry.room.lock().await;
            room.listener_count += 1;
            room.clone()
        };
        entry.hub.subscribe_with_init(ChatEvent::Init(snapshot))
    }

    pub async fn unsubscribe(&self, video_id: &str, id: Uuid) {
        let Some(entry) = self.get(video_id) else {
            return;
        };
        entry.hub.unsubscribe(id);
        {
            let mut room = entry.room.lock().await;
            room.listener_count = room.listener_count.saturating_sub(1);
        }
        self.maybe_remove(video_id);
    }

    pub async fn snapshot(&self, video_id: &str) -> Option<ChatRoom> {
        let entry = self.get(video_id)?;
        Some(entry.room.lock().await.clone())
    }

    /// §10.7: a room is removed only once `listener_count == 0 AND
    /// !is_busy` both hold. Called from the unsubscribe path above and
    /// again from the chat worker once it clears `is_busy`, since listeners
    /// may have already dropped to zero while a response was in flight.
    /// Holds the map lock across the check to shrink the TOCTOU window
    /// against a concurrent subscribe re-creating the room.
    pub(crate) fn maybe_remove(&self, video_id: &str) {
        let mut rooms = self.rooms.lock().unwrap();
        let Some(entry) = rooms.get(video_id) else {
            return;
        };
        if let Ok(room) = entry.room.try_lock() {
            if room.listener_count == 0 && !room.is_busy {
                drop(room);
                rooms.remove(video_id);
            }
        }
    }
}

impl Default for ChatRoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribe_creates_room_with_init_snapshot() {
        let registry = ChatRoomRegistry::new();
        let (_id, mut rx) = registry.subscribe("abc12345678").await;
        match rx.recv().await.unwrap() {
            ChatEvent::Init(room) => {
                assert_eq!(room.video_id, "abc12345678");
                assert_eq!(room.listener_count, 1);
            }
            other => panic!("expected init, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsubscribe_last_listener_removes_idle_room() {
        let registry = ChatRoomRegistry::new();
        let (id, _rx) = registry.subscribe("abc12345678").await;
        registry.unsubscribe("abc12345678", id).await;
        assert!(registry.get("abc12345678").is_none());
    }

    #[tokio::test]
    async fn unsubscribe_keeps_busy_room_alive() {
        let registry = ChatRoomRegistry::new();
        let (id, _rx) = registry.subscribe("abc12345678").await;
        {
            let entry = registry.get_or_create("abc12345678");
            entry.room.lock().await.is_busy = true;
        }
        registry.unsubscribe("abc12345678", id).await;
        assert!(registry.get("abc12345678").is_some());
    }

    #[tokio::test]
    async fn maybe_remove_clears_room_once_idle_and_unwatched() {
        let registry = ChatRoomRegistry::new();
        let entry = registry.get_or_create("abc12345678");
        entry.room.lock().await.is_busy = true;
        registry.maybe_remove("abc12345678");
        assert!(registry.get("abc12345678").is_some());

        entry.room.lock().await.is_busy = false;
        registry.maybe_remove("abc12345678");
        assert!(registry.get("abc12345678").is_none());
    }
}
