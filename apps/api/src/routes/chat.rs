//! `/chat/*` handlers (§6.1, §4.5, §4.6).

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use utoipa::ToSchema;

use digest_adapters::ChatMessage;
use digest_core::SendOutcome;

use crate::error::ApiError;
use crate::sse::sse_stream;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/chat/{id}",
    params(("id" = String, Path, description = "video id")),
    responses(
        (status = 200, description = "the chat transcript so far", body = Vec<ChatMessage>),
        (status = 404, description = "no transcript for this video"),
    ),
    tag = "chat",
)]
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.artifacts.read_transcript(&video_id).await?))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/chat/{id}/send",
    params(("id" = String, Path, description = "video id")),
    request_body = SendMessageRequest,
    responses(
        (status = 202, description = "message accepted"),
        (status = 400, description = "empty message"),
        (status = 409, description = "room busy with another in-flight reply"),
    ),
    tag = "chat",
)]
pub async fn send_message(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<StatusCode, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }
    match state.chat.send(&video_id, body.message).await {
        SendOutcome::Accepted => Ok(StatusCode::ACCEPTED),
        SendOutcome::RejectedInUse => Err(ApiError::ChatRoomBusy),
    }
}

#[utoipa::path(
    get,
    path = "/chat/{id}/subscribe",
    params(("id" = String, Path, description = "video id")),
    responses(
        (status = 200, description = "text/event-stream of chat messages for this room"),
    ),
    tag = "chat",
)]
pub async fn subscribe_chat(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> impl axum::response::IntoResponse {
    let (id, rx) = state.rooms.subscribe(&video_id).await;
    let rooms = state.rooms.clone();
    sse_stream(rx, move || {
        tokio::spawn(async move { rooms.unsubscribe(&video_id, id).await });
    })
}
