//! HTTP error taxonomy: every handler error maps to `{error: {code,
//! message}}` via `IntoResponse` (§10.3, following `api-storage::error`).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("job not found")]
    JobNotFound,
    #[error("video not found")]
    VideoNotFound,
    #[error("intake queue is full, try again shortly")]
    IntakeFull,
    #[error("chat room is busy")]
    ChatRoomBusy,
    #[error("malformed request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(#[from] digest_store::StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::JobNotFound | ApiError::VideoNotFound => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::IntakeFull => (StatusCode::TOO_MANY_REQUESTS, "intake_full"),
            ApiError::ChatRoomBusy => (StatusCode::CONFLICT, "chat_room_busy"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(serde_json::json!({
            "error": { "code": code, "message": self.to_string() }
        }));
        (status, body).into_response()
    }
}
