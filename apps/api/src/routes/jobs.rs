//! `/summarize/*` and `/videos/*` handlers (§6.1).

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use digest_core::{Job, Status};
use digest_store::VideoMetaEntry;

use crate::error::ApiError;
use crate::sse::sse_stream;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/summarize/{id}",
    params(("id" = String, Path, description = "video id")),
    responses(
        (status = 202, description = "enqueued"),
        (status = 429, description = "intake queue is full"),
    ),
    tag = "jobs",
)]
pub async fn enqueue(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .pipeline
        .enqueue(video_id)
        .map_err(|_| ApiError::IntakeFull)?;
    Ok(StatusCode::ACCEPTED)
}

#[utoipa::path(
    get,
    path = "/summarize/{id}",
    params(("id" = String, Path, description = "video id")),
    responses(
        (status = 200, description = "current job state", body = Job),
        (status = 404, description = "no job for this id"),
    ),
    tag = "jobs",
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let handle = state.registry.get(&video_id).ok_or(ApiError::JobNotFound)?;
    Ok(Json(handle.lock().await.clone()))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SummaryResponse {
    pub summary: Option<String>,
    pub no_summary_reason: Option<String>,
}

#[utoipa::path(
    get,
    path = "/summaries/{id}",
    params(("id" = String, Path, description = "video id")),
    responses(
        (status = 200, description = "summary, or the reason none is available yet", body = SummaryResponse),
    ),
    tag = "jobs",
)]
pub async fn get_summary(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let job = match state.registry.get(&video_id) {
        Some(handle) => Some(handle.lock().await.clone()),
        None => None,
    };

    let is_finished = matches!(&job, Some(job) if job.status == Status::Finished);
    if is_finished && state.artifacts.summary_exists(&video_id).await {
        let summary = state.artifacts.read_summary(&video_id).await?;
        return Ok(Json(SummaryResponse {
            summary: Some(summary),
            no_summary_reason: None,
        }));
    }

    let reason = if job.is_some() { "in_progress" } else { "not_found" };
    Ok(Json(SummaryResponse {
        summary: None,
        no_summary_reason: Some(reason.to_string()),
    }))
}

#[utoipa::path(
    get,
    path = "/videos",
    responses(
        (status = 200, description = "every known video id and its metadata", body = HashMap<String, VideoMetaEntry>),
    ),
    tag = "videos",
)]
pub async fn list_videos(
    State(state): State<AppState>,
) -> Json<HashMap<String, VideoMetaEntry>> {
    Json(state.failures.read_all().await)
}

#[utoipa::path(
    get,
    path = "/videos/{id}",
    params(("id" = String, Path, description = "video id")),
    responses(
        (status = 200, description = "the video's metadata", body = VideoMetaEntry),
        (status = 404, description = "unknown video id"),
    ),
    tag = "videos",
)]
pub async fn get_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoMetaEntry>, ApiError> {
    state
        .failures
        .read(&video_id)
        .await
        .map(Json)
        .ok_or(ApiError::VideoNotFound)
}

#[utoipa::path(
    get,
    path = "/summarize/jobs/subscribe",
    responses(
        (status = 200, description = "text/event-stream of init/new/update Job events"),
    ),
    tag = "jobs",
)]
pub async fn subscribe_jobs(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    let (id, rx) = state.registry.subscribe().await;
    let registry = state.registry.clone();
    sse_stream(rx, move || registry.unsubscribe(id))
}
