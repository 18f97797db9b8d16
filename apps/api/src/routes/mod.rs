pub mod chat;
pub mod health;
pub mod jobs;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/summarize/jobs/subscribe", get(jobs::subscribe_jobs))
        .route("/summarize/{id}", post(jobs::enqueue).get(jobs::get_job))
        .route("/summaries/{id}", get(jobs::get_summary))
        .route("/videos", get(jobs::list_videos))
        .route("/videos/{id}", get(jobs::get_video))
        .route("/chat/{id}", get(chat::get_transcript))
        .route("/chat/{id}/send", post(chat::send_message))
        .route("/chat/{id}/subscribe", get(chat::subscribe_chat))
}
