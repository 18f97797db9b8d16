//! `/openapi.json` document generation (§6.1), following the teacher's
//! `write_openapi_json` pattern without the multi-service merge/security
//! machinery this surface has no use for.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Video Digest API",
        version = "1.0.0",
        description = "Enqueues videos for caption/transcript summarization and exposes a chat interface over the result"
    ),
    paths(
        crate::routes::jobs::enqueue,
        crate::routes::jobs::get_job,
        crate::routes::jobs::get_summary,
        crate::routes::jobs::list_videos,
        crate::routes::jobs::get_video,
        crate::routes::jobs::subscribe_jobs,
        crate::routes::chat::get_transcript,
        crate::routes::chat::send_message,
        crate::routes::chat::subscribe_chat,
        crate::routes::health::health,
    ),
    components(
        schemas(
            digest_core::Job,
            digest_core::Status,
            digest_core::Progress,
            digest_adapters::VideoMeta,
            digest_adapters::ChatMessage,
            digest_adapters::Role,
            digest_store::VideoMetaEntry,
            crate::routes::jobs::SummaryResponse,
            crate::routes::chat::SendMessageRequest,
        )
    ),
    tags(
        (name = "jobs", description = "Summarization job lifecycle"),
        (name = "videos", description = "Persisted video metadata"),
        (name = "chat", description = "Chat over a video's transcript and summary"),
        (name = "health", description = "Liveness check")
    )
)]
pub struct ApiDoc;

pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

pub fn write_openapi_json() -> std::io::Result<std::path::PathBuf> {
    let json = serde_json::to_string_pretty(&openapi())
        .map_err(|e| std::io::Error::other(format!("serialize openapi: {e}")))?;

    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("openapi.gen.json");
    std::fs::write(&path, json)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    #[test]
    fn gen_openapi_json() {
        super::write_openapi_json().unwrap();
    }
}
