mod env;
mod error;
mod openapi;
mod routes;
mod sse;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::routing::get;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use digest_adapters::http::{HttpAdapterConfig, HttpChatModel, HttpMediaAcquirer, HttpSummarizer, HttpTranscriber};
use digest_core::{ChatErrorPolicy, ChatRoomRegistry, ChatWorker, JobRegistry, Pipeline, PipelineConfig};
use digest_store::{ArtifactStore, FailureTracker};

use env::env;
use state::AppState;

const SUMMARIZER_SYSTEM_PROMPT: &str =
    "You summarize video transcripts into a concise Markdown summary.";
const CHAT_SYSTEM_PROMPT: &str =
    "You answer questions about a video using its transcript and summary as context.";

fn parse_chat_error_policy(raw: &str) -> ChatErrorPolicy {
    match raw {
        "omit" => ChatErrorPolicy::Omit,
        "embed" => ChatErrorPolicy::Embed,
        other => {
            tracing::warn!(value = other, "unrecognized CHAT_ERROR_POLICY, defaulting to embed");
            ChatErrorPolicy::Embed
        }
    }
}

async fn build_state() -> anyhow::Result<AppState> {
    let env = env();

    tokio::fs::create_dir_all(&env.data_dir).await?;
    let failures = Arc::new(FailureTracker::load(env.data_dir.join("video_meta.json")).await?);
    let artifacts = Arc::new(ArtifactStore::new(env.data_dir.clone()));
    let registry = Arc::new(JobRegistry::new(failures.clone()));

    let downloader_config = HttpAdapterConfig::new(&env.downloader_base_url);
    let mut stt_config = HttpAdapterConfig::new(&env.stt_base_url);
    if let Some(key) = &env.stt_api_key {
        stt_config = stt_config.with_api_key(key.clone());
    }
    let mut llm_config = HttpAdapterConfig::new(&env.llm_base_url);
    if let Some(key) = &env.llm_api_key {
        llm_config = llm_config.with_api_key(key.clone());
    }

    let acquirer = Arc::new(HttpMediaAcquirer::new(downloader_config));
    let transcriber = Arc::new(HttpTranscriber::new(stt_config));
    let summarizer = Arc::new(HttpSummarizer::new(llm_config.clone(), &env.llm_model));
    let chat_model = Arc::new(HttpChatModel::new(llm_config, &env.llm_model));

    let pipeline = Arc::new(Pipeline::spawn(
        registry.clone(),
        artifacts.clone(),
        failures.clone(),
        acquirer,
        transcriber,
        summarizer,
        PipelineConfig {
            intake_queue_capacity: env.intake_queue_capacity,
            stage_queue_capacity: env.stage_queue_capacity,
            summarizer_system_prompt: Arc::from(SUMMARIZER_SYSTEM_PROMPT),
            ..Default::default()
        },
    ));

    let rooms = Arc::new(ChatRoomRegistry::new());
    let chat = Arc::new(ChatWorker::new(
        rooms.clone(),
        artifacts.clone(),
        chat_model,
        CHAT_SYSTEM_PROMPT,
        parse_chat_error_policy(&env.chat_error_policy),
    ));

    Ok(AppState {
        registry,
        pipeline,
        rooms,
        chat,
        artifacts,
        failures,
    })
}

async fn app() -> anyhow::Result<Router> {
    let state = build_state().await?;

    let router = routes::router()
        .route("/openapi.json", get(openapi_json))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods(cors::Any)
                .allow_headers(cors::Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<axum::body::Body>| {
                    let path = request.uri().path();
                    if path == "/health" {
                        return tracing::Span::none();
                    }
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(path);
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        http.route = %matched_path,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<axum::body::Body>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        if span.is_disabled() {
                            return;
                        }
                        tracing::info!(
                            parent: span,
                            http_status = %response.status().as_u16(),
                            latency_ms = %latency.as_millis(),
                            "http_request_finished"
                        );
                    },
                ),
        );

    Ok(router)
}

async fn openapi_json() -> axum::Json<utoipa::openapi::OpenApi> {
    axum::Json(openapi::openapi())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    tracing::info!("shutdown_signal_received");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let _ = openapi::write_openapi_json();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let env = env();
            let addr = SocketAddr::from(([0, 0, 0, 0], env.port));
            tracing::info!(addr = %addr, "server_listening");

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app().await?)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            Ok::<_, anyhow::Error>(())
        })
}
