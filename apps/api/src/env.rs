//! Environment-variable configuration, loaded once into a `OnceLock<Env>`
//! (§10.4), mirroring the teacher's own `env()` accessor pattern.

use std::path::PathBuf;
use std::sync::OnceLock;

use serde::Deserialize;

fn default_port() -> u16 {
    3001
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("video-digest")
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_chat_error_policy() -> String {
    "embed".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Env {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_queue_capacity")]
    pub intake_queue_capacity: usize,
    #[serde(default = "default_queue_capacity")]
    pub stage_queue_capacity: usize,

    #[serde(default = "default_chat_error_policy")]
    pub chat_error_policy: String,

    pub downloader_base_url: String,

    pub stt_base_url: String,
    pub stt_api_key: Option<String>,

    pub llm_base_url: String,
    pub llm_api_key: Option<String>,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
}

static ENV: OnceLock<Env> = OnceLock::new();

pub fn env() -> &'static Env {
    ENV.get_or_init(|| {
        let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
        let _ = dotenvy::from_path(manifest_dir.join(".env"));
        envy::from_env().expect("failed to load environment")
    })
}
