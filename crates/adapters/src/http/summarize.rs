use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::traits::Summarizer;

use super::config::HttpAdapterConfig;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessageJson<'a>>,
}

#[derive(Serialize)]
struct ChatMessageJson<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Default `Summarizer`: a single non-streaming chat-completion request per
/// rolling-summary step, shaped like the teacher's `OpenRouterProvider`
/// request/response handling in `llm-proxy` but without the provider
/// abstraction (the core has no need to switch LLM vendors mid-run).
pub struct HttpSummarizer {
    client: reqwest::Client,
    config: HttpAdapterConfig,
    model: String,
}

impl HttpSummarizer {
    pub fn new(config: HttpAdapterConfig, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            model: model.into(),
        }
    }
}

impl Summarizer for HttpSummarizer {
    async fn summarize_chunk(
        &self,
        system_prompt: &str,
        chunk_text: &str,
        current_summary: &str,
    ) -> Result<String, AdapterError> {
        let mut messages = vec![ChatMessageJson {
            role: "system",
            content: system_prompt.to_string(),
        }];
        messages.push(ChatMessageJson {
            role: "user",
            content: format!("summarize this:\n{chunk_text}"),
        });
        if !current_summary.is_empty() {
            messages.push(ChatMessageJson {
                role: "user",
                content: format!("current summary — combine it:\n{current_summary}"),
            });
        }

        let body = ChatRequest {
            model: &self.model,
            stream: false,
            messages,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let resp = self
            .config
            .authed(self.client.post(&url))
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AdapterError::Upstream(e.to_string()))?;

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AdapterError::Parse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AdapterError::Parse("empty choices array".to_string()))
    }
}
