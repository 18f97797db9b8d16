use futures_util::{Stream, StreamExt};
use serde::Serialize;

use crate::error::AdapterError;
use crate::traits::ChatModel;
use crate::types::{ChatMessage, Role};

use super::config::HttpAdapterConfig;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessageJson>,
}

#[derive(Serialize)]
struct ChatMessageJson {
    role: &'static str,
    content: String,
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Default `ChatModel`: streams a chat-completion response and parses the
/// `data: {...}\n\n` SSE framing into text deltas, the same line-scanning
/// approach as `OpenRouterProvider::parse_stream_chunk`.
pub struct HttpChatModel {
    client: reqwest::Client,
    config: HttpAdapterConfig,
    model: String,
}

impl HttpChatModel {
    pub fn new(config: HttpAdapterConfig, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            model: model.into(),
        }
    }
}

fn extract_delta(data: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(data).ok()?;
    parsed
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

impl ChatModel for HttpChatModel {
    fn stream_reply(
        &self,
        system_prompt: &str,
        summary: Option<&str>,
        history: &[ChatMessage],
        user_message: &str,
    ) -> impl Stream<Item = Result<String, AdapterError>> + Send {
        let mut messages = vec![ChatMessageJson {
            role: "system",
            content: system_prompt.to_string(),
        }];
        if let Some(summary) = summary {
            messages.push(ChatMessageJson {
                role: "user",
                content: format!("Here is the summary of the video: {summary}"),
            });
        }
        for turn in history {
            messages.push(ChatMessageJson {
                role: role_str(turn.role),
                content: turn.content.clone(),
            });
        }
        messages.push(ChatMessageJson {
            role: "user",
            content: user_message.to_string(),
        });

        let body = ChatRequest {
            model: &self.model,
            stream: true,
            messages,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let request = self.config.authed(self.client.post(&url)).json(&body);

        async_stream::stream! {
            let resp = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(AdapterError::from(e));
                    return;
                }
            };

            let resp = match resp.error_for_status() {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(AdapterError::Upstream(e.to_string()));
                    return;
                }
            };

            let mut buf = String::new();
            let mut bytes = resp.bytes_stream();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(AdapterError::from(e));
                        return;
                    }
                };

                buf.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = buf.find("\n\n") {
                    let event = buf[..pos].to_string();
                    buf.drain(..pos + 2);

                    for line in event.lines() {
                        let Some(data) = line.strip_prefix("data: ") else {
                            continue;
                        };
                        if data.trim() == "[DONE]" {
                            return;
                        }
                        if let Some(delta) = extract_delta(data) {
                            yield Ok(delta);
                        }
                    }
                }
            }
        }
    }
}
