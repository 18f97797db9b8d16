/// Shared shape for the three HTTP-backed adapters: a base URL and an
/// optional bearer token, mirroring how the teacher's `llm-proxy` providers
/// and `transcribe-proxy` sessions are configured per upstream.
#[derive(Debug, Clone)]
pub struct HttpAdapterConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl HttpAdapterConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub(crate) fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}
