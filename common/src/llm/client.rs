use crate::config::LlmSettings;
use crate::error::{Result, TextToSqlError};
use crate::llm::model::{CompletionRequest, CompletionResponse};
use async_trait::async_trait;
use std::time::{Duration, Instant};

/// anything that answers chat-completion requests
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// model used when the caller does not name one
    fn default_model(&self) -> &str;
}

/// chat-completions client over an openai-compatible http endpoint
pub struct CompletionClient {
    http: reqwest::Client,
    server_url: String,
    api_key: Option<String>,
    default_model: String,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("server_url", &self.server_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl CompletionClient {
    pub fn new(
        server_url: &str,
        api_key: Option<String>,
        default_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let server_url = server_url.trim_end_matches('/').to_string();
        if server_url.is_empty() {
            return Err(TextToSqlError::Config(
                "llm server url is required".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TextToSqlError::Config(format!("failed to build http client: {}", e)))?;

        tracing::info!("completion client targets {}", server_url);

        Ok(Self {
            http,
            server_url,
            api_key: api_key.filter(|k| !k.is_empty()),
            default_model: default_model.into(),
        })
    }

    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        Self::new(
            &settings.server_url,
            settings.resolved_api_key(),
            settings.default_model.clone(),
            settings.timeout(),
        )
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.server_url)
    }
}

#[async_trait]
impl ChatCompletion for CompletionClient {
    #[tracing::instrument(
        skip(self, request),
        fields(llm.model = %request.model, message_count = request.messages.len())
    )]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let started = Instant::now();

        let mut builder = self.http.post(self.endpoint()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "completion request failed");
            return Err(TextToSqlError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|e| TextToSqlError::MalformedUpstreamResponse(e.to_string()))?;

        if parsed.choices.is_empty() {
            return Err(TextToSqlError::EmptyCompletion);
        }

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_bytes = body.len(),
            "completion received"
        );

        Ok(parsed)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}
