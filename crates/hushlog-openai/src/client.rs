use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::chat::{ChatCompletionRequest, ChatCompletionResponse, Completion};
use crate::error::CompletionError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Sends chat-completion requests on behalf of a caller-supplied key.
///
/// The key is per call because projects may bring their own.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<Completion, CompletionError>;
}

/// [`CompletionClient`] for any OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    #[tracing::instrument(skip(self, api_key, request), fields(model = %request.model))]
    async fn complete(
        &self,
        api_key: &str,
        request: &ChatCompletionRequest,
    ) -> Result<Completion, CompletionError> {
        let url = self.completions_url();
        debug!(url = %url, messages = request.messages.len(), "sending chat completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let parsed: Result<ChatCompletionResponse, _> = serde_json::from_str(&body);

        if !status.is_success() {
            let message = parsed
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = parsed.map_err(|e| {
            CompletionError::ResponseParse(format!("invalid completion body: {e}. Body: {body}"))
        })?;

        if let Some(error) = parsed.error {
            return Err(CompletionError::Api {
                status: status.as_u16(),
                message: match error.kind {
                    Some(kind) => format!("{kind}: {}", error.message),
                    None => error.message,
                },
            });
        }

        // Tokens are billed even when the model returns no content, so an
        // empty completion is still a success here.
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.is_empty() {
            warn!("completion contained no message content");
        }

        let usage = parsed.usage.unwrap_or_default();

        info!(
            status = status.as_u16(),
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "chat completion finished"
        );

        Ok(Completion { text, usage })
    }
}
