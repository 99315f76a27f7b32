use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ChatMessage, LanguageModel, LlmError, ProviderMetadata};

/// Client for any `/chat/completions` endpoint speaking the OpenAI format
/// (DeepSeek by default).
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiCompatibleClient {
    /// `timeout` of `None` lets a request wait indefinitely.
    pub fn new(
        api_key: String,
        api_url: String,
        model: String,
        timeout: Option<Duration>,
    ) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_key,
            api_url,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::AuthenticationError);
        }

        let request = CompletionRequest {
            model: &self.model,
            messages,
            stream: false,
            temperature,
        };

        tracing::debug!(
            "Calling {} with {} messages (temperature {:?})",
            self.model,
            messages.len(),
            temperature
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status == 429 {
            return Err(LlmError::RateLimitExceeded);
        }

        if status == 401 || status == 403 {
            return Err(LlmError::AuthenticationError);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiError(format!("HTTP {status}: {body}")));
        }

        let body = response.text().await.map_err(classify_transport_error)?;
        extract_content(&body)
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: self.api_url.clone(),
            model: self.model.clone(),
        }
    }
}

fn classify_transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::NetworkError(e)
    }
}

/// Pull the first choice's text out of a completion response body.
fn extract_content(body: &str) -> Result<String, LlmError> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::ApiError(format!("Failed to parse response: {e}")))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }

    Ok(content)
}
