use crate::config::Settings;
use crate::constants::{limits, llm_retry, network};
use crate::errors::{map_reqwest_error, PluginError};
use crate::models::{Message, TokenUsage};
use crate::services::logger::Logger;
use crate::services::retry::{retry_async, RetryPolicy};
use crate::utils::text::truncate_utf8_prefix;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

impl ChatRequest {
    pub fn single_user(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user(content)],
        }
    }
}

/// Candidate texts in provider order plus what the call cost.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatCompletion {
    pub choices: Vec<String>,
    pub usage: TokenUsage,
}

impl ChatCompletion {
    pub fn first_text(&self) -> Result<&str, PluginError> {
        self.choices
            .first()
            .map(String::as_str)
            .ok_or_else(|| PluginError::llm("LLM returned no choices"))
    }
}

/// Chat-completion collaborator. Implementations own their transport retries.
#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, PluginError>;
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Clone)]
pub struct OpenAiChatClient {
    logger: Logger,
    client: Client,
    endpoint: String,
    api_key: String,
    policy: RetryPolicy,
}

impl OpenAiChatClient {
    pub fn new(logger: Logger, settings: &Settings) -> Result<Self, PluginError> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let client = Client::builder()
            .user_agent(network::USER_AGENT)
            .timeout(Duration::from_millis(settings.llm_timeout_ms))
            .build()
            .map_err(|err| PluginError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            logger: logger.child("llm"),
            client,
            endpoint: format!("{}/chat/completions", settings.openai_base_url),
            api_key,
            policy: RetryPolicy::llm_transport(),
        })
    }

    async fn complete_once(&self, request: &ChatRequest) -> Result<ChatCompletion, PluginError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            let retryable = llm_retry::STATUS_CODES.contains(&status.as_u16());
            return Err(PluginError::llm(format!(
                "LLM API error {}: {}",
                status,
                truncate_utf8_prefix(&text, limits::RESPONSE_EXCERPT_BYTES * 4)
            ))
            .with_retryable(retryable));
        }
        let raw: Value = serde_json::from_str(&text)
            .map_err(|err| PluginError::llm(format!("LLM response is not JSON: {}", err)))?;
        Ok(parse_completion(&raw))
    }
}

#[async_trait]
impl ChatCompletionService for OpenAiChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatCompletion, PluginError> {
        self.logger.debug(
            "chat completion",
            Some(&serde_json::json!({"model": request.model})),
        );
        retry_async(&self.policy, &self.logger, "chat completion", |_| {
            self.complete_once(request)
        })
        .await
    }
}

pub fn parse_completion(raw: &Value) -> ChatCompletion {
    let choices = raw
        .get("choices")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|choice| choice.pointer("/message/content").and_then(|v| v.as_str()))
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();
    let count = |key: &str| raw.pointer(&format!("/usage/{}", key)).and_then(|v| v.as_u64()).unwrap_or(0);
    ChatCompletion {
        choices,
        usage: TokenUsage {
            prompt_tokens: count("prompt_tokens"),
            completion_tokens: count("completion_tokens"),
            total_tokens: count("total_tokens"),
            cost_usd: 0.0,
        },
    }
}
