use crate::constants::llm;
use crate::errors::PluginError;
use crate::models::{payload_text, TokenUsage};
use crate::services::llm_client::{ChatCompletionService, ChatRequest};
use crate::services::logger::Logger;
use crate::utils::template::render_response_template;
use serde_json::Value;
use std::sync::Arc;

pub fn clarifying_prompt(payload: &Value) -> String {
    llm::CLARIFYING_QUESTION_PROMPT.replace(llm::INPUT_JSON_MARKER, &payload_text(payload))
}

/// The directive applied to the rendered template if there is one, else to the raw payload.
pub fn cleanup_prompt(directive: &str, template_response: Option<&str>, payload: &Value) -> String {
    let subject = match template_response.filter(|t| !t.is_empty()) {
        Some(text) => text.to_string(),
        None => payload_text(payload),
    };
    format!("{} For: {}", directive, subject)
}

/// Summaries restate the most polished text available: cleanup, template, raw payload.
pub fn summary_prompt(
    cleanup_response: Option<&str>,
    template_response: Option<&str>,
    payload: &Value,
) -> String {
    let snippet = cleanup_response
        .filter(|t| !t.is_empty())
        .or(template_response.filter(|t| !t.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| payload_text(payload));
    format!("{}{}\n", llm::SUMMARY_PROMPT_PREFIX, snippet)
}

pub fn failed_text(err: &PluginError) -> String {
    format!("{}{}", llm::FAILED_PREFIX, err)
}

/// Template rendering plus the LLM-backed enrichment stages.
#[derive(Clone)]
pub struct PostProcessor {
    logger: Logger,
    llm: Arc<dyn ChatCompletionService>,
}

impl PostProcessor {
    pub fn new(logger: Logger, llm: Arc<dyn ChatCompletionService>) -> Self {
        Self {
            logger: logger.child("post"),
            llm,
        }
    }

    /// A copy whose log lines carry `request`'s id.
    pub fn for_request(&self, request: &Logger) -> Self {
        Self {
            logger: self.logger.in_request(request),
            llm: self.llm.clone(),
        }
    }

    /// `Ok(None)` when no template is configured. Errors are the caller's to propagate.
    pub fn render_template(
        &self,
        template: Option<&str>,
        payload: &Value,
    ) -> Result<Option<String>, PluginError> {
        match template.filter(|t| !t.is_empty()) {
            Some(template) => render_response_template(template, payload).map(Some),
            None => Ok(None),
        }
    }

    pub async fn clarifying_question(
        &self,
        model: &str,
        payload: &Value,
        usage: &mut TokenUsage,
    ) -> String {
        self.enrich("clarifying_question", model, clarifying_prompt(payload), usage)
            .await
    }

    pub async fn cleanup(
        &self,
        model: &str,
        directive: &str,
        template_response: Option<&str>,
        payload: &Value,
        usage: &mut TokenUsage,
    ) -> String {
        let prompt = cleanup_prompt(directive, template_response, payload);
        self.enrich("cleanup", model, prompt, usage).await
    }

    /// Always runs on the default model, whatever the caller selected.
    pub async fn summary(
        &self,
        cleanup_response: Option<&str>,
        template_response: Option<&str>,
        payload: &Value,
        usage: &mut TokenUsage,
    ) -> String {
        let prompt = summary_prompt(cleanup_response, template_response, payload);
        self.enrich("summary", llm::DEFAULT_MODEL_NAME, prompt, usage)
            .await
    }

    /// Never fails: any error becomes `"Failed: <error>"`.
    async fn enrich(
        &self,
        stage: &str,
        model: &str,
        prompt: String,
        usage: &mut TokenUsage,
    ) -> String {
        let request = ChatRequest::single_user(model, prompt);
        let result = self.llm.complete(&request).await.and_then(|completion| {
            *usage += completion.usage;
            completion.first_text().map(str::to_string)
        });
        match result {
            Ok(text) => {
                self.logger.debug(
                    "enrichment finished",
                    Some(&serde_json::json!({"stage": stage, "model": model})),
                );
                text
            }
            Err(err) => {
                self.logger.warn(
                    "enrichment failed",
                    Some(&serde_json::json!({"stage": stage, "model": model, "error": err.message})),
                );
                failed_text(&err)
            }
        }
    }
}
