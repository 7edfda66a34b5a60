use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::ops::AddAssign;

fn default_method() -> String {
    "GET".to_string()
}

/// A fully resolved API call plus the post-processing the caller asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedCallParams {
    #[serde(alias = "api")]
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, alias = "header")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_params: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(
        default,
        alias = "plugin_response_template",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_template: Option<String>,
    #[serde(
        default,
        alias = "post_processing_cleanup_prompt",
        skip_serializing_if = "Option::is_none"
    )]
    pub cleanup_directive: Option<String>,
    #[serde(default, alias = "run_summary_response")]
    pub run_summary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_model: Option<String>,
}

impl ResolvedCallParams {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: HashMap::new(),
            query_params: None,
            body: None,
            response_template: None,
            cleanup_directive: None,
            run_summary: false,
            llm_model: None,
        }
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.query_params
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_response_template(mut self, template: impl Into<String>) -> Self {
        self.response_template = Some(template.into());
        self
    }

    pub fn with_cleanup_directive(mut self, directive: impl Into<String>) -> Self {
        self.cleanup_directive = Some(directive.into());
        self
    }

    pub fn with_summary(mut self) -> Self {
        self.run_summary = true;
        self
    }

    pub fn with_llm_model(mut self, model: impl Into<String>) -> Self {
        self.llm_model = Some(model.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub cost_usd: f64,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.cost_usd += other.cost_usd;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub original_response: Value,
    pub clarifying_response: Option<String>,
    pub cleanup_response: Option<String>,
    pub template_response: Option<String>,
    pub summary_response: Option<String>,
    pub is_a_clarifying_question: bool,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl ExecutionResponse {
    /// The text a caller should show: clarifying question, then cleanup, then template, then raw payload.
    pub fn answer(&self) -> String {
        if self.is_a_clarifying_question {
            if let Some(text) = &self.clarifying_response {
                return text.clone();
            }
        }
        self.cleanup_response
            .as_ref()
            .or(self.template_response.as_ref())
            .cloned()
            .unwrap_or_else(|| payload_text(&self.original_response))
    }
}

/// Strings are used verbatim; everything else is rendered as JSON.
pub fn payload_text(payload: &Value) -> String {
    match payload {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
