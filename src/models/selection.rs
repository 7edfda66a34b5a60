use super::execution::TokenUsage;
use super::plugin::Plugin;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Display;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One (tool, tool input) decision from the agent's trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    pub tool: String,
    pub tool_input: String,
}

impl AgentStep {
    pub fn new(tool: impl Into<String>, tool_input: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            tool_input: tool_input.into(),
        }
    }
}

/// What the agent engine handed back for one prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentOutcome {
    Structured {
        answer: String,
        steps: Vec<AgentStep>,
    },
    /// The engine raised before producing a trace; only its rendered error is left.
    Failed { raw_text: String },
}

impl AgentOutcome {
    pub fn from_result<E: Display>(result: Result<(String, Vec<AgentStep>), E>) -> Self {
        match result {
            Ok((answer, steps)) => AgentOutcome::Structured { answer, steps },
            Err(err) => AgentOutcome::Failed {
                raw_text: err.to_string(),
            },
        }
    }

    pub fn answer_text(&self) -> &str {
        match self {
            AgentOutcome::Structured { answer, .. } => answer,
            AgentOutcome::Failed { raw_text } => raw_text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentRun {
    pub outcome: AgentOutcome,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginInvocation {
    pub plugin: Arc<Plugin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_called: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_operation_parameters: Option<Map<String, Value>>,
}

impl PluginInvocation {
    pub fn new(plugin: Arc<Plugin>) -> Self {
        Self {
            plugin,
            api_called: None,
            mapped_operation_parameters: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionResult {
    pub run_completed: bool,
    pub final_text_response: String,
    pub detected_plugin_operations: Vec<PluginInvocation>,
    /// Seconds, two decimals.
    pub response_time: f64,
    pub tokens_used: u64,
    pub llm_api_cost: f64,
}
