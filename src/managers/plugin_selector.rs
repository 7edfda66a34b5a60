use crate::models::{AgentOutcome, AgentRun, Message, PluginRegistry, SelectionResult};
use crate::services::invocation_extractor::extract_invocations;
use crate::services::logger::Logger;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// The external reasoning engine that picks tools. Errors are reported inside
/// the returned outcome, never raised.
#[async_trait]
pub trait AgentEngine: Send + Sync {
    async fn run(&self, prompt: &str) -> AgentRun;
}

#[derive(Clone)]
pub struct PluginSelectorManager {
    logger: Logger,
    registry: Arc<PluginRegistry>,
    engine: Arc<dyn AgentEngine>,
}

impl PluginSelectorManager {
    pub fn new(logger: Logger, registry: Arc<PluginRegistry>, engine: Arc<dyn AgentEngine>) -> Self {
        Self {
            logger: logger.child("selector"),
            registry,
            engine,
        }
    }

    /// Plugin pre-prompts followed by the last message of the conversation.
    pub fn build_prompt(&self, messages: &[Message]) -> String {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        format!("{}\n{}", self.registry.pre_prompts(), last)
    }

    pub async fn run(&self, messages: &[Message]) -> SelectionResult {
        let logger = self.logger.for_request();
        let started = Instant::now();
        let prompt = self.build_prompt(messages);

        let run = self.engine.run(&prompt).await;
        let detected = extract_invocations(&self.registry, &run.outcome);
        let elapsed = started.elapsed().as_secs_f64();

        if let AgentOutcome::Failed { raw_text } = &run.outcome {
            logger.warn(
                "agent run failed, recovered invocations from its error text",
                Some(&serde_json::json!({
                    "recovered": detected.len(),
                    "error_len": raw_text.len(),
                })),
            );
        }
        logger.info(
            "plugin selection finished",
            Some(&serde_json::json!({
                "plugins": detected.iter().map(|d| d.plugin.name.as_str()).collect::<Vec<_>>(),
                "tokens": run.usage.total_tokens,
            })),
        );

        SelectionResult {
            run_completed: true,
            final_text_response: run.outcome.answer_text().to_string(),
            detected_plugin_operations: detected,
            response_time: round_to(elapsed, 2),
            tokens_used: run.usage.total_tokens,
            llm_api_cost: round_to(run.usage.cost_usd, 4),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
