use crate::constants::llm;
use crate::errors::PluginError;
use crate::models::{ExecutionResponse, ResolvedCallParams, TokenUsage};
use crate::services::invoker::{ApiInvoker, ApiRequest};
use crate::services::logger::Logger;
use crate::services::post_processor::PostProcessor;

/// Runs one resolved operation: call the API, render the template, then the
/// optional LLM enrichments. Only the API call and template rendering can fail.
#[derive(Clone)]
pub struct OperationExecutionManager {
    logger: Logger,
    invoker: ApiInvoker,
    post_processor: PostProcessor,
}

impl OperationExecutionManager {
    pub fn new(logger: Logger, invoker: ApiInvoker, post_processor: PostProcessor) -> Self {
        Self {
            logger: logger.child("execution"),
            invoker,
            post_processor,
        }
    }

    pub async fn run(&self, params: &ResolvedCallParams) -> Result<ExecutionResponse, PluginError> {
        let logger = self.logger.for_request();
        logger.info(
            "executing operation",
            Some(&serde_json::json!({"method": params.method, "url": params.url})),
        );

        let invoker = self.invoker.for_request(&logger);
        let post_processor = self.post_processor.for_request(&logger);

        let api_response = match invoker.invoke(ApiRequest::from(params)).await {
            Ok(response) => response,
            Err(err) => {
                logger.error(
                    "operation failed",
                    Some(&serde_json::json!({"url": params.url, "error": err.message})),
                );
                return Err(err);
            }
        };
        let payload = &api_response.payload;

        let template_response =
            post_processor.render_template(params.response_template.as_deref(), payload)?;

        let model = params.llm_model.as_deref().unwrap_or(llm::DEFAULT_MODEL_NAME);
        let mut usage = TokenUsage::default();
        let mut clarifying_response = None;
        let mut cleanup_response = None;
        let is_a_clarifying_question = api_response.needs_clarification();

        if is_a_clarifying_question {
            logger.debug("target API asked for more input", None);
            clarifying_response = Some(
                post_processor
                    .clarifying_question(model, payload, &mut usage)
                    .await,
            );
        } else if let Some(directive) = params.cleanup_directive.as_deref().filter(|d| !d.is_empty()) {
            cleanup_response = Some(
                post_processor
                    .cleanup(model, directive, template_response.as_deref(), payload, &mut usage)
                    .await,
            );
        }

        let summary_response = if params.run_summary {
            Some(
                post_processor
                    .summary(
                        cleanup_response.as_deref(),
                        template_response.as_deref(),
                        payload,
                        &mut usage,
                    )
                    .await,
            )
        } else {
            None
        };

        logger.info(
            "operation finished",
            Some(&serde_json::json!({
                "status": api_response.status,
                "clarifying": is_a_clarifying_question,
                "tokens": usage.total_tokens,
            })),
        );

        Ok(ExecutionResponse {
            original_response: api_response.payload,
            clarifying_response,
            cleanup_response,
            template_response,
            summary_response,
            is_a_clarifying_question,
            usage,
        })
    }
}
