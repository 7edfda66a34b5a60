use crate::config::Settings;
use crate::errors::PluginError;
use crate::managers::operation_execution::OperationExecutionManager;
use crate::managers::plugin_selector::{AgentEngine, PluginSelectorManager};
use crate::models::PluginRegistry;
use crate::services::invoker::ApiInvoker;
use crate::services::llm_client::{ChatCompletionService, OpenAiChatClient};
use crate::services::logger::Logger;
use crate::services::post_processor::PostProcessor;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub settings: Settings,
    pub operation_execution: Arc<OperationExecutionManager>,
}

impl App {
    /// Wires everything from the environment; fails if `OPENAI_API_KEY` is missing.
    pub fn initialize() -> Result<Self, PluginError> {
        let settings = Settings::from_env();
        let logger = Logger::new("openplugin");
        let llm: Arc<dyn ChatCompletionService> =
            Arc::new(OpenAiChatClient::new(logger.clone(), &settings)?);
        Self::with_llm(logger, settings, llm)
    }

    pub fn with_llm(
        logger: Logger,
        settings: Settings,
        llm: Arc<dyn ChatCompletionService>,
    ) -> Result<Self, PluginError> {
        let invoker = ApiInvoker::new(logger.clone(), &settings)?;
        let post_processor = PostProcessor::new(logger.clone(), llm);
        let operation_execution = Arc::new(OperationExecutionManager::new(
            logger.clone(),
            invoker,
            post_processor,
        ));
        Ok(Self {
            logger,
            settings,
            operation_execution,
        })
    }

    pub fn plugin_selector(
        &self,
        registry: Arc<PluginRegistry>,
        engine: Arc<dyn AgentEngine>,
    ) -> PluginSelectorManager {
        PluginSelectorManager::new(self.logger.clone(), registry, engine)
    }
}
