use crate::constants::{network, retry};
use crate::errors::PluginError;

#[derive(Debug, Clone)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub api_timeout_ms: u64,
    pub llm_timeout_ms: u64,
    pub api_max_attempts: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: network::DEFAULT_OPENAI_BASE_URL.to_string(),
            api_timeout_ms: network::TIMEOUT_API_REQUEST_MS,
            llm_timeout_ms: network::TIMEOUT_LLM_REQUEST_MS,
            api_max_attempts: retry::MAX_ATTEMPTS,
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Settings::default();
        Self {
            openai_api_key: read_non_empty("OPENAI_API_KEY"),
            openai_base_url: read_non_empty("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.openai_base_url),
            api_timeout_ms: read_positive_int("OPENPLUGIN_API_TIMEOUT_MS")
                .unwrap_or(defaults.api_timeout_ms),
            llm_timeout_ms: read_positive_int("OPENPLUGIN_LLM_TIMEOUT_MS")
                .unwrap_or(defaults.llm_timeout_ms),
            api_max_attempts: read_positive_int("OPENPLUGIN_API_MAX_ATTEMPTS")
                .map(|v| v as usize)
                .unwrap_or(defaults.api_max_attempts),
        }
    }

    pub fn require_openai_api_key(&self) -> Result<&str, PluginError> {
        self.openai_api_key.as_deref().ok_or_else(|| {
            PluginError::invalid_params("OPENAI_API_KEY is not set")
                .with_hint("Export OPENAI_API_KEY before running enrichment stages.")
        })
    }
}

fn read_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn read_positive_int(key: &str) -> Option<u64> {
    read_non_empty(key)
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
}
