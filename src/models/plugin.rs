use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// An externally described HTTP API the agent may pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi_doc_url: Option<String>,
    #[serde(default)]
    pub api_endpoints: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pre_prompts: Vec<String>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            manifest_url: None,
            openapi_doc_url: None,
            api_endpoints: BTreeSet::new(),
            pre_prompts: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoints.insert(endpoint.into());
        self
    }

    pub fn with_pre_prompt(mut self, pre_prompt: impl Into<String>) -> Self {
        self.pre_prompts.push(pre_prompt.into());
        self
    }

    pub fn has_api_endpoint(&self, endpoint: &str) -> bool {
        self.api_endpoints.contains(endpoint)
    }

    pub fn plugin_pre_prompts(&self) -> String {
        self.pre_prompts.concat()
    }
}

/// Read-only set of plugins known for one request.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    plugins: Vec<Arc<Plugin>>,
}

impl PluginRegistry {
    pub fn new(plugins: Vec<Plugin>) -> Self {
        Self {
            plugins: plugins.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<Plugin>> {
        self.plugins.iter().find(|p| p.name == name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Plugin>> {
        self.plugins.iter()
    }

    pub fn pre_prompts(&self) -> String {
        self.plugins
            .iter()
            .map(|p| p.plugin_pre_prompts())
            .collect::<Vec<_>>()
            .concat()
    }
}
