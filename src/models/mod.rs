mod execution;
mod plugin;
mod selection;

pub use execution::{payload_text, ExecutionResponse, ResolvedCallParams, TokenUsage};
pub use plugin::{Plugin, PluginRegistry};
pub use selection::{
    AgentOutcome, AgentRun, AgentStep, Message, PluginInvocation, SelectionResult,
};
