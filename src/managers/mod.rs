pub mod operation_execution;
pub mod plugin_selector;
