pub mod invocation_extractor;
pub mod invoker;
pub mod llm_client;
pub mod logger;
pub mod post_processor;
pub mod retry;
pub mod trace_parser;
