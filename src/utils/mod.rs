pub mod data_path;
pub mod query;
pub mod template;
pub mod text;
