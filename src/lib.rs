pub mod app;
pub mod config;
pub mod constants;
pub mod errors;
pub mod managers;
pub mod models;
pub mod services;
pub mod utils;
