pub mod app_config;
pub mod app_env;
pub mod blob;
pub mod claim;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod tokens;
