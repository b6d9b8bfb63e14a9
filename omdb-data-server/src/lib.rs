pub mod config;
pub mod service;

pub use config::{Config, ConfigError};
pub use service::{AppState, build_router, create_app_state};
