//! Configuration module
//!
//! This module provides:
//! - Configuration types (`AppConfig`, `ApiConfig`, `FeedConfig`, `SessionConfig`)
//! - YAML loading functionality (`load_config`)
//! - Defaults and environment overrides (`constants`)
//! - Logging initialisation (`init_logging`)

pub mod constants;
mod loader;
pub mod logging;
mod types;

// Re-export types
pub use types::{ApiConfig, AppConfig, FeedConfig, SessionConfig};

// Re-export loader functions
pub use loader::{load_config, load_config_from_str};

// Re-export logging functions
pub use logging::{init_logging, sanitize, LoggingConfig, SanitizedValue};
