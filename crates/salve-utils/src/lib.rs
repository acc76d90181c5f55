//! # salve utilities
//!
//! Shared utilities for the salve workspace: logging infrastructure built on
//! `tracing`, configured from the environment.

pub mod logging;

// Re-export commonly used logging functions for convenience
pub use logging::{init_logging, init_logging_with_level, init_with_config, LogConfig, LogFormat, LogLevel, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
