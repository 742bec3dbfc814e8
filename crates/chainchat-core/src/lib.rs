//! # chainchat-core
//!
//! Ambient foundations shared by the chainchat crates: environment-driven
//! configuration, the structured logging schema, and tracing initialization.

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types at crate root
pub use config::{ChainchatConfig, LogConfig, LogFormat};
pub use error::{ConfigError, Result};
pub use logging::init_tracing;
