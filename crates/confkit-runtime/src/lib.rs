//! Confkit Runtime - composition layer for confkit.
//!
//! This crate provides:
//! - File loading combined with environment overrides (`ConfKit`)
//! - Environment-only configuration (`load_from_env`)
//! - Logging configuration
//!
//! # Load Order
//!
//! ```text
//! defaults (Default impl) ──▶ file (created if missing) ──▶ environment
//! ```
//!
//! Each step overrides the previous one. A missing file is written from the
//! defaults; environment overrides are applied in memory only and never
//! written back.
//!
//! ```ignore
//! use confkit_runtime::ConfKit;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut config = AppConfig::default();
//!     ConfKit::new().load_or_exit_with_env(&mut config)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod loader;
pub mod logging;

// Re-exports
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfKit, load_from_env};
pub use logging::{LogFormat, LogLevel, LogOutput, LoggingBuilder, LoggingConfig};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;
