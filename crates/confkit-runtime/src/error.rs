//! Runtime error types.

use confkit_core::{EnvError, StoreError};
use thiserror::Error;

/// Errors returned by the composite load operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading, creating or decoding the configuration file failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Overriding a field from the environment failed.
    #[error(transparent)]
    Env(#[from] EnvError),
}

impl ConfigError {
    /// Returns `true` if the file step succeeded and the overlay failed.
    pub fn is_env(&self) -> bool {
        matches!(self, Self::Env(_))
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
