//! Error types for `ClawHQ` core library.

use thiserror::Error;

/// Result type alias using `ClawHQ` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `ClawHQ` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
