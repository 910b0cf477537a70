//! Error types for the flock environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Step rate outside the accepted range
    #[error("Invalid step rate: {0}")]
    InvalidRate(String),

    /// Driver control channel closed (driver dropped or cancelled)
    #[error("Driver channel closed: {0}")]
    ChannelClosed(String),
}

impl EnvError {
    /// Creates an invalid-rate error.
    pub fn invalid_rate(msg: impl Into<String>) -> Self {
        Self::InvalidRate(msg.into())
    }

    /// Creates a channel-closed error.
    pub fn closed(what: impl std::fmt::Display) -> Self {
        Self::ChannelClosed(what.to_string())
    }
}
