//! Error types for adapters.

use thiserror::Error;

/// Errors raised while talking to the upstream server or the broker.
///
/// Callers in the engine log these and degrade; they never cross a
/// component boundary.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// HTTP request failed or returned an unexpected status.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The broker rejected or did not confirm a publish.
    #[error("Broker error: {0}")]
    Broker(String),

    /// Adapter settings are unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(feature = "scada")]
impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AdapterError::Timeout
        } else if err.is_connect() {
            AdapterError::Connection(err.to_string())
        } else if err.is_decode() {
            AdapterError::Parse(err.to_string())
        } else {
            AdapterError::Http(err.to_string())
        }
    }
}

#[cfg(feature = "rabbitmq")]
impl From<lapin::Error> for AdapterError {
    fn from(err: lapin::Error) -> Self {
        AdapterError::Broker(err.to_string())
    }
}
