use thiserror::Error;

use crate::helpers::http_client::HttpClientError;

/// Errors that end a connector session
#[derive(Debug, Clone, Error)]
pub enum ConnectorError {
    /// The connector is missing something it needs to connect (endpoint, credential)
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Http(#[from] HttpClientError),

    /// The player answered with something that could not be decoded
    #[error("Invalid response from player: {0}")]
    Protocol(String),
}

impl ConnectorError {
    /// Ordinary shutdown requested by the caller, not a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ConnectorError::Http(HttpClientError::Cancelled))
    }

    /// A single operation timed out; the reader skips the tick
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnectorError::Http(HttpClientError::Timeout))
    }
}
