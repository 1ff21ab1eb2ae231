//! Error types for the chat client.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single round trip to the query service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Any reply other than 200 OK.
    #[error("server returned {0}")]
    Status(StatusCode),

    /// Connection failures and timeouts.
    #[error("{0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Decode(String),
}

/// Errors that end the chat loop.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] ClientError),

    #[error("render error: {0}")]
    Render(#[from] std::io::Error),
}
