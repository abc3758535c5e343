use std::time::Duration;

use thiserror::Error;

/// Failure below HTTP: connect, I/O, TLS, body read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport failure: {0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError(e.to_string())
    }
}

/// Classified outcome of a failed exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("HTTP {status}{}", detail(.message))]
    Http {
        status: u16,
        message: Option<String>,
    },

    /// Served locally; the network was not touched.
    #[error("circuit open; request not sent")]
    CircuitOpen,
}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self {
        ClientError::Transport(e.0)
    }
}

fn detail(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

pub type ClientResult<T> = Result<T, ClientError>;
