use thiserror::Error;

use crate::client::ClientError;

/// Failure surfaced by a dispatch. Never fatal: the game keeps its last known
/// state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("request timed out")]
    NetworkTimeout,

    #[error("network error: {0}")]
    TransportFailure(String),

    #[error("server returned HTTP {status}{}", detail(.message))]
    HttpError {
        status: u16,
        message: Option<String>,
    },

    /// The server replied but reported an error in the body.
    #[error("{0}")]
    ApplicationError(String),

    #[error("server unreachable; playing offline")]
    CircuitOpenFallback,
}

impl From<ClientError> for GameError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Timeout(_) => GameError::NetworkTimeout,
            ClientError::Transport(msg) => GameError::TransportFailure(msg),
            // The server explains its 4xx/5xx rejections in an `error` field.
            ClientError::Http {
                message: Some(msg), ..
            } => GameError::ApplicationError(msg),
            ClientError::Http { status, message } => GameError::HttpError { status, message },
            ClientError::CircuitOpen => GameError::CircuitOpenFallback,
        }
    }
}

fn detail(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}
