use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal failure for one remote call. Cancellation is reported through the
/// same channel as any other failure, so every issued call reaches exactly one
/// terminal notification.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum WikiError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("authentication failed")]
    Auth,
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("call canceled")]
    Canceled,
}

impl WikiError {
    pub fn transport(message: impl Into<String>) -> Self {
        WikiError::Transport(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        WikiError::Malformed(message.into())
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, WikiError::Auth)
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, WikiError::Canceled)
    }
}

impl From<serde_json::Error> for WikiError {
    fn from(err: serde_json::Error) -> Self {
        WikiError::malformed(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for WikiError {
    fn from(err: std::io::Error) -> Self {
        WikiError::transport(format!("IO error: {}", err))
    }
}
