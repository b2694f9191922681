//! Error types for filestacker-core

use thiserror::Error;

/// Result type alias using filestacker-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in filestacker-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced a response (DNS, connect, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with an error status.
    ///
    /// `message` is already the human-readable text extracted from the body,
    /// so it is displayed verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A success response whose body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid input rejected before any request was made
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No active session
    #[error("Not logged in")]
    NotAuthenticated,

    /// Another action is already running for this file
    #[error("An action is already in progress for file {0}")]
    ActionInProgress(String),

    /// An upload batch stopped at the first failing file
    #[error("Failed to upload {filename}: {source}")]
    UploadAborted {
        filename: String,
        completed: usize,
        #[source]
        source: Box<Error>,
    },

    /// Session mirror storage error
    #[error("Session storage error: {0}")]
    SessionStore(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// HTTP status carried by backend errors.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend rejected the request for lack of a valid session.
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
            || matches!(self.status(), Some(401 | 403))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::InvalidResponse(error.to_string())
        } else {
            Self::Network(error.to_string())
        }
    }
}
