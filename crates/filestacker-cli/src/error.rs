use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] filestacker_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("File ID cannot be empty")]
    EmptyFileId,
    #[error("File not found for id/prefix: {0}")]
    FileNotFound(String),
    #[error("{0}")]
    AmbiguousFileId(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Profile '{0}' is not signed in. Run `filestacker auth login --email <email> --password <password>`.")]
    NotSignedIn(String),
    /// The failure was already shown to the user as a notification.
    #[error("Command failed")]
    Reported,
}
