//! Error types for the command-line front end.

use std::io;
use std::path::PathBuf;

use ecb_client::{BadgeError, ConfigError};
use ecb_image::ImageError;
use ecb_protocol::ProtocolError;
use thiserror::Error;

/// Errors reported by `ecb`.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Badge(#[from] BadgeError),

    #[error("image: {0}")]
    Image(#[from] ImageError),

    #[error("{}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("output: {0}")]
    Output(#[from] io::Error),

    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<ProtocolError> for CliError {
    fn from(e: ProtocolError) -> Self {
        CliError::Argument(e.to_string())
    }
}

impl CliError {
    /// Process exit status: 2 for bad arguments, 10 plus the error code for
    /// badge failures, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Argument(_) => 2,
            CliError::Badge(e) => 10 + i32::from(e.kind().code()),
            _ => 1,
        }
    }
}
