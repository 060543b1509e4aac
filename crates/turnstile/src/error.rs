use std::path::PathBuf;

use thiserror::Error;
use turnstile_spec_parser::ParseError;

/// Failures while building an interposer. Always fatal to construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid contract: {0}")]
    Contract(#[from] ParseError),

    #[error("cannot merge options: {0}")]
    Merge(String),

    #[error("invalid options document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A response sink could not accept more output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("client connection closed")]
    Closed,

    #[error("write failed: {0}")]
    Io(String),
}

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError::Io(err.to_string())
    }
}
