//! Build error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a build run.
///
/// Every variant is fatal; the caller re-runs the whole pipeline after
/// fixing the input.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error at `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transform `{name}` failed")]
    Transform {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
