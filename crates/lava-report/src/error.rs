//! Errors raised while evaluating and rendering a finished scan.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("invalid exclusion pattern: {0}")]
    Exclusion(#[from] lava_core::ConfigError),

    #[error("failed to create output file {path:?}: {source}")]
    OutputCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write output file {path:?}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render report as JSON: {0}")]
    Encode(#[from] serde_json::Error),
}
