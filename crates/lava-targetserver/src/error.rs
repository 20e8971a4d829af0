//! Errors raised while rewriting and serving local targets.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargetServerError {
    #[error("failed to bind a listener on {0}: {1}")]
    Bind(String, #[source] std::io::Error),

    #[error("failed to mirror {path:?} as a bare git repository: {source}")]
    GitMirror {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git exited with status {0}")]
    GitExitStatus(i32),

    #[error("unknown check_id {0}")]
    UnknownCheck(uuid::Uuid),

    #[error("proxy I/O error: {0}")]
    ProxyIo(#[from] std::io::Error),

    #[error(transparent)]
    Runtime(#[from] lava_runtime::RuntimeError),
}
