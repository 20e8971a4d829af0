//! Errors raised by the report store, agent driver, and engine facade.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportStoreError {
    #[error("failed to parse uploaded report for check {check_id}: {source}")]
    MalformedReport {
        check_id: uuid::Uuid,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown upload kind {0:?}")]
    UnknownKind(String),
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent exited with code {0}")]
    ExitCode(i32),

    #[error(transparent)]
    Runtime(#[from] lava_runtime::RuntimeError),

    #[error(transparent)]
    TargetServer(#[from] lava_targetserver::TargetServerError),

    #[error(transparent)]
    Docker(#[from] bollard::errors::Error),

    #[error(transparent)]
    ReportStore(#[from] ReportStoreError),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] lava_core::ConfigError),

    #[error(transparent)]
    Graph(#[from] lava_core::GraphError),

    #[error(transparent)]
    Catalog(#[from] lava_core::CatalogError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("target {identifier:?} is unreachable: {reason}")]
    UnreachableTarget { identifier: String, reason: String },
}
