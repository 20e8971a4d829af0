//! Error taxonomy for the data model, config graph, and catalog loader.
//!
//! Each enum corresponds to one of the error "kinds" (categories, not type
//! names) enumerated in the orchestration engine's error handling design:
//! configuration, graph, and catalog.

use thiserror::Error;

/// Configuration-validation errors — raised while parsing or validating a
/// single [`crate::model::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid lava_version {0:?}: {1}")]
    InvalidVersion(String, #[source] semver::Error),

    #[error("config has no checktype_urls")]
    MissingCatalogUrls,

    #[error("config has no targets")]
    MissingTargets,

    #[error("target #{index} has an empty identifier")]
    EmptyIdentifier { index: usize },

    #[error("unknown asset type {0:?}")]
    UnknownAssetType(String),

    #[error("invalid severity {0:?}")]
    InvalidSeverity(String),

    #[error("invalid pull policy {0:?}")]
    InvalidPullPolicy(String),

    #[error("invalid report format {0:?}")]
    InvalidFormat(String),

    #[error("invalid exclusion expiration {0:?}, expected YYYY/MM/DD")]
    InvalidExpiration(String),

    #[error("invalid exclusion pattern {0:?}: {1}")]
    InvalidExclusionPattern(String, #[source] regex::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Config-graph errors — raised while loading and resolving a
/// [`crate::graph::ConfigGraph`].
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("cycle detected: {0}")]
    Cycle(String),

    #[error("fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: lava_fetch::FetchError,
    },

    #[error("invalid config at {url}: {source}")]
    InvalidConfig {
        url: String,
        #[source]
        source: ConfigError,
    },

    #[error("unknown vertex {0:?}")]
    UnknownVertex(String),
}

/// Catalog-loading errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed catalog at {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("fetch failed for {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: lava_fetch::FetchError,
    },

    #[error("checktype {checktype:?} has a non-string required_vars entry")]
    InvalidRequiredVar { checktype: String },
}
