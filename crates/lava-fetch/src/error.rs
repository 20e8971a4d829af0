//! Error taxonomy for resource fetching.

use thiserror::Error;

/// Errors raised while loading bytes from a `file`, `http(s)`, or `oci` reference.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {0:?}: {1}")]
    InvalidUrl(String, #[source] url::ParseError),

    #[error("unsupported URL scheme {scheme:?} in {url:?}")]
    UnsupportedScheme { scheme: String, url: String },

    #[error("GET {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("I/O error reading {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCI artifact at {0:?} is malformed: {1}")]
    OciMalformed(String, String),

    #[error("OCI artifact at {0:?} has no non-empty-title layer")]
    OciNoArtifactLayer(String),
}
