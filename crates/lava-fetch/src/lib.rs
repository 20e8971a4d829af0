//! Resource fetcher: loads bytes from `file` paths, `http(s)://`, and
//! `oci://` references.
//!
//! This is the leaf dependency of the catalog loader and config graph —
//! both resolve every URL they see through a single [`Fetcher`].

mod error;
mod oci;

pub use error::FetchError;

use tracing::debug;

/// Loads raw bytes from a `file`, `http(s)`, or `oci` URL (or a bare path,
/// treated as `file`).
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: reqwest::Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetcher {
    /// Build a fetcher with a shared HTTP client.
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .user_agent(concat!("lava/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Fetch the bytes referenced by `raw`, dispatching on URL scheme.
    ///
    /// A string with no `scheme://` prefix is treated as a `file` path.
    pub async fn fetch(&self, raw: &str) -> Result<Vec<u8>, FetchError> {
        match scheme_of(raw) {
            Some("file") | None => self.fetch_file(raw).await,
            Some("http") | Some("https") => self.fetch_http(raw).await,
            Some("oci") => oci::fetch_oci(&self.http, raw).await,
            Some(other) => Err(FetchError::UnsupportedScheme {
                scheme: other.to_string(),
                url: raw.to_string(),
            }),
        }
    }

    async fn fetch_file(&self, raw: &str) -> Result<Vec<u8>, FetchError> {
        let path = raw.strip_prefix("file://").unwrap_or(raw);
        debug!(path, "reading local file");
        tokio::fs::read(path)
            .await
            .map_err(|source| FetchError::Io {
                path: path.to_string(),
                source,
            })
    }

    async fn fetch_http(&self, raw: &str) -> Result<Vec<u8>, FetchError> {
        url::Url::parse(raw).map_err(|e| FetchError::InvalidUrl(raw.to_string(), e))?;
        debug!(url = raw, "fetching over HTTP");
        let resp = self.http.get(raw).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: raw.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }
}

/// Return the `scheme` prefix of a `scheme://...` string, or `None` if there
/// is no `://` separator (a bare path).
fn scheme_of(raw: &str) -> Option<&str> {
    raw.split_once("://").map(|(scheme, _)| scheme)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn scheme_of_recognizes_schemes() {
        assert_eq!(scheme_of("http://x"), Some("http"));
        assert_eq!(scheme_of("https://x"), Some("https"));
        assert_eq!(scheme_of("oci://x"), Some("oci"));
        assert_eq!(scheme_of("file:///tmp/x"), Some("file"));
        assert_eq!(scheme_of("/tmp/x"), None);
        assert_eq!(scheme_of("relative/path.yaml"), None);
    }

    #[tokio::test]
    async fn fetch_bare_path_reads_local_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"hello").unwrap();
        let fetcher = Fetcher::new();
        let bytes = fetcher.fetch(f.path().to_str().unwrap()).await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn fetch_file_scheme_reads_local_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"world").unwrap();
        let fetcher = Fetcher::new();
        let url = format!("file://{}", f.path().to_str().unwrap());
        let bytes = fetcher.fetch(&url).await.unwrap();
        assert_eq!(bytes, b"world");
    }

    #[tokio::test]
    async fn fetch_missing_file_is_io_error() {
        let fetcher = Fetcher::new();
        let err = fetcher.fetch("/no/such/file.yaml").await.unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    #[tokio::test]
    async fn fetch_unsupported_scheme_errors() {
        let fetcher = Fetcher::new();
        let err = fetcher.fetch("ftp://example.com/x").await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme { .. }));
    }
}
