//! Minimal OCI distribution client: enough to pull a manifest and the first
//! non-empty-title artifact layer referenced by an `oci://host/repo:tag` URL.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;

#[derive(Debug, Clone)]
struct OciRef {
    host: String,
    repo: String,
    reference: String,
}

/// Parse `oci://host/repo:tag` (or `oci://host/repo@sha256:...`).
fn parse_oci_ref(raw: &str) -> Result<OciRef, FetchError> {
    let rest = raw
        .strip_prefix("oci://")
        .ok_or_else(|| FetchError::OciMalformed(raw.to_string(), "missing oci:// prefix".into()))?;

    let (host, path) = rest
        .split_once('/')
        .ok_or_else(|| FetchError::OciMalformed(raw.to_string(), "missing repository path".into()))?;

    let (repo, reference) = if let Some((repo, digest)) = path.split_once('@') {
        (repo.to_string(), digest.to_string())
    } else if let Some(idx) = path.rfind(':') {
        // Guard against a ':' that is part of a port-carrying host repeated in
        // the path (not expected, but keep the split unambiguous).
        (path[..idx].to_string(), path[idx + 1..].to_string())
    } else {
        (path.to_string(), "latest".to_string())
    };

    Ok(OciRef {
        host: host.to_string(),
        repo,
        reference,
    })
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    layers: Vec<Layer>,
}

#[derive(Debug, Deserialize)]
struct Layer {
    #[serde(rename = "mediaType")]
    #[allow(dead_code)]
    media_type: String,
    digest: String,
    #[serde(default)]
    annotations: HashMap<String, String>,
}

const TITLE_ANNOTATION: &str = "org.opencontainers.image.title";

/// Fetch the bytes of the first non-empty-title layer of an OCI artifact.
pub async fn fetch_oci(client: &reqwest::Client, raw: &str) -> Result<Vec<u8>, FetchError> {
    let oci_ref = parse_oci_ref(raw)?;
    let base = format!("https://{}/v2/{}", oci_ref.host, oci_ref.repo);

    let manifest_url = format!("{base}/manifests/{}", oci_ref.reference);
    let manifest_bytes = get_with_bearer_retry(client, &manifest_url, ACCEPT_MANIFEST).await?;

    let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
        .map_err(|e| FetchError::OciMalformed(raw.to_string(), e.to_string()))?;

    let layer = manifest
        .layers
        .iter()
        .find(|l| l.annotations.get(TITLE_ANNOTATION).is_some_and(|t| !t.is_empty()))
        .ok_or_else(|| FetchError::OciNoArtifactLayer(raw.to_string()))?;

    debug!(digest = %layer.digest, "fetching OCI artifact layer");
    let blob_url = format!("{base}/blobs/{}", layer.digest);
    get_with_bearer_retry(client, &blob_url, "application/octet-stream").await
}

const ACCEPT_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json, application/vnd.docker.distribution.manifest.v2+json";

/// GET `url`; on a 401 challenge, fetch a bearer token from the advertised
/// realm and retry once. Registries with anonymous pull never hit the retry.
async fn get_with_bearer_retry(
    client: &reqwest::Client,
    url: &str,
    accept: &str,
) -> Result<Vec<u8>, FetchError> {
    let resp = client.get(url).header("Accept", accept).send().await?;

    if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
        if let Some(challenge) = resp
            .headers()
            .get(reqwest::header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
        {
            if let Some(token_url) = bearer_token_url(challenge) {
                let token_resp = client.get(&token_url).send().await?;
                if token_resp.status().is_success() {
                    let token_body: TokenResponse = token_resp.json().await?;
                    let retried = client
                        .get(url)
                        .header("Accept", accept)
                        .bearer_auth(token_body.token())
                        .send()
                        .await?;
                    return read_ok(retried, url).await;
                }
            }
        }
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: 401,
        });
    }

    read_ok(resp, url).await
}

async fn read_ok(resp: reqwest::Response, url: &str) -> Result<Vec<u8>, FetchError> {
    if !resp.status().is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: resp.status().as_u16(),
        });
    }
    Ok(resp.bytes().await?.to_vec())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

impl TokenResponse {
    fn token(&self) -> String {
        self.token
            .clone()
            .or_else(|| self.access_token.clone())
            .unwrap_or_default()
    }
}

/// Build a token-endpoint URL from a `WWW-Authenticate: Bearer realm="...",service="...",scope="..."` header.
fn bearer_token_url(challenge: &str) -> Option<String> {
    let rest = challenge.strip_prefix("Bearer ")?;
    let mut params: HashMap<&str, String> = HashMap::new();
    for part in split_challenge_params(rest) {
        if let Some((k, v)) = part.split_once('=') {
            params.insert(k.trim(), v.trim().trim_matches('"').to_string());
        }
    }
    let realm = params.remove("realm")?;
    let mut query = Vec::new();
    if let Some(service) = params.remove("service") {
        query.push(format!("service={service}"));
    }
    if let Some(scope) = params.remove("scope") {
        query.push(format!("scope={scope}"));
    }
    if query.is_empty() {
        Some(realm)
    } else {
        Some(format!("{realm}?{}", query.join("&")))
    }
}

/// Split `k="v",k2="v2"` on commas that are outside quotes.
fn split_challenge_params(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
