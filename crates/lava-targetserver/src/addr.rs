//! `get_target_addr`: resolve a target identifier to a `host:port` pair
//! using scheme defaults, falling back to Git's SCP-like syntax.

use once_cell::sync::Lazy;
use regex::Regex;

/// `user@host:path` (no `://`), Git's scp-like shorthand for
/// `ssh://user@host/path`.
static SCP_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:([^@/]+)@)?([^:/]+):(.+)$").unwrap());

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "https" => Some(443),
        "http" => Some(80),
        "git" => Some(9418),
        "ssh" => Some(22),
        _ => None,
    }
}

/// Resolve `identifier` to a `(host, port)` pair.
///
/// - A URL with a recognized scheme (`https`, `http`, `git`, `ssh`) uses its
///   explicit port, or the scheme's default.
/// - A URL with an unrecognized scheme resolves to `(host, None)`.
/// - Git's SCP-like syntax (`user@host:path`, no `://`) is treated as
///   `ssh://user@host/path` — port 22.
/// - Anything else is treated as a bare host.
pub fn get_target_addr(identifier: &str) -> (String, Option<u16>) {
    if let Ok(parsed) = url::Url::parse(identifier) {
        if let Some(host) = parsed.host_str() {
            let port = parsed.port().or_else(|| default_port(parsed.scheme()));
            return (host.to_string(), port);
        }
    }

    if !identifier.contains("://") {
        if let Some(caps) = SCP_LIKE.captures(identifier) {
            let host = caps.get(2).unwrap().as_str();
            return (host.to_string(), Some(22));
        }
    }

    (identifier.to_string(), None)
}
