//! `${NAME}`-style environment variable expansion for raw config/catalog
//! text, applied before YAML/JSON parsing.

use once_cell::sync::Lazy;
use regex::Regex;

static VAR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Replace every `${NAME}` occurrence in `text` with `lookup(NAME)`;
/// variables for which `lookup` returns `None` are replaced with the empty
/// string.
pub fn expand(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    VAR_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            lookup(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}
