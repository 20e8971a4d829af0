//! Report exclusions: suppress matching findings, optionally until a given
//! expiration date.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One exclusion rule. All present fields must match a finding for the
/// exclusion to apply — `None` fields are wildcards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Exclusion {
    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub resource: Option<String>,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub fingerprint: Option<String>,

    #[serde(default)]
    pub description: String,

    /// `YYYY/MM/DD`. An exclusion past its expiration date is reported as
    /// stale rather than silently dropped.
    #[serde(default)]
    pub expiration: Option<String>,
}

impl Exclusion {
    /// Whether every present field on this rule matches the given finding
    /// attributes. `target` and `summary` are regex patterns matched
    /// anywhere in the corresponding value; `resource` is a regex matched
    /// against either of `resource_candidates` (a vulnerability's
    /// `affected_resource` and `affected_resource_string`); `fingerprint`
    /// is an exact-literal comparison.
    pub fn matches(
        &self,
        target: &str,
        resource_candidates: &[&str],
        summary: &str,
        fingerprint: &str,
    ) -> Result<bool, ConfigError> {
        if let Some(t) = &self.target {
            if !regex_matches(t, target)? {
                return Ok(false);
            }
        }
        if let Some(r) = &self.resource {
            let mut any = false;
            for candidate in resource_candidates {
                if regex_matches(r, candidate)? {
                    any = true;
                    break;
                }
            }
            if !any {
                return Ok(false);
            }
        }
        if let Some(s) = &self.summary {
            if !regex_matches(s, summary)? {
                return Ok(false);
            }
        }
        if let Some(f) = &self.fingerprint {
            if f != fingerprint {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Parse `expiration` and report whether it is strictly before `today`.
    pub fn is_stale(&self, today: NaiveDate) -> Result<bool, ConfigError> {
        match &self.expiration {
            None => Ok(false),
            Some(raw) => Ok(parse_expiration(raw)? < today),
        }
    }
}

fn parse_expiration(raw: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(raw, "%Y/%m/%d")
        .map_err(|_| ConfigError::InvalidExpiration(raw.to_string()))
}

fn regex_matches(pattern: &str, value: &str) -> Result<bool, ConfigError> {
    let re = Regex::new(pattern)
        .map_err(|e| ConfigError::InvalidExclusionPattern(pattern.to_string(), e))?;
    Ok(re.is_match(value))
}
