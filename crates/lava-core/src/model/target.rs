//! Scan targets.

use serde::{Deserialize, Serialize};

use super::asset_type::AssetType;
use crate::error::ConfigError;

/// `{identifier, asset_type, options}` — one thing to scan.
///
/// A target is identified, for deduplication purposes, by the pair
/// `(identifier, asset_type)` — see [`Target::key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    pub identifier: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    #[serde(default)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

impl Target {
    pub fn new(identifier: impl Into<String>, asset_type: AssetType) -> Self {
        Self {
            identifier: identifier.into(),
            asset_type,
            options: serde_json::Map::new(),
        }
    }

    /// The `(identifier, asset_type)` pair used to dedup targets.
    pub fn key(&self) -> (String, AssetType) {
        (self.identifier.clone(), self.asset_type)
    }

    /// Validate the non-empty-identifier invariant. `asset_type` is always
    /// valid by construction (it's a closed enum), so the only thing left
    /// to check here is the identifier.
    pub fn validate(&self, index: usize) -> Result<(), ConfigError> {
        if self.identifier.trim().is_empty() {
            return Err(ConfigError::EmptyIdentifier { index });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_identifier() {
        let t = Target::new("", AssetType::IP);
        assert!(matches!(
            t.validate(0),
            Err(ConfigError::EmptyIdentifier { index: 0 })
        ));
    }

    #[test]
    fn accepts_non_empty_identifier() {
        let t = Target::new("10.0.0.1", AssetType::IP);
        assert!(t.validate(0).is_ok());
    }

    #[test]
    fn key_ignores_options() {
        let mut a = Target::new("x", AssetType::Hostname);
        let mut b = a.clone();
        b.options.insert("foo".into(), serde_json::json!(1));
        assert_eq!(a.key(), b.key());
        a.identifier = "y".into();
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn deserializes_yaml_shape() {
        let yaml = "identifier: example.com\ntype: DomainName\noptions:\n  depth: 2\n";
        let t: Target = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(t.identifier, "example.com");
        assert_eq!(t.asset_type, AssetType::DomainName);
        assert_eq!(t.options.get("depth").unwrap(), 2);
    }
}
