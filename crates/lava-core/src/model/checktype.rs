//! Checktypes: the catalog entries describing runnable checks.

use serde::{Deserialize, Serialize};

use super::asset_type::AssetType;

fn default_timeout_seconds() -> u64 {
    600
}

/// One entry in a catalog — the static description of a runnable check.
///
/// Field names follow the data model (`accepted_asset_types`,
/// `default_options`, `timeout_seconds`); the catalog wire format uses
/// shorter names (`assets`, `options`, `timeout`), bridged here with
/// `#[serde(rename)]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Checktype {
    pub name: String,

    pub image: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, rename = "assets")]
    pub accepted_asset_types: Vec<AssetType>,

    #[serde(default)]
    pub required_vars: Vec<String>,

    #[serde(default, rename = "options")]
    pub default_options: serde_json::Map<String, serde_json::Value>,

    #[serde(default = "default_timeout_seconds", rename = "timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub run_on_discovery: bool,

    #[serde(default)]
    pub qps_limit: Option<f64>,
}

impl Checktype {
    /// Whether this checktype declares `asset_type` among its accepted
    /// types. `Path` targets are checked against their
    /// [`AssetType::vulcan_mapping`], not against `Path` itself.
    pub fn accepts(&self, asset_type: AssetType) -> bool {
        self.accepted_asset_types
            .contains(&asset_type.vulcan_mapping())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Checktype {
        Checktype {
            name: "vulcan-nessus".into(),
            image: "registry.example.com/vulcan-nessus:latest".into(),
            description: String::new(),
            accepted_asset_types: vec![AssetType::IP, AssetType::Hostname],
            required_vars: vec!["NESSUS_USER".into()],
            default_options: serde_json::Map::new(),
            timeout_seconds: 600,
            run_on_discovery: false,
            qps_limit: None,
        }
    }

    #[test]
    fn accepts_declared_type() {
        assert!(sample().accepts(AssetType::IP));
        assert!(!sample().accepts(AssetType::DomainName));
    }

    #[test]
    fn accepts_path_via_vulcan_mapping() {
        let mut c = sample();
        c.accepted_asset_types = vec![AssetType::GitRepository];
        assert!(c.accepts(AssetType::Path));
    }

    #[test]
    fn deserialize_applies_default_timeout() {
        let json = r#"{"name": "trivy", "image": "x", "assets": ["IP"]}"#;
        let c: Checktype = serde_json::from_str(json).unwrap();
        assert_eq!(c.timeout_seconds, 600);
        assert!(!c.run_on_discovery);
    }

    #[test]
    fn deserialize_uses_wire_names() {
        let json = r#"{"name": "trivy", "image": "x", "assets": ["IP"], "timeout": 30, "options": {"depth": 1}}"#;
        let c: Checktype = serde_json::from_str(json).unwrap();
        assert_eq!(c.timeout_seconds, 30);
        assert_eq!(c.default_options.get("depth").unwrap(), 1);
    }

    #[test]
    fn rejects_unknown_field() {
        let json = r#"{"name": "trivy", "image": "x", "bogus": true}"#;
        assert!(serde_json::from_str::<Checktype>(json).is_err());
    }
}
