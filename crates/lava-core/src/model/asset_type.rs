//! Asset types: the category of a target's identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a [`super::target::Target`] identifier. Determines which
/// checktypes accept it.
///
/// `Path` is Lava-specific: it never appears in a checktype's
/// `accepted_asset_types` list, and is mapped to [`AssetType::GitRepository`]
/// (via [`AssetType::vulcan_mapping`]) whenever it is presented to a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    AWSAccount,
    DockerImage,
    GitRepository,
    IP,
    IPRange,
    DomainName,
    Hostname,
    WebAddress,
    Path,
}

impl AssetType {
    /// All known variants, in the order they appear in the specification.
    pub const ALL: [AssetType; 9] = [
        AssetType::AWSAccount,
        AssetType::DockerImage,
        AssetType::GitRepository,
        AssetType::IP,
        AssetType::IPRange,
        AssetType::DomainName,
        AssetType::Hostname,
        AssetType::WebAddress,
        AssetType::Path,
    ];

    /// The asset type as presented to a checktype's `accepted_asset_types`.
    /// `Path` maps to `GitRepository`; every other variant maps to itself.
    pub fn vulcan_mapping(self) -> AssetType {
        match self {
            AssetType::Path => AssetType::GitRepository,
            other => other,
        }
    }

    /// Parse the wire-format name used in config/catalog files.
    pub fn parse(raw: &str) -> Option<AssetType> {
        AssetType::ALL.into_iter().find(|a| a.as_str() == raw)
    }

    /// The wire-format name (identical to the `Debug`/variant name).
    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::AWSAccount => "AWSAccount",
            AssetType::DockerImage => "DockerImage",
            AssetType::GitRepository => "GitRepository",
            AssetType::IP => "IP",
            AssetType::IPRange => "IPRange",
            AssetType::DomainName => "DomainName",
            AssetType::Hostname => "Hostname",
            AssetType::WebAddress => "WebAddress",
            AssetType::Path => "Path",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_maps_to_git_repository() {
        assert_eq!(AssetType::Path.vulcan_mapping(), AssetType::GitRepository);
    }

    #[test]
    fn non_path_maps_to_itself() {
        assert_eq!(AssetType::IP.vulcan_mapping(), AssetType::IP);
        assert_eq!(
            AssetType::DockerImage.vulcan_mapping(),
            AssetType::DockerImage
        );
    }

    #[test]
    fn parse_round_trips_through_as_str() {
        for a in AssetType::ALL {
            assert_eq!(AssetType::parse(a.as_str()), Some(a));
        }
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(AssetType::parse("Spaceship"), None);
    }

    #[test]
    fn serde_round_trip() {
        for a in AssetType::ALL {
            let json = serde_json::to_string(&a).unwrap();
            let back: AssetType = serde_json::from_str(&json).unwrap();
            assert_eq!(a, back);
        }
    }
}
