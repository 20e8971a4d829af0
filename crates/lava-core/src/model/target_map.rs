//! Identifier rewrites applied by the target server for reachability, and
//! undone by the engine when finalizing a report.

use uuid::Uuid;

use super::asset_type::AssetType;

/// `{old, new}` addresses for one rewritten target — e.g. `127.0.0.1:9418`
/// standing in for a `Path` target served as a Git repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrPair {
    pub old: String,
    pub new: String,
}

/// Records that a check's target identifier was rewritten so the check
/// container could reach it; exists for the lifetime of that check's
/// execution plus the post-processing that undoes the rewrite in its
/// emitted vulnerabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMap {
    pub check_id: Uuid,
    pub old_identifier: String,
    pub new_identifier: String,
    pub old_asset_type: AssetType,
    pub new_asset_type: AssetType,
    pub addrs: AddrPair,
}

impl TargetMap {
    /// Replace every occurrence of the rewritten identifier in `text` with
    /// the original one. Naive substring replacement: a rewritten
    /// identifier that is itself a substring of an unrelated value in the
    /// vulnerability text will also be replaced.
    pub fn undo_in(&self, text: &str) -> String {
        text.replace(&self.new_identifier, &self.old_identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TargetMap {
        TargetMap {
            check_id: Uuid::new_v4(),
            old_identifier: ".".into(),
            new_identifier: "127.0.0.1:9418".into(),
            old_asset_type: AssetType::Path,
            new_asset_type: AssetType::GitRepository,
            addrs: AddrPair {
                old: ".".into(),
                new: "127.0.0.1:9418".into(),
            },
        }
    }

    #[test]
    fn undo_replaces_new_with_old() {
        let tm = sample();
        let text = "cloned 127.0.0.1:9418 and found a secret";
        assert_eq!(tm.undo_in(text), "cloned . and found a secret");
    }

    #[test]
    fn undo_is_noop_without_match() {
        let tm = sample();
        assert_eq!(tm.undo_in("no mention here"), "no mention here");
    }
}
