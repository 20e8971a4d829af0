//! Matrix expansion (C4): deduplicated targets × catalog → checks.

use uuid::Uuid;

use crate::error::CatalogError;
use crate::model::{Catalog, Check, Job, Target};

/// Deduplicate `targets` on `(identifier, asset_type)`, preserving the
/// first occurrence's options for each key.
pub fn dedup_targets(targets: &[Target]) -> Vec<&Target> {
    let mut seen = std::collections::HashSet::new();
    let mut result = Vec::new();
    for target in targets {
        if seen.insert(target.key()) {
            result.push(target);
        }
    }
    result
}

/// Expand the deduplicated target set against every checktype in `catalog`
/// that accepts the target's (Vulcan-mapped) asset type, emitting one
/// [`Check`] per accepting pair. Each check gets a fresh UUID v4 id.
///
/// Options are merged `checktype.default_options ⊕ target.options`, with
/// target-specified keys taking precedence.
pub fn expand(targets: &[Target], catalog: &Catalog) -> Vec<Check> {
    let unique = dedup_targets(targets);
    let mut checks = Vec::with_capacity(unique.len() * catalog.len().max(1));
    for target in unique {
        for checktype in catalog.iter() {
            if !checktype.accepts(target.asset_type) {
                continue;
            }
            let mut options = checktype.default_options.clone();
            for (key, value) in &target.options {
                options.insert(key.clone(), value.clone());
            }
            checks.push(Check {
                check_id: Uuid::new_v4(),
                checktype_name: checktype.name.clone(),
                image: checktype.image.clone(),
                target_identifier: target.identifier.clone(),
                asset_type: target.asset_type,
                timeout_seconds: checktype.timeout_seconds,
                options,
                required_vars: checktype.required_vars.clone(),
            });
        }
    }
    checks
}

/// Expand and validate into agent-ready jobs.
pub fn expand_to_jobs(targets: &[Target], catalog: &Catalog) -> Result<Vec<Job>, CatalogError> {
    expand(targets, catalog)
        .into_iter()
        .map(Check::into_job)
        .collect()
}
