//! Exclusion matching, severity filtering, summary counts, and exit-code
//! derivation — the non-rendering half of the report writer.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use lava_core::{CheckReport, CheckStatus, Exclusion, ReportConfig, Severity, Vulnerability};
use serde::Serialize;
use uuid::Uuid;

use crate::error::WriterError;

/// One top-level vulnerability annotated with the exclusion/display
/// decisions made for it.
#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedVulnerability {
    pub check_id: Uuid,
    pub checktype_name: String,
    pub target: String,
    pub severity: Severity,
    pub excluded: bool,
    pub shown: bool,
    pub matching_exclusion: Option<usize>,
    #[serde(flatten)]
    pub vulnerability: Vulnerability,
}

/// The full evaluated result of one scan, ready for rendering.
#[derive(Debug, Clone)]
pub struct ReportResult {
    pub entries: Vec<AnnotatedVulnerability>,
    pub stale_exclusions: Vec<usize>,
    pub summary: BTreeMap<Severity, usize>,
    pub excluded_count: usize,
    pub exit_code: i32,
}

/// Evaluate every check's reports against the configured exclusions and
/// severity thresholds, per spec.md §4.7.
pub fn evaluate(
    reports: &HashMap<Uuid, CheckReport>,
    report_config: &ReportConfig,
    today: NaiveDate,
) -> Result<ReportResult, WriterError> {
    let mut entries = Vec::new();
    let mut touched_exclusions: HashSet<usize> = HashSet::new();

    for report in reports.values() {
        for vuln in &report.vulnerabilities {
            let matches = matching_exclusions(&report_config.exclusions, &report.target, vuln, today)?;
            touched_exclusions.extend(matches.iter().copied());
            let excluded = !matches.is_empty();
            entries.push(AnnotatedVulnerability {
                check_id: report.check_id,
                checktype_name: report.checktype_name.clone(),
                target: report.target.clone(),
                severity: Severity::from_score(vuln.score),
                excluded,
                shown: false,
                matching_exclusion: matches.first().copied(),
                vulnerability: vuln.clone(),
            });
        }
    }

    let stale_exclusions: Vec<usize> = (0..report_config.exclusions.len())
        .filter(|i| !touched_exclusions.contains(i))
        .collect();

    // Stable sort by descending severity; `sort_by` is stable, so ties keep
    // the order entries were collected in.
    entries.sort_by(|a, b| b.severity.cmp(&a.severity));

    let show_severity = report_config.effective_show_severity();
    for entry in &mut entries {
        entry.shown = !entry.excluded && entry.severity >= show_severity;
    }

    let mut summary = BTreeMap::new();
    let mut excluded_count = 0;
    for entry in &entries {
        if entry.excluded {
            excluded_count += 1;
        } else {
            *summary.entry(entry.severity).or_insert(0) += 1;
        }
    }

    let any_unfinished = reports.values().any(|r| r.status != CheckStatus::Finished);
    let exit_code = derive_exit_code(
        any_unfinished,
        report_config.error_on_stale_exclusions.unwrap_or(false) && !stale_exclusions.is_empty(),
        &summary,
        report_config.effective_severity(),
    );

    Ok(ReportResult {
        entries,
        stale_exclusions,
        summary,
        excluded_count,
        exit_code,
    })
}

/// All exclusion indices that match `vuln` found for `target`. An
/// exclusion past its expiration never matches anything (property 9).
fn matching_exclusions(
    exclusions: &[Exclusion],
    target: &str,
    vuln: &Vulnerability,
    today: NaiveDate,
) -> Result<Vec<usize>, WriterError> {
    let resource_candidates = [
        vuln.affected_resource.as_str(),
        vuln.affected_resource_string.as_str(),
    ];
    let mut matches = Vec::new();
    for (i, exclusion) in exclusions.iter().enumerate() {
        if exclusion.is_stale(today)? {
            continue;
        }
        if exclusion.matches(target, &resource_candidates, &vuln.summary, &vuln.fingerprint)? {
            matches.push(i);
        }
    }
    Ok(matches)
}

/// `0 | 3 | 4 | 100..=104`, per spec.md's exit-code table.
fn derive_exit_code(
    any_unfinished: bool,
    stale_exclusions_and_configured_to_error: bool,
    summary: &BTreeMap<Severity, usize>,
    threshold: Severity,
) -> i32 {
    if any_unfinished {
        return 3;
    }
    if stale_exclusions_and_configured_to_error {
        return 4;
    }
    for severity in Severity::ALL.iter().rev() {
        if *severity < threshold {
            break;
        }
        if summary.get(severity).copied().unwrap_or(0) > 0 {
            return 100 + (*severity as i32 - Severity::Info as i32);
        }
    }
    0
}
