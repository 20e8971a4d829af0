//! Human and JSON rendering of an evaluated [`ReportResult`].

use std::io::Write;

use serde::Serialize;

use crate::evaluate::ReportResult;

/// `{summary, vulnerabilities, excluded_count}` — the JSON shape for both
/// the mandatory output and the optional full-report sink.
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    summary: &'a std::collections::BTreeMap<lava_core::Severity, usize>,
    excluded_count: usize,
    stale_exclusion_count: usize,
    vulnerabilities: Vec<&'a crate::evaluate::AnnotatedVulnerability>,
}

/// Render `result` as pretty JSON, one entry per *shown* vulnerability.
pub fn render_json(result: &ReportResult) -> Result<String, serde_json::Error> {
    let report = JsonReport {
        summary: &result.summary,
        excluded_count: result.excluded_count,
        stale_exclusion_count: result.stale_exclusions.len(),
        vulnerabilities: result.entries.iter().filter(|e| e.shown).collect(),
    };
    serde_json::to_string_pretty(&report)
}

/// Render every evaluated entry (shown, excluded, and below-threshold
/// alike) annotated with its disposition — the optional "full report"
/// sink spec.md describes.
pub fn render_full_json(result: &ReportResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&result.entries)
}

/// Render a short human-readable summary, one line per shown vulnerability
/// followed by a severity-count summary line.
pub fn render_human(result: &ReportResult) -> String {
    let mut out = String::new();
    for entry in result.entries.iter().filter(|e| e.shown) {
        out.push_str(&format!(
            "[{}] {} — {} ({})\n",
            entry.severity, entry.vulnerability.summary, entry.target, entry.checktype_name
        ));
    }
    out.push_str("\nSummary: ");
    let counts: Vec<String> = result
        .summary
        .iter()
        .map(|(sev, count)| format!("{sev}={count}"))
        .collect();
    if counts.is_empty() {
        out.push_str("no findings");
    } else {
        out.push_str(&counts.join(", "));
    }
    out.push('\n');
    if !result.stale_exclusions.is_empty() {
        out.push_str(&format!(
            "{} stale exclusion(s): {:?}\n",
            result.stale_exclusions.len(),
            result.stale_exclusions
        ));
    }
    out
}

/// Write `contents` to `path` (overwriting it), or to `stdout` if `path`
/// is `None`.
pub fn write_output(
    contents: &str,
    path: Option<&std::path::Path>,
) -> Result<(), crate::error::WriterError> {
    match path {
        Some(path) => {
            let mut file =
                std::fs::File::create(path).map_err(|source| crate::error::WriterError::OutputCreate {
                    path: path.to_path_buf(),
                    source,
                })?;
            file.write_all(contents.as_bytes())
                .map_err(|source| crate::error::WriterError::OutputWrite {
                    path: path.to_path_buf(),
                    source,
                })
        }
        None => {
            print!("{contents}");
            Ok(())
        }
    }
}
