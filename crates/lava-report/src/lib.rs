//! Report writer: evaluates a finished scan's reports against exclusions
//! and severity thresholds, renders the result, and derives the process
//! exit code, per spec.md §4.7 and §6.

pub mod error;
pub mod evaluate;
pub mod metrics_sink;
pub mod printer;

pub use error::WriterError;
pub use evaluate::{evaluate, AnnotatedVulnerability, ReportResult};
pub use metrics_sink::{write_atomically, MetricsSnapshot};
pub use printer::{render_full_json, render_human, render_json, write_output};
