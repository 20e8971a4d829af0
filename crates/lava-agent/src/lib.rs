//! Report store, agent driver, and engine facade: dispatches checks as
//! containers, collects their reports, and undoes the target server's
//! identifier rewrites before handing results to a report writer.

pub mod agent;
pub mod container;
pub mod engine;
pub mod error;
pub mod report_store;

pub use agent::{Agent, AgentSettings};
pub use engine::{Engine, EngineRun};
pub use error::{AgentError, EngineError, ReportStoreError};
pub use report_store::{ReportStore, SummaryEntry};
