//! Portfolio Triage Core
//!
//! Deterministic deal-flow triage for a fixed prospect catalog: two
//! successive narrowing stages (broad confidence, then tailored
//! confidence), an operator-driven approve/reject review over the
//! survivors, and a scored final report.
//!
//! The presentation layer is an external collaborator: it selects a
//! customer, triggers the two stages, forwards operator decisions, and
//! renders whatever working set, review state, or report the engine
//! exposes. All sequencing contracts are enforced here — out-of-order
//! or re-entrant calls are refused, never silently absorbed.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod obs;
pub mod report;
pub mod scoring;
pub mod session;
pub mod telemetry;

pub use catalog::{Catalog, Company, CompanyId, Customer, CustomerId};
pub use config::TriageConfig;
pub use engine::{ReviewOutcome, StageOutcome, TriageEngine};
pub use error::{Result, TriageError};
pub use report::{build_report, Report, ReportEntry, ReportSummary, REPORT_STATUS};
pub use scoring::{compatibility_score, shareholder_score, INSTITUTIONAL_KEYWORDS};
pub use session::{ReviewEntry, ReviewStatus, Session, StageKind, WorkflowPhase};
pub use telemetry::init_tracing;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
