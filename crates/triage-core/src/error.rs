//! Error taxonomy for the triage core.
//!
//! Every variant is a programming-contract violation surfaced to the
//! caller: the presentation layer is expected to sequence operations
//! correctly, and the core detects and refuses anything else rather
//! than silently misbehaving. Nothing here is retryable.

use crate::catalog::{CompanyId, CustomerId};
use crate::session::{StageKind, WorkflowPhase};

/// Errors produced by the triage core.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("unknown customer: {0}")]
    UnknownCustomer(CustomerId),

    #[error("unknown company in working set: {0}")]
    UnknownCompany(CompanyId),

    #[error("no active session; select a customer first")]
    NoActiveSession,

    #[error("stage {stage} is already running")]
    StageBusy { stage: StageKind },

    #[error("stage {stage} requires phase {required}, current phase is {actual}")]
    StageOrder {
        stage: StageKind,
        required: WorkflowPhase,
        actual: WorkflowPhase,
    },

    #[error("review is not open in phase {0}")]
    ReviewNotOpen(WorkflowPhase),

    #[error("tailored score not yet assigned for company {0}")]
    TailoredScoreMissing(CompanyId),

    #[error("cannot aggregate a report over an empty approved set")]
    EmptyApprovedSet,

    #[error("report not available: workflow is not finalized (phase {0})")]
    NotFinalized(WorkflowPhase),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for triage core operations.
pub type Result<T> = std::result::Result<T, TriageError>;
