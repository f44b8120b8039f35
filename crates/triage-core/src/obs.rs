//! Structured observability hooks for workflow lifecycle events.
//!
//! Emission functions for the key transitions: session start, stage
//! start/completion, stale-completion drops, review decisions, and
//! finalization. Events are emitted at `info!` level and honor the
//! `RUST_LOG` filter configured through [`crate::telemetry`].

use tracing::{info, warn};

use crate::catalog::{CompanyId, CustomerId};
use crate::session::StageKind;

/// Emit event: a customer session started (prior state discarded).
pub fn emit_session_started(customer_id: CustomerId, token: &str, catalog_size: usize) {
    info!(
        event = "session.started",
        customer_id = customer_id,
        token = %token,
        catalog_size = catalog_size,
    );
}

/// Emit event: a ranking stage entered its latency window.
pub fn emit_stage_started(stage: StageKind, customer_id: CustomerId) {
    info!(event = "stage.started", stage = %stage, customer_id = customer_id);
}

/// Emit event: a ranking stage committed its narrowed working set.
pub fn emit_stage_completed(stage: StageKind, customer_id: CustomerId, kept: usize) {
    info!(
        event = "stage.completed",
        stage = %stage,
        customer_id = customer_id,
        kept = kept,
    );
}

/// Emit event: a delayed completion arrived for a session that no
/// longer exists and was dropped.
pub fn emit_stale_completion_dropped(stage: &str, token: &str) {
    warn!(event = "session.stale_completion_dropped", stage = %stage, token = %token);
}

/// Emit event: a company was approved by the operator.
pub fn emit_company_approved(customer_id: CustomerId, company_id: CompanyId) {
    info!(
        event = "review.approved",
        customer_id = customer_id,
        company_id = company_id,
    );
}

/// Emit event: a company rejection was committed after its removal window.
pub fn emit_company_rejected(customer_id: CustomerId, company_id: CompanyId) {
    info!(
        event = "review.rejected",
        customer_id = customer_id,
        company_id = company_id,
    );
}

/// Emit event: review completed and the report was finalized.
pub fn emit_review_finalized(customer_id: CustomerId, approved: usize, average: u8) {
    info!(
        event = "review.finalized",
        customer_id = customer_id,
        approved = approved,
        average_compatibility = average,
    );
}
