//! Per-customer session state: workflow phase, working set, review
//! entries.
//!
//! A session is created when a customer is selected and replaced
//! wholesale when a different customer is selected. Every suspension
//! in the engine captures the session token before sleeping and
//! checks it afterwards, so a completion belonging to an abandoned
//! session can never touch the replacement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::catalog::{Company, CompanyId, CustomerId};
use crate::report::Report;

/// The phases of one triage workflow, advanced strictly in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Idle,
    CatalogLoaded,
    BroadRanked,
    TailoredRanked,
    Reviewing,
    Finalized,
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkflowPhase::Idle => "idle",
            WorkflowPhase::CatalogLoaded => "catalog_loaded",
            WorkflowPhase::BroadRanked => "broad_ranked",
            WorkflowPhase::TailoredRanked => "tailored_ranked",
            WorkflowPhase::Reviewing => "reviewing",
            WorkflowPhase::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// The two narrowing stages of the ranking pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    BroadRank,
    TailoredRank,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageKind::BroadRank => "broad_rank",
            StageKind::TailoredRank => "tailored_rank",
        };
        f.write_str(name)
    }
}

/// Committed review status of one company in the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// Per-company review bookkeeping.
///
/// `removing` is transient: true only while a rejection is inside its
/// removal transition window. `approved_seq` records approval order
/// so the report can break score ties deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub status: ReviewStatus,
    pub removing: bool,
    pub approved_seq: Option<u64>,
}

impl ReviewEntry {
    fn pending() -> Self {
        Self {
            status: ReviewStatus::Pending,
            removing: false,
            approved_seq: None,
        }
    }

    /// Whether the entry has reached a permanent status and left any
    /// transition window.
    pub fn is_settled(&self) -> bool {
        self.status != ReviewStatus::Pending && !self.removing
    }
}

/// Mutable state of one customer triage session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Identity token checked by every delayed completion.
    pub token: Uuid,
    pub customer_id: CustomerId,
    pub phase: WorkflowPhase,
    /// Companies surviving the stages run so far, in display order.
    pub working_set: Vec<Company>,
    /// Review bookkeeping, populated when the working set is frozen.
    pub review: HashMap<CompanyId, ReviewEntry>,
    /// The stage currently inside its latency window, if any.
    pub busy: Option<StageKind>,
    /// One-shot guard: a finalize settle window is already underway.
    pub finalizing: bool,
    /// Monotonic counter stamping approval order.
    pub approval_counter: u64,
    pub report: Option<Report>,
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// Start a fresh session over a customer's full catalog.
    pub fn new(customer_id: CustomerId, catalog_companies: &[Company], now: DateTime<Utc>) -> Self {
        Self {
            token: Uuid::new_v4(),
            customer_id,
            phase: WorkflowPhase::CatalogLoaded,
            working_set: catalog_companies.to_vec(),
            review: HashMap::new(),
            busy: None,
            finalizing: false,
            approval_counter: 0,
            report: None,
            started_at: now,
        }
    }

    /// Populate pending review entries for the frozen working set.
    pub fn open_review(&mut self) {
        self.review = self
            .working_set
            .iter()
            .map(|c| (c.id, ReviewEntry::pending()))
            .collect();
    }

    /// Completion predicate: every entry settled as approved or
    /// rejected, none pending or mid-removal, and at least one
    /// approved. An all-rejected pool never completes.
    pub fn is_fully_reviewed(&self) -> bool {
        !self.review.is_empty()
            && self.review.values().all(ReviewEntry::is_settled)
            && self
                .review
                .values()
                .any(|e| e.status == ReviewStatus::Approved)
    }

    /// Approved companies, in approval order.
    pub fn approved_in_order(&self) -> Vec<Company> {
        let mut approved: Vec<(u64, &Company)> = self
            .working_set
            .iter()
            .filter_map(|c| {
                let entry = self.review.get(&c.id)?;
                let seq = entry.approved_seq?;
                (entry.status == ReviewStatus::Approved).then_some((seq, c))
            })
            .collect();
        approved.sort_by_key(|(seq, _)| *seq);
        approved.into_iter().map(|(_, c)| c.clone()).collect()
    }
}
