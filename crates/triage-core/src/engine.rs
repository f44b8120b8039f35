//! The triage engine: customer selection, the two-stage ranking
//! pipeline, the operator review state machine, and finalization.
//!
//! One engine serves one operator. All session state lives behind a
//! single async mutex that is never held across a suspension: every
//! latency window (the two stages, the rejection removal window, the
//! finalize settle window) captures the session token before sleeping
//! and re-validates it afterwards. A completion that wakes up after
//! the customer has been switched finds a different token and applies
//! nothing.

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::sleep;
use uuid::Uuid;

use crate::catalog::{Catalog, Company, CompanyId, Customer, CustomerId};
use crate::config::TriageConfig;
use crate::error::{Result, TriageError};
use crate::obs;
use crate::report::{build_report, Report};
use crate::session::{ReviewEntry, ReviewStatus, Session, StageKind, WorkflowPhase};

/// Outcome of a ranking stage invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// The stage ran and committed the narrowed working set.
    Ranked { working_set: Vec<Company> },
    /// The stage had already run for this session; nothing changed.
    AlreadyRanked { working_set: Vec<Company> },
    /// The customer was switched while the stage was suspended; the
    /// late completion was dropped.
    Superseded,
}

/// Outcome of an operator review decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    Approved,
    Rejected,
    /// The company had already been approved, rejected, or was inside
    /// its removal window; nothing changed.
    AlreadyResolved,
    /// The customer was switched during the removal window; the
    /// rejection was never committed.
    Superseded,
}

/// Orchestrates the triage workflow for one operator over a static
/// catalog.
pub struct TriageEngine {
    catalog: Catalog,
    config: TriageConfig,
    state: Mutex<Option<Session>>,
}

impl TriageEngine {
    pub fn new(catalog: Catalog, config: TriageConfig) -> Self {
        Self {
            catalog,
            config,
            state: Mutex::new(None),
        }
    }

    /// Ordered customer list for presentation.
    pub fn customers(&self) -> &[Customer] {
        self.catalog.customers()
    }

    /// Select a customer, discarding all prior session state, and
    /// yield the customer's full company catalog.
    ///
    /// Any in-flight stage or removal window belonging to the previous
    /// session becomes a no-op once its suspension ends.
    pub async fn select_customer(&self, id: CustomerId) -> Result<Vec<Company>> {
        let companies = self.catalog.companies_for(id)?.to_vec();

        let mut guard = self.state.lock().await;
        let session = Session::new(id, &companies, Utc::now());
        obs::emit_session_started(id, &session.token.to_string(), companies.len());
        *guard = Some(session);
        Ok(companies)
    }

    /// Current workflow phase; `Idle` when no customer is selected.
    pub async fn phase(&self) -> WorkflowPhase {
        self.state
            .lock()
            .await
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or(WorkflowPhase::Idle)
    }

    /// The stage currently inside its latency window, if any.
    pub async fn busy_stage(&self) -> Option<StageKind> {
        self.state.lock().await.as_ref().and_then(|s| s.busy)
    }

    /// Snapshot of the current working set in display order.
    pub async fn working_set(&self) -> Result<Vec<Company>> {
        let guard = self.state.lock().await;
        let session = guard.as_ref().ok_or(TriageError::NoActiveSession)?;
        Ok(session.working_set.clone())
    }

    /// Per-company review entries in working-set order.
    pub async fn review_statuses(&self) -> Result<Vec<(CompanyId, ReviewEntry)>> {
        let guard = self.state.lock().await;
        let session = guard.as_ref().ok_or(TriageError::NoActiveSession)?;
        Ok(session
            .working_set
            .iter()
            .filter_map(|c| session.review.get(&c.id).map(|e| (c.id, *e)))
            .collect())
    }

    /// Whether every company is settled and at least one is approved.
    pub async fn is_fully_reviewed(&self) -> bool {
        self.state
            .lock()
            .await
            .as_ref()
            .is_some_and(Session::is_fully_reviewed)
    }

    /// The finalized report. Only available once the workflow has
    /// reached `Finalized`.
    pub async fn report(&self) -> Result<Report> {
        let guard = self.state.lock().await;
        let session = guard.as_ref().ok_or(TriageError::NoActiveSession)?;
        session
            .report
            .clone()
            .ok_or(TriageError::NotFinalized(session.phase))
    }

    /// Stage 1: sort the full catalog descending by broad confidence
    /// (stable) and keep the top `broad_keep`.
    ///
    /// Suspends for the configured latency before committing. Repeat
    /// invocations after completion are no-ops; invocation while the
    /// stage is suspended is refused with [`TriageError::StageBusy`].
    pub async fn run_broad_rank(&self) -> Result<StageOutcome> {
        let token = {
            let mut guard = self.state.lock().await;
            let session = guard.as_mut().ok_or(TriageError::NoActiveSession)?;
            if let Some(stage) = session.busy {
                return Err(TriageError::StageBusy { stage });
            }
            if session.phase >= WorkflowPhase::BroadRanked {
                return Ok(StageOutcome::AlreadyRanked {
                    working_set: session.working_set.clone(),
                });
            }
            session.busy = Some(StageKind::BroadRank);
            obs::emit_stage_started(StageKind::BroadRank, session.customer_id);
            session.token
        };

        sleep(self.config.broad_rank_delay).await;

        let mut guard = self.state.lock().await;
        let Some(session) = current_session(&mut guard, token, "broad_rank") else {
            return Ok(StageOutcome::Superseded);
        };

        session
            .working_set
            .sort_by(|a, b| b.confidence.cmp(&a.confidence));
        session.working_set.truncate(self.config.broad_keep);
        session.phase = WorkflowPhase::BroadRanked;
        session.busy = None;
        obs::emit_stage_completed(
            StageKind::BroadRank,
            session.customer_id,
            session.working_set.len(),
        );

        Ok(StageOutcome::Ranked {
            working_set: session.working_set.clone(),
        })
    }

    /// Stage 2: assign each surviving company its precomputed tailored
    /// score, sort descending by it (stable) and keep the top
    /// `tailored_keep`, freezing the set for review.
    ///
    /// Requires stage 1 to have completed; same busy and idempotency
    /// rules as [`Self::run_broad_rank`].
    pub async fn run_tailored_rank(&self) -> Result<StageOutcome> {
        let token = {
            let mut guard = self.state.lock().await;
            let session = guard.as_mut().ok_or(TriageError::NoActiveSession)?;
            if let Some(stage) = session.busy {
                return Err(TriageError::StageBusy { stage });
            }
            match session.phase {
                WorkflowPhase::BroadRanked => {}
                WorkflowPhase::Idle | WorkflowPhase::CatalogLoaded => {
                    return Err(TriageError::StageOrder {
                        stage: StageKind::TailoredRank,
                        required: WorkflowPhase::BroadRanked,
                        actual: session.phase,
                    });
                }
                _ => {
                    return Ok(StageOutcome::AlreadyRanked {
                        working_set: session.working_set.clone(),
                    });
                }
            }
            session.busy = Some(StageKind::TailoredRank);
            obs::emit_stage_started(StageKind::TailoredRank, session.customer_id);
            session.token
        };

        sleep(self.config.tailored_rank_delay).await;

        let mut guard = self.state.lock().await;
        let Some(session) = current_session(&mut guard, token, "tailored_rank") else {
            return Ok(StageOutcome::Superseded);
        };

        let customer_id = session.customer_id;
        for company in &mut session.working_set {
            // Precomputed upstream; the broad score stands in when the
            // catalog carries no tailored value.
            let tailored = self
                .catalog
                .tailored_score(customer_id, company.id)
                .unwrap_or(company.confidence);
            company.confidence_b = Some(tailored);
        }
        session
            .working_set
            .sort_by(|a, b| b.confidence_b.cmp(&a.confidence_b));
        session.working_set.truncate(self.config.tailored_keep);
        session.phase = WorkflowPhase::TailoredRanked;
        session.busy = None;
        session.open_review();
        obs::emit_stage_completed(
            StageKind::TailoredRank,
            session.customer_id,
            session.working_set.len(),
        );

        Ok(StageOutcome::Ranked {
            working_set: session.working_set.clone(),
        })
    }

    /// Approve a pending company. Permanent; re-invocation on a
    /// resolved company is a no-op.
    pub async fn approve(&self, id: CompanyId) -> Result<ReviewOutcome> {
        let finalize_token = {
            let mut guard = self.state.lock().await;
            let session = guard.as_mut().ok_or(TriageError::NoActiveSession)?;
            review_open(session)?;

            let seq = session.approval_counter;
            let entry = session
                .review
                .get_mut(&id)
                .ok_or(TriageError::UnknownCompany(id))?;
            if entry.status != ReviewStatus::Pending || entry.removing {
                return Ok(ReviewOutcome::AlreadyResolved);
            }
            entry.status = ReviewStatus::Approved;
            entry.approved_seq = Some(seq);
            session.approval_counter += 1;
            session.phase = WorkflowPhase::Reviewing;
            obs::emit_company_approved(session.customer_id, id);

            arm_finalize(session)
        };

        if let Some(token) = finalize_token {
            self.finalize_after_settle(token).await?;
        }
        Ok(ReviewOutcome::Approved)
    }

    /// Reject a pending company. The company enters its removal window
    /// immediately and becomes permanently rejected once the window
    /// elapses. Re-invocation while removing or rejected is a no-op.
    pub async fn reject(&self, id: CompanyId) -> Result<ReviewOutcome> {
        let token = {
            let mut guard = self.state.lock().await;
            let session = guard.as_mut().ok_or(TriageError::NoActiveSession)?;
            review_open(session)?;

            let entry = session
                .review
                .get_mut(&id)
                .ok_or(TriageError::UnknownCompany(id))?;
            if entry.status != ReviewStatus::Pending || entry.removing {
                return Ok(ReviewOutcome::AlreadyResolved);
            }
            entry.removing = true;
            session.phase = WorkflowPhase::Reviewing;
            session.token
        };

        sleep(self.config.removal_delay).await;

        let finalize_token = {
            let mut guard = self.state.lock().await;
            let Some(session) = current_session(&mut guard, token, "reject") else {
                return Ok(ReviewOutcome::Superseded);
            };

            if let Some(entry) = session.review.get_mut(&id) {
                entry.status = ReviewStatus::Rejected;
                entry.removing = false;
            }
            obs::emit_company_rejected(session.customer_id, id);

            arm_finalize(session)
        };

        if let Some(token) = finalize_token {
            self.finalize_after_settle(token).await?;
        }
        Ok(ReviewOutcome::Rejected)
    }

    /// Settle window between full review and finalization. Fires at
    /// most once per session; the `finalizing` guard was armed by the
    /// decision that completed the review.
    async fn finalize_after_settle(&self, token: Uuid) -> Result<()> {
        sleep(self.config.settle_delay).await;

        let mut guard = self.state.lock().await;
        let Some(session) = current_session(&mut guard, token, "finalize") else {
            return Ok(());
        };

        if session.phase != WorkflowPhase::Reviewing || !session.is_fully_reviewed() {
            session.finalizing = false;
            return Ok(());
        }

        let approved = session.approved_in_order();
        let report = build_report(&approved, Utc::now())?;
        obs::emit_review_finalized(
            session.customer_id,
            report.summary.entry_count,
            report.summary.average_compatibility,
        );
        session.report = Some(report);
        session.phase = WorkflowPhase::Finalized;
        session.finalizing = false;
        Ok(())
    }
}

/// Resolve the session a delayed completion belongs to, dropping the
/// completion (with a log event) when the customer has been switched.
fn current_session<'a>(
    guard: &'a mut Option<Session>,
    token: Uuid,
    stage: &str,
) -> Option<&'a mut Session> {
    match guard.as_mut() {
        Some(session) if session.token == token => Some(session),
        _ => {
            obs::emit_stale_completion_dropped(stage, &token.to_string());
            None
        }
    }
}

/// Review decisions are only valid once the working set is frozen and
/// before finalization.
fn review_open(session: &Session) -> Result<()> {
    match session.phase {
        WorkflowPhase::TailoredRanked | WorkflowPhase::Reviewing => Ok(()),
        other => Err(TriageError::ReviewNotOpen(other)),
    }
}

/// Arm the one-shot finalize guard if this decision completed the
/// review; returns the token the settle window must check.
fn arm_finalize(session: &mut Session) -> Option<Uuid> {
    if session.is_fully_reviewed() && !session.finalizing {
        session.finalizing = true;
        Some(session.token)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn company(id: CompanyId, confidence: u8) -> Company {
        Company {
            id,
            name: format!("Company {id}"),
            confidence,
            confidence_b: Some(confidence),
            shareholders: None,
            revenue: None,
            ebitda: None,
            reasoning: None,
            logo: None,
        }
    }

    fn engine(companies: Vec<Company>) -> TriageEngine {
        let customers = vec![Customer {
            id: 1,
            name: "Test Customer".to_string(),
            kind: "Private Equity".to_string(),
        }];
        let catalog = Catalog::new(customers, BTreeMap::from([(1, companies)]));
        TriageEngine::new(catalog, TriageConfig::zero_latency())
    }

    #[tokio::test]
    async fn test_phase_is_idle_without_session() {
        let engine = engine(vec![company(1, 80)]);
        assert_eq!(engine.phase().await, WorkflowPhase::Idle);
    }

    #[tokio::test]
    async fn test_stage_requires_session() {
        let engine = engine(vec![company(1, 80)]);
        assert!(matches!(
            engine.run_broad_rank().await,
            Err(TriageError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_tailored_before_broad_is_refused() {
        let engine = engine(vec![company(1, 80)]);
        engine.select_customer(1).await.unwrap();
        assert!(matches!(
            engine.run_tailored_rank().await,
            Err(TriageError::StageOrder { .. })
        ));
    }

    #[tokio::test]
    async fn test_broad_rank_is_idempotent() {
        let engine = engine(vec![company(1, 80), company(2, 90)]);
        engine.select_customer(1).await.unwrap();

        let first = engine.run_broad_rank().await.unwrap();
        assert!(matches!(first, StageOutcome::Ranked { .. }));

        let second = engine.run_broad_rank().await.unwrap();
        assert!(matches!(second, StageOutcome::AlreadyRanked { .. }));
        assert_eq!(engine.phase().await, WorkflowPhase::BroadRanked);
    }

    #[tokio::test]
    async fn test_review_before_tailored_is_refused() {
        let engine = engine(vec![company(1, 80)]);
        engine.select_customer(1).await.unwrap();
        engine.run_broad_rank().await.unwrap();
        assert!(matches!(
            engine.approve(1).await,
            Err(TriageError::ReviewNotOpen(WorkflowPhase::BroadRanked))
        ));
    }

    #[tokio::test]
    async fn test_approve_unknown_company_is_refused() {
        let engine = engine(vec![company(1, 80)]);
        engine.select_customer(1).await.unwrap();
        engine.run_broad_rank().await.unwrap();
        engine.run_tailored_rank().await.unwrap();
        assert!(matches!(
            engine.approve(99).await,
            Err(TriageError::UnknownCompany(99))
        ));
    }

    #[tokio::test]
    async fn test_report_unavailable_before_finalize() {
        let engine = engine(vec![company(1, 80)]);
        engine.select_customer(1).await.unwrap();
        engine.run_broad_rank().await.unwrap();
        assert!(matches!(
            engine.report().await,
            Err(TriageError::NotFinalized(WorkflowPhase::BroadRanked))
        ));
    }
}
