//! Session-switch guards: busy indicators, re-entrancy refusal, and
//! dropping of late completions from abandoned sessions.
//!
//! These tests run on virtual time (`start_paused`) so the configured
//! stage latencies elapse deterministically without wall-clock waits.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use triage_core::{
    Catalog, Company, CompanyId, Customer, ReviewOutcome, StageKind, StageOutcome, TriageConfig,
    TriageEngine, TriageError, WorkflowPhase,
};

fn company(id: CompanyId, confidence: u8, confidence_b: u8) -> Company {
    Company {
        id,
        name: format!("Company {id}"),
        confidence,
        confidence_b: Some(confidence_b),
        shareholders: None,
        revenue: None,
        ebitda: None,
        reasoning: None,
        logo: None,
    }
}

fn two_customer_catalog() -> Catalog {
    let customers = vec![
        Customer {
            id: 1,
            name: "Meridian Partners".to_string(),
            kind: "Private Equity".to_string(),
        },
        Customer {
            id: 2,
            name: "Halstrom Family Office".to_string(),
            kind: "Family Office".to_string(),
        },
    ];
    Catalog::new(
        customers,
        BTreeMap::from([
            (1, vec![company(11, 90, 85), company(12, 70, 95), company(13, 80, 60)]),
            (2, vec![company(21, 65, 75), company(22, 85, 55)]),
        ]),
    )
}

fn engine_with(config: TriageConfig) -> Arc<TriageEngine> {
    Arc::new(TriageEngine::new(two_customer_catalog(), config))
}

// ── Busy indicator and re-entrancy ──

#[tokio::test(start_paused = true)]
async fn stage_exposes_busy_indicator_and_refuses_reentry() {
    let engine = engine_with(TriageConfig::default());
    engine.select_customer(1).await.unwrap();

    let runner = Arc::clone(&engine);
    let handle = tokio::spawn(async move { runner.run_broad_rank().await });
    tokio::task::yield_now().await;

    assert_eq!(engine.busy_stage().await, Some(StageKind::BroadRank));
    assert!(matches!(
        engine.run_broad_rank().await,
        Err(TriageError::StageBusy {
            stage: StageKind::BroadRank
        })
    ));

    let outcome = handle.await.unwrap().unwrap();
    assert!(matches!(outcome, StageOutcome::Ranked { .. }));
    assert_eq!(engine.busy_stage().await, None);
    assert_eq!(engine.phase().await, WorkflowPhase::BroadRanked);
}

// ── Customer switch mid-stage ──

#[tokio::test(start_paused = true)]
async fn switching_customers_drops_an_in_flight_stage() {
    let engine = engine_with(TriageConfig::default());
    engine.select_customer(1).await.unwrap();

    let runner = Arc::clone(&engine);
    let handle = tokio::spawn(async move { runner.run_broad_rank().await });
    tokio::task::yield_now().await;
    assert_eq!(engine.busy_stage().await, Some(StageKind::BroadRank));

    // Abandon the session while the stage is suspended.
    let catalog = engine.select_customer(2).await.unwrap();
    assert_eq!(catalog.len(), 2);

    // The late completion must be a no-op against the new session.
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, StageOutcome::Superseded);

    assert_eq!(engine.phase().await, WorkflowPhase::CatalogLoaded);
    assert_eq!(engine.busy_stage().await, None);

    // The new session ranks its own catalog, unaffected.
    let StageOutcome::Ranked { working_set } = engine.run_broad_rank().await.unwrap() else {
        panic!("expected a fresh ranking");
    };
    let ids: Vec<CompanyId> = working_set.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![22, 21]);
}

#[tokio::test(start_paused = true)]
async fn switching_customers_drops_an_in_flight_tailored_stage() {
    let engine = engine_with(TriageConfig::default());
    engine.select_customer(1).await.unwrap();
    engine.run_broad_rank().await.unwrap();

    let runner = Arc::clone(&engine);
    let handle = tokio::spawn(async move { runner.run_tailored_rank().await });
    tokio::task::yield_now().await;
    assert_eq!(engine.busy_stage().await, Some(StageKind::TailoredRank));

    engine.select_customer(2).await.unwrap();

    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, StageOutcome::Superseded);
    assert_eq!(engine.phase().await, WorkflowPhase::CatalogLoaded);
}

// ── Customer switch during the removal window ──

#[tokio::test(start_paused = true)]
async fn switching_customers_drops_a_pending_rejection() {
    let config = TriageConfig {
        removal_delay: Duration::from_millis(300),
        ..TriageConfig::zero_latency()
    };
    let engine = engine_with(config);
    engine.select_customer(1).await.unwrap();
    engine.run_broad_rank().await.unwrap();
    engine.run_tailored_rank().await.unwrap();

    let rejecter = Arc::clone(&engine);
    let handle = tokio::spawn(async move { rejecter.reject(12).await });
    tokio::task::yield_now().await;

    engine.select_customer(2).await.unwrap();

    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, ReviewOutcome::Superseded);

    // The replacement session has no review state at all yet.
    assert!(engine.review_statuses().await.unwrap().is_empty());
    assert_eq!(engine.phase().await, WorkflowPhase::CatalogLoaded);
}

// ── Customer switch during the settle window ──

#[tokio::test(start_paused = true)]
async fn switching_customers_during_settle_skips_finalization() {
    let config = TriageConfig {
        settle_delay: Duration::from_millis(600),
        ..TriageConfig::zero_latency()
    };
    let engine = engine_with(config);
    engine.select_customer(1).await.unwrap();
    engine.run_broad_rank().await.unwrap();
    engine.run_tailored_rank().await.unwrap();
    engine.approve(11).await.unwrap();
    engine.approve(13).await.unwrap();

    // The last decision completes the review and enters the settle
    // window before returning.
    let approver = Arc::clone(&engine);
    let handle = tokio::spawn(async move { approver.approve(12).await });
    tokio::task::yield_now().await;

    engine.select_customer(2).await.unwrap();

    // The decision itself committed; only the finalize was dropped.
    assert_eq!(handle.await.unwrap().unwrap(), ReviewOutcome::Approved);
    assert_eq!(engine.phase().await, WorkflowPhase::CatalogLoaded);
    assert!(matches!(
        engine.report().await,
        Err(TriageError::NotFinalized(WorkflowPhase::CatalogLoaded))
    ));
}
