//! Integration tests for the reputation ledger
//!
//! These tests exercise end-to-end flows over the in-memory store with the
//! chain gateway disabled: proof lifecycle and scoring, tier promotion,
//! reconciler fallback, and batch task processing.

use std::sync::Arc;

use chrono::Utc;
use repledger::{
    compute_score, create_score_proof, ActivityFilter, ActivityLedger, ActivitySubmission,
    ActorRecord, ChainBridge, ChainGatewayClient, ChainReconciler, CoreError, ProofState,
    ReputationScore, RequestFilter, RequestStatus, RequestSubmission, RequestType, ScoreSource,
    ScoreWeights, Store, TaskCompletion, VerificationTier, VerificationWorkflow,
};

// ============================================================================
// Test Helpers
// ============================================================================

struct TestService {
    store: Arc<Store>,
    ledger: Arc<ActivityLedger>,
    workflow: VerificationWorkflow,
    reconciler: ChainReconciler,
}

fn test_actor(wallet: &str, did: &str) -> ActorRecord {
    let now = Utc::now();
    ActorRecord {
        did: did.to_string(),
        wallet_address: wallet.to_string(),
        username: None,
        score: ReputationScore::default(),
        score_updated_at: None,
        tier: VerificationTier::Unverified,
        social_accounts: None,
        created_at: now,
        updated_at: now,
    }
}

async fn create_test_service() -> TestService {
    let store = Arc::new(Store::in_memory());
    store
        .insert_actor(test_actor("0xalice", "did:example:alice"))
        .await
        .unwrap();
    store
        .insert_actor(test_actor("0xbob", "did:example:bob"))
        .await
        .unwrap();

    let bridge = Arc::new(ChainBridge::idle());
    let client = Arc::new(ChainGatewayClient::disabled());
    let ledger = Arc::new(ActivityLedger::new(store.clone(), bridge));
    let workflow = VerificationWorkflow::new(store.clone());
    let reconciler = ChainReconciler::new(store.clone(), client, ledger.clone());

    TestService {
        store,
        ledger,
        workflow,
        reconciler,
    }
}

fn submission(actor: &str, proof_id: &str, activity_type: &str, impact: u32) -> ActivitySubmission {
    ActivitySubmission {
        actor: actor.to_string(),
        proof_id: proof_id.to_string(),
        activity_type: activity_type.to_string(),
        title: format!("{} proof", activity_type),
        description: None,
        source: "github".to_string(),
        timestamp: None,
        score_impact: impact,
        metadata: None,
    }
}

// ============================================================================
// Proof Lifecycle & Scoring
// ============================================================================

#[tokio::test]
async fn full_lifecycle_builds_the_weighted_score() {
    let svc = create_test_service().await;

    // One proof in each weighted bucket
    for (proof_id, kind, impact) in [
        ("p-id", "verification", 90u32),
        ("p-con", "github_commit", 80),
        ("p-tru", "endorsement", 75),
        ("p-soc", "dao_proposal", 70),
        ("p-eng", "course_completion", 65),
    ] {
        svc.ledger
            .submit(submission("0xalice", proof_id, kind, impact))
            .await
            .unwrap();
        svc.ledger.verify(proof_id, "reviewer").await.unwrap();
    }

    let actor = svc.store.resolve_actor("0xalice").await.unwrap().unwrap();
    assert_eq!(actor.score.identity, 90);
    assert_eq!(actor.score.contribution, 80);
    assert_eq!(actor.score.trust, 75);
    assert_eq!(actor.score.social, 70);
    assert_eq!(actor.score.engagement, 65);
    // 90*0.25 + 80*0.35 + 75*0.20 + 70*0.10 + 65*0.10 = 79.0
    assert_eq!(actor.score.total, 79);
    assert!(actor.score_updated_at.is_some());
}

#[tokio::test]
async fn concurrent_verification_has_exactly_one_winner() {
    let svc = create_test_service().await;
    svc.ledger
        .submit(submission("0xalice", "p1", "github_commit", 40))
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        svc.ledger.verify("p1", "reviewer-a"),
        svc.ledger.verify("p1", "reviewer-b"),
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);

    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser.unwrap_err(), CoreError::InvalidState(_)));

    // The score reflects the proof exactly once
    let actor = svc.store.resolve_actor("0xalice").await.unwrap().unwrap();
    assert_eq!(actor.score.contribution, 40);
}

#[tokio::test]
async fn duplicate_proof_submission_conflicts() {
    let svc = create_test_service().await;
    svc.ledger
        .submit(submission("0xalice", "p1", "github_commit", 10))
        .await
        .unwrap();

    let err = svc
        .ledger
        .submit(submission("0xbob", "p1", "github_pr", 20))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn bucket_sums_saturate_at_one_hundred() {
    let svc = create_test_service().await;
    for (i, impact) in [60u32, 70, 80].iter().enumerate() {
        let proof_id = format!("p{}", i);
        svc.ledger
            .submit(submission("0xalice", &proof_id, "github_commit", *impact))
            .await
            .unwrap();
        svc.ledger.verify(&proof_id, "reviewer").await.unwrap();
    }

    let actor = svc.store.resolve_actor("0xalice").await.unwrap().unwrap();
    assert_eq!(actor.score.contribution, 100);
    assert_eq!(actor.score.total, 35); // 100 * 0.35
}

#[tokio::test]
async fn listing_honours_state_filter_and_pagination() {
    let svc = create_test_service().await;
    for i in 0..5 {
        svc.ledger
            .submit(submission(
                "0xalice",
                &format!("p{}", i),
                "github_commit",
                10,
            ))
            .await
            .unwrap();
    }
    svc.ledger.verify("p0", "reviewer").await.unwrap();
    svc.ledger.verify("p1", "reviewer").await.unwrap();

    let verified = svc
        .ledger
        .list(
            "did:example:alice",
            &ActivityFilter {
                state: Some(ProofState::Verified),
                limit: None,
                offset: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(verified.len(), 2);

    let page = svc
        .ledger
        .list(
            "0xalice",
            &ActivityFilter {
                state: None,
                limit: Some(2),
                offset: Some(2),
            },
        )
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
}

#[tokio::test]
async fn listing_order_is_stable_for_equal_timestamps() {
    let svc = create_test_service().await;
    let shared = Utc::now();
    for proof_id in ["p-c", "p-a", "p-d", "p-b"] {
        let mut activity = submission("0xalice", proof_id, "github_commit", 10);
        activity.timestamp = Some(shared);
        svc.ledger.submit(activity).await.unwrap();
    }

    // Equal timestamps fall back to proof id order
    let all = svc
        .ledger
        .list("0xalice", &ActivityFilter::default())
        .await
        .unwrap();
    let ids: Vec<&str> = all.iter().map(|a| a.proof_id.as_str()).collect();
    assert_eq!(ids, ["p-a", "p-b", "p-c", "p-d"]);

    // Pages reassemble into the same sequence
    let mut paged = Vec::new();
    for offset in [0, 2] {
        let page = svc
            .ledger
            .list(
                "0xalice",
                &ActivityFilter {
                    state: None,
                    limit: Some(2),
                    offset: Some(offset),
                },
            )
            .await
            .unwrap();
        paged.extend(page.into_iter().map(|a| a.proof_id));
    }
    assert_eq!(paged, ["p-a", "p-b", "p-c", "p-d"]);

    // The submission index follows the same total order
    for (i, proof_id) in ["p-a", "p-b", "p-c", "p-d"].iter().enumerate() {
        let index = svc
            .store
            .activity_index("0xalice", proof_id)
            .await
            .unwrap();
        assert_eq!(index, Some(i as u64));
    }
}

#[tokio::test]
async fn unknown_actor_is_not_found() {
    let svc = create_test_service().await;
    let err = svc
        .ledger
        .submit(submission("0xnobody", "p1", "github_commit", 10))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

// ============================================================================
// Actor Resolution
// ============================================================================

#[tokio::test]
async fn actors_resolve_by_wallet_or_did() {
    let svc = create_test_service().await;

    let by_wallet = svc.store.resolve_actor("0xALICE").await.unwrap().unwrap();
    assert_eq!(by_wallet.did, "did:example:alice");

    let by_did = svc
        .store
        .resolve_actor("did:example:alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_did.wallet_address, "0xalice");

    assert!(svc.store.resolve_actor("0xnobody").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let svc = create_test_service().await;
    let err = svc
        .store
        .insert_actor(test_actor("0xalice", "did:example:other"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

// ============================================================================
// Verification Workflow & Tier Promotion
// ============================================================================

async fn approve(svc: &TestService, actor: &str, request_type: RequestType) -> ActorRecord {
    let record = svc
        .workflow
        .submit(RequestSubmission {
            actor: actor.to_string(),
            request_id: format!("req_{}", uuid::Uuid::new_v4()),
            request_type,
            proof_refs: vec!["ipfs://proof".to_string()],
        })
        .await
        .unwrap();
    let (_, actor) = svc
        .workflow
        .review(&record.request_id, RequestStatus::Approved, "admin", None)
        .await
        .unwrap();
    actor
}

#[tokio::test]
async fn tier_promotion_sequence_is_monotonic() {
    let svc = create_test_service().await;

    // First approval of any type reaches basic
    let actor = approve(&svc, "0xalice", RequestType::Skill).await;
    assert_eq!(actor.tier, VerificationTier::Basic);

    // Non-identity approvals stall at basic
    let actor = approve(&svc, "0xalice", RequestType::Project).await;
    assert_eq!(actor.tier, VerificationTier::Basic);

    // Identity approval reaches verified
    let actor = approve(&svc, "0xalice", RequestType::Identity).await;
    assert_eq!(actor.tier, VerificationTier::Verified);

    // Further approvals never move the tier again
    let actor = approve(&svc, "0xalice", RequestType::Identity).await;
    assert_eq!(actor.tier, VerificationTier::Verified);
}

#[tokio::test]
async fn request_filters_resolve_the_actor() {
    let svc = create_test_service().await;
    approve(&svc, "0xalice", RequestType::Skill).await;

    let filter = RequestFilter {
        status: Some(RequestStatus::Approved),
        request_type: None,
        actor: Some("did:example:alice".to_string()),
        limit: None,
    };
    let requests = svc.workflow.list(&filter).await.unwrap();
    assert_eq!(requests.len(), 1);

    let filter = RequestFilter {
        status: None,
        request_type: None,
        actor: Some("0xnobody".to_string()),
        limit: None,
    };
    assert!(svc.workflow.list(&filter).await.unwrap().is_empty());
}

// ============================================================================
// Reconciliation & Chain Degradation
// ============================================================================

#[tokio::test]
async fn score_reads_degrade_to_cache_without_a_gateway() {
    let svc = create_test_service().await;
    svc.ledger
        .submit(submission("0xalice", "p1", "github_commit", 50))
        .await
        .unwrap();
    svc.ledger.verify("p1", "reviewer").await.unwrap();

    let (actor, resolved) = svc.reconciler.read_score("0xalice").await.unwrap();
    assert_eq!(actor.wallet_address, "0xalice");
    assert_eq!(resolved.source, ScoreSource::Cached);
    assert_eq!(resolved.score.contribution, 50);
    assert!(resolved.last_updated.is_some());
}

#[tokio::test]
async fn task_batch_is_partial_failure_tolerant() {
    let svc = create_test_service().await;

    let results = svc
        .reconciler
        .process_task_batch(vec![
            TaskCompletion {
                task_id: "t-1".to_string(),
                actor: "0xalice".to_string(),
                score_weight: 30,
            },
            TaskCompletion {
                task_id: "t-2".to_string(),
                actor: "0xnobody".to_string(),
                score_weight: 30,
            },
            TaskCompletion {
                task_id: "t-3".to_string(),
                actor: "did:example:bob".to_string(),
                score_weight: 20,
            },
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].status, "processed");
    assert_eq!(results[1].status, "error");
    assert!(results[1].error.as_deref().unwrap().contains("not found"));
    assert_eq!(results[2].status, "processed");

    // Successful items landed despite the failure between them
    let alice = svc.store.resolve_actor("0xalice").await.unwrap().unwrap();
    assert_eq!(alice.score.contribution, 30);
    let bob = svc.store.resolve_actor("0xbob").await.unwrap().unwrap();
    assert_eq!(bob.score.contribution, 20);
}

#[tokio::test]
async fn replayed_task_completion_conflicts() {
    let svc = create_test_service().await;
    svc.ledger
        .record_task_completion("t-1", "0xalice", 40)
        .await
        .unwrap();

    let results = svc
        .reconciler
        .process_task_batch(vec![TaskCompletion {
            task_id: "t-1".to_string(),
            actor: "0xalice".to_string(),
            score_weight: 40,
        }])
        .await;
    assert_eq!(results[0].status, "error");

    let actor = svc.store.resolve_actor("0xalice").await.unwrap().unwrap();
    assert_eq!(actor.score.contribution, 40);
}

// ============================================================================
// Score Proofs
// ============================================================================

#[tokio::test]
async fn score_proofs_are_deterministic_across_reads() {
    let svc = create_test_service().await;
    svc.ledger
        .submit(submission("0xalice", "p1", "verification", 80))
        .await
        .unwrap();
    svc.ledger.verify("p1", "reviewer").await.unwrap();

    let (actor, resolved) = svc.reconciler.read_score("0xalice").await.unwrap();
    let weights = ScoreWeights::default();
    let first = create_score_proof(
        &actor.wallet_address,
        Some(&actor.did),
        &resolved.score,
        resolved.last_updated,
        &weights,
    )
    .unwrap();
    let second = create_score_proof(
        &actor.wallet_address,
        Some(&actor.did),
        &resolved.score,
        resolved.last_updated,
        &weights,
    )
    .unwrap();

    assert_eq!(first.proof_hash, second.proof_hash);
    assert_eq!(first.content_address, second.content_address);
    assert!(first.proof_hash.starts_with("0x"));
    assert!(first.content_address.starts_with("ipfs://score-"));

    // A different score yields a different proof
    let other = create_score_proof(
        &actor.wallet_address,
        Some(&actor.did),
        &compute_score([("github_commit", 1u32)]),
        resolved.last_updated,
        &weights,
    )
    .unwrap();
    assert_ne!(first.proof_hash, other.proof_hash);
}
