//! End-to-end reconciliation cycle scenarios.
//!
//! Drives the orchestrator against the in-memory database, record set,
//! and topic, and asserts the calls each scenario produces.

use std::sync::Arc;
use std::time::Duration;

use standby_core::memory::{MemoryDatabase, MemoryTopic};
use standby_core::*;
use standby_failover::{CycleOutcome, Orchestrator};
use standby_routing::{MemoryRecordSet, PRIMARY_SET_ID, REPLICA_SET_ID};

const PRIMARY: &str = "orders-db";
const REPLICA: &str = "orders-db-replica";
const RECORD: &str = "orders.db.internal";

struct Cluster {
    db: MemoryDatabase,
    records: MemoryRecordSet,
    topic: MemoryTopic,
}

impl Cluster {
    fn new(primary_status: &str, replica_status: &str) -> Self {
        Self::with_database(MemoryDatabase::new(), primary_status, replica_status)
    }

    fn with_database(db: MemoryDatabase, primary_status: &str, replica_status: &str) -> Self {
        db.add_primary(PRIMARY, primary_status, "10.0.0.1");
        db.add_replica(REPLICA, PRIMARY, replica_status, "10.0.0.2");
        Self {
            db,
            records: MemoryRecordSet::new(),
            topic: MemoryTopic::new(),
        }
    }

    fn orchestrator(&self) -> Orchestrator {
        let mut config = FailoverConfig::scaffold(PRIMARY, REPLICA, RECORD);
        config.primary.address = "orders-db.abc.internal".to_string();
        config.replica.address = "orders-db-replica.abc.internal".to_string();
        config.retry.initial_backoff = "100ms".to_string();

        Orchestrator::new(
            config,
            Arc::new(self.db.clone()),
            Arc::new(self.records.clone()),
            Arc::new(self.topic.clone()),
        )
        .unwrap()
    }

    fn weights(&self) -> Option<(u32, u32)> {
        let snap = self.records.snapshot(RECORD)?;
        Some((
            snap.weight_of(PRIMARY_SET_ID)?,
            snap.weight_of(REPLICA_SET_ID)?,
        ))
    }
}

#[tokio::test(start_paused = true)]
async fn healthy_primary_keeps_traffic_on_primary() {
    let cluster = Cluster::new("available", "available");

    let report = cluster.orchestrator().run_cycle().await.unwrap();

    assert_eq!(report.action, FailoverAction::NoAction);
    assert_eq!(report.outcome, CycleOutcome::Healthy);
    assert_eq!(report.primary.state, EndpointState::Available);
    assert!(!report.primary.is_replica);
    assert!(report.replica.as_ref().unwrap().is_replica);
    assert_eq!(cluster.weights(), Some((100, 0)));
    assert_eq!(cluster.records.batches(), 1);
    assert_eq!(cluster.db.promote_calls(REPLICA), 0);
    assert!(cluster.topic.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn healthy_cycles_repair_stale_routing() {
    let cluster = Cluster::new("available", "available");
    let orchestrator = orchestrator_with_stale_routing(&cluster).await;

    orchestrator.run_cycle().await.unwrap();
    assert_eq!(cluster.weights(), Some((100, 0)));

    // A second healthy cycle writes the same state again.
    let before = cluster.records.snapshot(RECORD);
    orchestrator.run_cycle().await.unwrap();
    assert_eq!(cluster.records.snapshot(RECORD), before);
}

async fn orchestrator_with_stale_routing(cluster: &Cluster) -> Orchestrator {
    let stale = [
        WeightedRecord {
            set_identifier: PRIMARY_SET_ID.to_string(),
            target: "orders-db.abc.internal".to_string(),
            weight: 40,
            ttl: 60,
        },
        WeightedRecord {
            set_identifier: REPLICA_SET_ID.to_string(),
            target: "orders-db-replica.abc.internal".to_string(),
            weight: 60,
            ttl: 60,
        },
    ];
    cluster
        .records
        .upsert_weighted_records(RECORD, &stale)
        .await
        .unwrap();
    assert_eq!(cluster.weights(), Some((40, 60)));
    cluster.orchestrator()
}

#[tokio::test(start_paused = true)]
async fn primary_down_promotes_and_reroutes() {
    let cluster = Cluster::new("failed", "available");

    let report = cluster.orchestrator().run_cycle().await.unwrap();

    assert_eq!(report.action, FailoverAction::PromoteAndReroute);
    assert_eq!(report.outcome, CycleOutcome::FailedOver);
    assert_eq!(report.promotion, Some(PromotionOutcome::Promoted));
    assert_eq!(report.weights, Some(RoutingWeights::REPLICA_ONLY));

    assert_eq!(cluster.db.promote_calls(REPLICA), 1);
    assert_eq!(cluster.records.batches(), 1);
    assert_eq!(cluster.weights(), Some((0, 100)));
    assert_eq!(
        cluster.topic.subjects(),
        vec!["Database failover initiated", "Database failover completed"]
    );

    let snap = cluster.records.snapshot(RECORD).unwrap();
    let replica_record = &snap.records[REPLICA_SET_ID];
    assert_eq!(replica_record.target, "orders-db-replica.abc.internal");
    assert_eq!(replica_record.ttl, 60);
}

#[tokio::test(start_paused = true)]
async fn both_down_is_degraded_not_error() {
    let cluster = Cluster::new("failed", "storage-full");

    let report = cluster.orchestrator().run_cycle().await.unwrap();

    assert_eq!(report.action, FailoverAction::BothUnavailable);
    assert_eq!(report.outcome, CycleOutcome::Degraded);
    assert!(report.is_degraded());
    assert_eq!(cluster.db.promote_calls(REPLICA), 0);
    assert_eq!(cluster.records.batches(), 0);

    let messages = cluster.topic.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].subject.starts_with("CRITICAL"));
    assert_eq!(messages[0].topic, "db-failover");
}

#[tokio::test(start_paused = true)]
async fn sequential_double_invocation_promotes_once() {
    let cluster = Cluster::new("failed", "available");
    let first = cluster.orchestrator();
    let second = cluster.orchestrator();

    let a = first.run_cycle().await.unwrap();
    let b = second.run_cycle().await.unwrap();

    assert_eq!(a.promotion, Some(PromotionOutcome::Promoted));
    assert_eq!(b.promotion, Some(PromotionOutcome::AlreadyPromoted));
    assert!(!b.replica.unwrap().is_replica);
    assert_eq!(cluster.db.promote_calls(REPLICA), 1);
    assert_eq!(cluster.records.batches(), 2);
    assert_eq!(cluster.weights(), Some((0, 100)));
}

#[tokio::test(start_paused = true)]
async fn concurrent_cycles_converge() {
    let db = MemoryDatabase::new().with_latency(Duration::from_millis(50));
    let cluster = Cluster::with_database(db, "failed", "available");
    let first = cluster.orchestrator();
    let second = cluster.orchestrator();

    let (a, b) = tokio::join!(first.run_cycle(), second.run_cycle());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.outcome, CycleOutcome::FailedOver);
    assert_eq!(b.outcome, CycleOutcome::FailedOver);

    let outcomes = [a.promotion.unwrap(), b.promotion.unwrap()];
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == PromotionOutcome::Promoted)
            .count(),
        1,
        "exactly one cycle performs the promotion: {outcomes:?}"
    );
    assert!(outcomes.iter().all(|o| matches!(
        o,
        PromotionOutcome::Promoted
            | PromotionOutcome::AlreadyPromoted
            | PromotionOutcome::PromotionInProgress
    )));

    assert_eq!(cluster.db.descriptor(REPLICA).unwrap().replica_of, None);
    assert_eq!(cluster.records.batches(), 2);
    assert_eq!(cluster.weights(), Some((0, 100)));
}

#[tokio::test(start_paused = true)]
async fn promotion_retries_then_succeeds() {
    let cluster = Cluster::new("failed", "available");
    cluster
        .db
        .fail_promote([ProviderError::transport("connection reset")]);

    let start = tokio::time::Instant::now();
    let report = cluster.orchestrator().run_cycle().await.unwrap();

    assert_eq!(report.promotion, Some(PromotionOutcome::Promoted));
    assert_eq!(cluster.db.promote_calls(REPLICA), 2);
    assert!(start.elapsed() >= Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn promotion_failure_exhausts_and_skips_routing() {
    let cluster = Cluster::new("failed", "available");
    cluster
        .db
        .fail_promote((0..3).map(|_| ProviderError::rejected("access denied")));

    let err = cluster.orchestrator().run_cycle().await.unwrap_err();

    assert!(matches!(
        err,
        FailoverError::RetriesExhausted {
            operation: "promote",
            attempts: 3,
            ..
        }
    ));
    assert!(matches!(err.root(), FailoverError::Promotion { .. }));
    assert_eq!(cluster.db.promote_calls(REPLICA), 3);
    assert_eq!(cluster.records.batches(), 0);
    assert_eq!(cluster.topic.subjects(), vec!["Database failover initiated"]);
}

#[tokio::test(start_paused = true)]
async fn recovered_primary_takes_traffic_back_on_next_cycle() {
    let cluster = Cluster::new("failed", "available");
    let orchestrator = cluster.orchestrator();

    orchestrator.run_cycle().await.unwrap();
    assert_eq!(cluster.weights(), Some((0, 100)));

    cluster.db.set_status(PRIMARY, "available");
    let report = orchestrator.run_cycle().await.unwrap();
    assert_eq!(report.action, FailoverAction::NoAction);
    assert_eq!(cluster.weights(), Some((100, 0)));
}
