//! Failover orchestrator — one probe, decide, act cycle per call.
//!
//! The orchestrator owns no state between cycles. Every external call it
//! makes except notification runs under the configured retry policy, and
//! exhaustion is reported as `RetriesExhausted` naming the operation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{error, info, warn};

use standby_core::{
    run_with_backoff, ConfigError, DatabaseControl, EndpointStatus, FailoverAction,
    FailoverConfig, FailoverError, FailoverResult, NotificationSink, PromotionOutcome,
    RetryPolicy, RoutingControl, RoutingWeights,
};
use standby_health::EndpointProber;
use standby_routing::TrafficRouter;

use crate::decision::decide;
use crate::notifier::Notifier;
use crate::promotion::PromotionExecutor;

const SUBJECT_INITIATED: &str = "Database failover initiated";
const SUBJECT_COMPLETED: &str = "Database failover completed";
const SUBJECT_CRITICAL: &str = "CRITICAL: primary and replica databases unavailable";
const SUBJECT_RESTORED: &str = "Database traffic restored to primary";

/// Terminal outcome of a cycle that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Primary healthy; routing re-asserted.
    Healthy,
    /// Replica promoted (or found promoted) and traffic moved to it.
    FailedOver,
    /// Operator failback applied.
    Restored,
    /// No healthy endpoint. Infrastructure is down, the orchestrator is not.
    Degraded,
}

/// What a cycle observed and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub action: FailoverAction,
    pub outcome: CycleOutcome,
    pub primary: EndpointStatus,
    pub replica: Option<EndpointStatus>,
    pub promotion: Option<PromotionOutcome>,
    pub weights: Option<RoutingWeights>,
}

impl CycleReport {
    pub fn is_degraded(&self) -> bool {
        self.outcome == CycleOutcome::Degraded
    }
}

/// Drives reconciliation cycles for one primary/replica pair.
pub struct Orchestrator {
    config: FailoverConfig,
    policy: RetryPolicy,
    prober: EndpointProber,
    promoter: PromotionExecutor,
    router: TrafficRouter,
    notifier: Notifier,
}

impl Orchestrator {
    /// Build an orchestrator from a validated config and its collaborators.
    pub fn new(
        config: FailoverConfig,
        database: Arc<dyn DatabaseControl>,
        routing: Arc<dyn RoutingControl>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let policy = config.retry_policy()?;
        let call_timeout = config.call_timeout()?;

        Ok(Self {
            policy,
            prober: EndpointProber::new(database.clone(), call_timeout),
            promoter: PromotionExecutor::new(
                database,
                config.promotion.backup_retention_days,
                call_timeout,
            ),
            router: TrafficRouter::new(
                routing,
                &config.routing.record_name,
                config.routing.ttl,
                call_timeout,
            ),
            notifier: Notifier::new(notifications, &config.notify.topic, call_timeout),
            config,
        })
    }

    /// Replace the retry policy derived from the config.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run one reconciliation cycle.
    ///
    /// `Ok` with a `Degraded` outcome means both endpoints are down; `Err`
    /// means the orchestrator could not complete its work.
    pub async fn run_cycle(&self) -> FailoverResult<CycleReport> {
        let primary_id = self.config.primary.id.as_str();
        let replica_id = self.config.replica.id.as_str();

        let primary = self
            .retry("probe_primary", move || self.prober.probe(primary_id))
            .await?;
        let replica = self
            .retry("probe_replica", move || self.prober.probe(replica_id))
            .await?;

        let action = decide(&primary, &replica);
        info!(
            primary = %primary_id,
            primary_state = ?primary.state,
            replica = %replica_id,
            replica_state = ?replica.state,
            replica_is_replica = replica.is_replica,
            ?action,
            "failover decision"
        );

        match action {
            FailoverAction::NoAction | FailoverAction::RestoreToPrimary => {
                let weights = RoutingWeights::PRIMARY_ONLY;
                self.apply_weights(weights).await?;
                Ok(CycleReport {
                    action,
                    outcome: CycleOutcome::Healthy,
                    primary,
                    replica: Some(replica),
                    promotion: None,
                    weights: Some(weights),
                })
            }
            FailoverAction::PromoteAndReroute => self.fail_over(primary, replica).await,
            FailoverAction::BothUnavailable => {
                warn!(
                    primary = %primary_id,
                    replica = %replica_id,
                    "no healthy endpoint, leaving routing unchanged"
                );
                let body = format!(
                    "Primary {primary_id} is {:?} and replica {replica_id} is {:?}. \
                     No failover target is available; routing was not changed.",
                    primary.state, replica.state
                );
                self.notifier
                    .notify_best_effort(SUBJECT_CRITICAL, &body)
                    .await;
                Ok(CycleReport {
                    action,
                    outcome: CycleOutcome::Degraded,
                    primary,
                    replica: Some(replica),
                    promotion: None,
                    weights: None,
                })
            }
        }
    }

    /// Move all traffic back to the primary.
    ///
    /// Refuses unless the primary probes `Available`. Reconciling data
    /// written to a promoted replica is left to the operator.
    pub async fn restore_to_primary(&self) -> FailoverResult<CycleReport> {
        let primary_id = self.config.primary.id.as_str();
        let primary = self
            .retry("probe_primary", move || self.prober.probe(primary_id))
            .await?;

        if !primary.is_available() {
            return Err(FailoverError::PrimaryNotAvailable(primary_id.to_string()));
        }

        let weights = RoutingWeights::PRIMARY_ONLY;
        self.apply_weights(weights).await?;
        info!(primary = %primary_id, "traffic restored to primary");

        let body = format!(
            "All traffic for {} now routes to primary {primary_id}.",
            self.config.routing.record_name
        );
        self.notifier
            .notify_best_effort(SUBJECT_RESTORED, &body)
            .await;

        Ok(CycleReport {
            action: FailoverAction::RestoreToPrimary,
            outcome: CycleOutcome::Restored,
            primary,
            replica: None,
            promotion: None,
            weights: Some(weights),
        })
    }

    /// Run cycles every `interval` until `shutdown` changes.
    ///
    /// A failed cycle is logged and the loop continues. Returns the number
    /// of cycles started.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!(
            interval_ms = interval.as_millis() as u64,
            record = %self.config.routing.record_name,
            "failover loop started"
        );

        let mut cycles = 0u64;
        loop {
            cycles += 1;
            match self.run_cycle().await {
                Ok(report) if report.is_degraded() => {
                    warn!(cycle = cycles, "cycle finished degraded")
                }
                Ok(report) => info!(cycle = cycles, outcome = ?report.outcome, "cycle finished"),
                Err(e) => error!(cycle = cycles, error = %e, "cycle failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = shutdown.changed() => {
                    info!(cycles, "failover loop shutting down");
                    break;
                }
            }
        }
        cycles
    }

    async fn fail_over(
        &self,
        primary: EndpointStatus,
        replica: EndpointStatus,
    ) -> FailoverResult<CycleReport> {
        let primary_id = self.config.primary.id.as_str();
        let replica_id = self.config.replica.id.as_str();

        let body = format!(
            "Primary {primary_id} is {:?}. Promoting replica {replica_id} and \
             moving traffic for {} to it.",
            primary.state, self.config.routing.record_name
        );
        self.notifier
            .notify_best_effort(SUBJECT_INITIATED, &body)
            .await;

        let promotion = self
            .retry("promote", move || self.promoter.promote(replica_id))
            .await?;
        info!(replica = %replica_id, ?promotion, "promotion step finished");

        let weights = RoutingWeights::REPLICA_ONLY;
        self.apply_weights(weights).await?;

        let body = format!(
            "Replica {replica_id} promotion: {promotion:?}. Traffic for {} now \
             routes to {}.",
            self.config.routing.record_name, self.config.replica.address
        );
        self.notifier
            .notify_best_effort(SUBJECT_COMPLETED, &body)
            .await;

        Ok(CycleReport {
            action: FailoverAction::PromoteAndReroute,
            outcome: CycleOutcome::FailedOver,
            primary,
            replica: Some(replica),
            promotion: Some(promotion),
            weights: Some(weights),
        })
    }

    async fn apply_weights(&self, weights: RoutingWeights) -> FailoverResult<()> {
        let primary_addr = self.config.primary.address.as_str();
        let replica_addr = self.config.replica.address.as_str();
        self.retry("set_weights", move || {
            self.router.set_weights(primary_addr, replica_addr, weights)
        })
        .await
    }

    async fn retry<T, F, Fut>(&self, operation: &'static str, op: F) -> FailoverResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = FailoverResult<T>>,
    {
        run_with_backoff(&self.policy, operation, op)
            .await
            .map_err(|e| FailoverError::RetriesExhausted {
                operation,
                attempts: self.policy.max_attempts,
                source: Box::new(e),
            })
    }
}
