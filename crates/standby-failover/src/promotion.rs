//! Idempotent replica promotion.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use standby_core::{
    with_deadline, DatabaseControl, FailoverError, FailoverResult, PromotionOutcome,
    ProviderErrorKind,
};
use standby_health::EndpointProber;

/// Promotes a standby replica to a standalone, writable endpoint.
///
/// Safe to call repeatedly: an endpoint that is no longer a replica is
/// reported as `AlreadyPromoted` without a promote call.
#[derive(Clone)]
pub struct PromotionExecutor {
    control: Arc<dyn DatabaseControl>,
    prober: EndpointProber,
    backup_retention_days: u32,
    call_timeout: Duration,
}

impl PromotionExecutor {
    pub fn new(
        control: Arc<dyn DatabaseControl>,
        backup_retention_days: u32,
        call_timeout: Duration,
    ) -> Self {
        Self {
            prober: EndpointProber::new(control.clone(), call_timeout),
            control,
            backup_retention_days,
            call_timeout,
        }
    }

    pub async fn promote(&self, replica_id: &str) -> FailoverResult<PromotionOutcome> {
        let status = self.prober.probe(replica_id).await?;
        if !status.is_replica {
            debug!(endpoint = %replica_id, "endpoint is no longer a replica, skipping promote");
            return Ok(PromotionOutcome::AlreadyPromoted);
        }

        let call = self
            .control
            .promote(replica_id, self.backup_retention_days);
        match with_deadline(self.call_timeout, call).await {
            Ok(()) => {
                info!(
                    endpoint = %replica_id,
                    backup_retention_days = self.backup_retention_days,
                    "replica promotion requested"
                );
                Ok(PromotionOutcome::Promoted)
            }
            Err(e) if e.kind == ProviderErrorKind::InvalidState => {
                warn!(endpoint = %replica_id, error = %e, "promotion already in progress");
                Ok(PromotionOutcome::PromotionInProgress)
            }
            Err(e) => Err(FailoverError::Promotion {
                endpoint: replica_id.to_string(),
                source: e,
            }),
        }
    }
}
