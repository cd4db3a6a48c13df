//! Traffic router — shifts client traffic between primary and replica.
//!
//! Both weighted records are submitted in one batch so a provider failure
//! cannot leave only one of them updated.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use standby_core::{
    with_deadline, FailoverError, FailoverResult, RoutingControl, RoutingWeights, WeightedRecord,
};

/// Set identifier of the record pointing at the primary.
pub const PRIMARY_SET_ID: &str = "primary";
/// Set identifier of the record pointing at the replica.
pub const REPLICA_SET_ID: &str = "replica";

/// Writes weighted routing records for one record name.
#[derive(Clone)]
pub struct TrafficRouter {
    control: Arc<dyn RoutingControl>,
    record_name: String,
    ttl: u32,
    call_timeout: Duration,
}

impl TrafficRouter {
    pub fn new(
        control: Arc<dyn RoutingControl>,
        record_name: &str,
        ttl: u32,
        call_timeout: Duration,
    ) -> Self {
        Self {
            control,
            record_name: record_name.to_string(),
            ttl,
            call_timeout,
        }
    }

    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    /// Build the two records for a weight split. Both share the same TTL.
    pub fn records_for(
        &self,
        primary_addr: &str,
        replica_addr: &str,
        weights: RoutingWeights,
    ) -> [WeightedRecord; 2] {
        [
            WeightedRecord {
                set_identifier: PRIMARY_SET_ID.to_string(),
                target: primary_addr.to_string(),
                weight: weights.primary,
                ttl: self.ttl,
            },
            WeightedRecord {
                set_identifier: REPLICA_SET_ID.to_string(),
                target: replica_addr.to_string(),
                weight: weights.replica,
                ttl: self.ttl,
            },
        ]
    }

    /// Upsert both records. Repeating the same weights is a no-op for clients.
    pub async fn set_weights(
        &self,
        primary_addr: &str,
        replica_addr: &str,
        weights: RoutingWeights,
    ) -> FailoverResult<()> {
        let records = self.records_for(primary_addr, replica_addr, weights);

        with_deadline(
            self.call_timeout,
            self.control
                .upsert_weighted_records(&self.record_name, &records),
        )
        .await
        .map_err(|source| FailoverError::Routing {
            record: self.record_name.clone(),
            source,
        })?;

        info!(
            record = %self.record_name,
            primary_weight = weights.primary,
            replica_weight = weights.replica,
            ttl = self.ttl,
            "routing weights applied"
        );
        Ok(())
    }
}
