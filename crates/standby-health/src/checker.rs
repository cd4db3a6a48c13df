//! Endpoint probe logic.
//!
//! Queries the database-control plane for an endpoint's descriptor and
//! classifies it. One probe is one describe call under a deadline.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use standby_core::{
    with_deadline, DatabaseControl, EndpointDescriptor, EndpointState, EndpointStatus,
    FailoverError, FailoverResult, ProviderErrorKind,
};

/// Probes named database endpoints.
#[derive(Clone)]
pub struct EndpointProber {
    control: Arc<dyn DatabaseControl>,
    call_timeout: Duration,
}

impl EndpointProber {
    pub fn new(control: Arc<dyn DatabaseControl>, call_timeout: Duration) -> Self {
        Self {
            control,
            call_timeout,
        }
    }

    /// Probe one endpoint.
    pub async fn probe(&self, endpoint_id: &str) -> FailoverResult<EndpointStatus> {
        let desc = with_deadline(self.call_timeout, self.control.describe(endpoint_id))
            .await
            .map_err(|e| match e.kind {
                ProviderErrorKind::NotFound => {
                    FailoverError::EndpointNotFound(endpoint_id.to_string())
                }
                _ => FailoverError::Probe {
                    endpoint: endpoint_id.to_string(),
                    source: e,
                },
            })?;

        let status = classify(&desc);
        debug!(
            endpoint = %endpoint_id,
            provider_status = %desc.status,
            state = ?status.state,
            is_replica = status.is_replica,
            "endpoint probed"
        );
        Ok(status)
    }
}

/// Classify a provider descriptor.
pub fn classify(desc: &EndpointDescriptor) -> EndpointStatus {
    EndpointStatus {
        state: EndpointState::from_provider_status(&desc.status),
        is_replica: desc.replica_of.is_some(),
        address: desc.address.clone().unwrap_or_default(),
    }
}
