//! Collaborator traits — the narrow interfaces the orchestrator drives.
//!
//! Concrete providers (an HTTP control API, a cloud SDK, the in-memory
//! fakes in [`crate::memory`]) are injected at construction time.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::ProviderError;
use crate::types::{EndpointDescriptor, WeightedRecord};

/// Boxed future returned by every collaborator call.
pub type ProviderFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Database control plane: instance descriptors and replica promotion.
pub trait DatabaseControl: Send + Sync {
    /// Fetch the current descriptor of the named endpoint.
    fn describe<'a>(&'a self, endpoint_id: &'a str) -> ProviderFuture<'a, EndpointDescriptor>;

    /// Promote a read replica to a standalone, writable instance.
    fn promote<'a>(
        &'a self,
        endpoint_id: &'a str,
        backup_retention_days: u32,
    ) -> ProviderFuture<'a, ()>;
}

/// Weighted DNS routing.
pub trait RoutingControl: Send + Sync {
    /// Upsert every record under `record_name` as one atomic batch.
    fn upsert_weighted_records<'a>(
        &'a self,
        record_name: &'a str,
        records: &'a [WeightedRecord],
    ) -> ProviderFuture<'a, ()>;
}

/// Pub/sub notification transport.
pub trait NotificationSink: Send + Sync {
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        subject: &'a str,
        body: &'a str,
    ) -> ProviderFuture<'a, ()>;
}

/// Bound a collaborator call to a deadline.
///
/// Expiry becomes an ordinary [`ProviderError`] of kind `Timeout`.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::timeout(deadline)),
    }
}
