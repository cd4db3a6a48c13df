//! In-memory collaborators used by the test suites of every standby crate.
//!
//! Each fake records the calls it receives and can be primed with
//! failures, so cycle behaviour can be asserted without a provider.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use crate::error::ProviderError;
use crate::provider::{DatabaseControl, NotificationSink, ProviderFuture};
use crate::types::EndpointDescriptor;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

// ── Database ───────────────────────────────────────────────────────

#[derive(Default)]
struct DatabaseInner {
    endpoints: HashMap<String, EndpointDescriptor>,
    describe_failures: HashMap<String, VecDeque<ProviderError>>,
    promote_failures: VecDeque<ProviderError>,
    describe_calls: HashMap<String, usize>,
    promote_calls: HashMap<String, usize>,
}

/// In-memory database control plane.
///
/// Promotion clears `replica_of` immediately. Promoting an instance that
/// is not a replica fails with an `InvalidState` error.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    inner: Arc<Mutex<DatabaseInner>>,
    latency: Duration,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` so concurrent cycles interleave.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Register a standalone instance.
    pub fn add_primary(&self, id: &str, status: &str, address: &str) {
        self.put(
            id,
            EndpointDescriptor {
                status: status.to_string(),
                replica_of: None,
                address: Some(address.to_string()),
            },
        );
    }

    /// Register a read replica of `source`.
    pub fn add_replica(&self, id: &str, source: &str, status: &str, address: &str) {
        self.put(
            id,
            EndpointDescriptor {
                status: status.to_string(),
                replica_of: Some(source.to_string()),
                address: Some(address.to_string()),
            },
        );
    }

    pub fn put(&self, id: &str, descriptor: EndpointDescriptor) {
        lock(&self.inner)
            .endpoints
            .insert(id.to_string(), descriptor);
    }

    pub fn set_status(&self, id: &str, status: &str) {
        if let Some(desc) = lock(&self.inner).endpoints.get_mut(id) {
            desc.status = status.to_string();
        }
    }

    pub fn remove(&self, id: &str) {
        lock(&self.inner).endpoints.remove(id);
    }

    pub fn descriptor(&self, id: &str) -> Option<EndpointDescriptor> {
        lock(&self.inner).endpoints.get(id).cloned()
    }

    /// Fail the next `describe` calls for `id` with these errors, in order.
    pub fn fail_describe(&self, id: &str, errors: impl IntoIterator<Item = ProviderError>) {
        lock(&self.inner)
            .describe_failures
            .entry(id.to_string())
            .or_default()
            .extend(errors);
    }

    /// Fail the next `promote` calls with these errors, in order.
    pub fn fail_promote(&self, errors: impl IntoIterator<Item = ProviderError>) {
        lock(&self.inner).promote_failures.extend(errors);
    }

    pub fn describe_calls(&self, id: &str) -> usize {
        lock(&self.inner).describe_calls.get(id).copied().unwrap_or(0)
    }

    pub fn promote_calls(&self, id: &str) -> usize {
        lock(&self.inner).promote_calls.get(id).copied().unwrap_or(0)
    }
}

impl DatabaseControl for MemoryDatabase {
    fn describe<'a>(&'a self, endpoint_id: &'a str) -> ProviderFuture<'a, EndpointDescriptor> {
        Box::pin(async move {
            simulate_latency(self.latency).await;
            let mut inner = lock(&self.inner);
            *inner
                .describe_calls
                .entry(endpoint_id.to_string())
                .or_default() += 1;

            if let Some(err) = inner
                .describe_failures
                .get_mut(endpoint_id)
                .and_then(VecDeque::pop_front)
            {
                return Err(err);
            }

            inner
                .endpoints
                .get(endpoint_id)
                .cloned()
                .ok_or_else(|| ProviderError::not_found(format!("no instance {endpoint_id}")))
        })
    }

    fn promote<'a>(
        &'a self,
        endpoint_id: &'a str,
        backup_retention_days: u32,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            simulate_latency(self.latency).await;
            let mut inner = lock(&self.inner);
            *inner
                .promote_calls
                .entry(endpoint_id.to_string())
                .or_default() += 1;

            if let Some(err) = inner.promote_failures.pop_front() {
                return Err(err);
            }

            let desc = inner
                .endpoints
                .get_mut(endpoint_id)
                .ok_or_else(|| ProviderError::not_found(format!("no instance {endpoint_id}")))?;

            if desc.replica_of.is_none() {
                return Err(ProviderError::invalid_state(format!(
                    "instance {endpoint_id} is not a read replica"
                )));
            }

            desc.replica_of = None;
            debug!(endpoint = %endpoint_id, backup_retention_days, "memory replica promoted");
            Ok(())
        })
    }
}

// ── Notifications ──────────────────────────────────────────────────

/// A message captured by [`MemoryTopic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
struct TopicInner {
    messages: Vec<PublishedMessage>,
    failures: VecDeque<ProviderError>,
    always_fail: bool,
}

/// In-memory notification sink.
#[derive(Clone, Default)]
pub struct MemoryTopic {
    inner: Arc<Mutex<TopicInner>>,
}

impl MemoryTopic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every publish, simulating a notification outage.
    pub fn fail_always(&self) {
        lock(&self.inner).always_fail = true;
    }

    pub fn fail_next(&self, errors: impl IntoIterator<Item = ProviderError>) {
        lock(&self.inner).failures.extend(errors);
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        lock(&self.inner).messages.clone()
    }

    pub fn subjects(&self) -> Vec<String> {
        lock(&self.inner)
            .messages
            .iter()
            .map(|m| m.subject.clone())
            .collect()
    }
}

impl NotificationSink for MemoryTopic {
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        subject: &'a str,
        body: &'a str,
    ) -> ProviderFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = lock(&self.inner);
            if inner.always_fail {
                return Err(ProviderError::transport("topic unreachable"));
            }
            if let Some(err) = inner.failures.pop_front() {
                return Err(err);
            }
            inner.messages.push(PublishedMessage {
                topic: topic.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;

    #[tokio::test]
    async fn describe_unknown_is_not_found() {
        let db = MemoryDatabase::new();
        let err = db.describe("ghost").await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::NotFound);
        assert_eq!(db.describe_calls("ghost"), 1);
    }

    #[tokio::test]
    async fn promote_clears_replication_source() {
        let db = MemoryDatabase::new();
        db.add_replica("db-replica", "db", "available", "10.0.0.2");

        db.promote("db-replica", 7).await.unwrap();
        assert_eq!(db.descriptor("db-replica").unwrap().replica_of, None);
        assert_eq!(db.promote_calls("db-replica"), 1);
    }

    #[tokio::test]
    async fn promote_standalone_is_invalid_state() {
        let db = MemoryDatabase::new();
        db.add_primary("db", "available", "10.0.0.1");

        let err = db.promote("db", 7).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn primed_describe_failures_drain_in_order() {
        let db = MemoryDatabase::new();
        db.add_primary("db", "available", "10.0.0.1");
        db.fail_describe("db", [ProviderError::transport("reset")]);

        assert!(db.describe("db").await.is_err());
        assert_eq!(db.describe("db").await.unwrap().status, "available");
    }

    #[tokio::test]
    async fn topic_records_and_fails() {
        let topic = MemoryTopic::new();
        topic.publish("alerts", "hello", "body").await.unwrap();
        assert_eq!(topic.subjects(), vec!["hello"]);

        topic.fail_always();
        assert!(topic.publish("alerts", "again", "body").await.is_err());
        assert_eq!(topic.messages().len(), 1);
    }
}
