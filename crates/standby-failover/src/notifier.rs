//! Best-effort operator notifications.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use standby_core::{with_deadline, FailoverError, FailoverResult, NotificationSink};

/// Publishes status messages to one topic.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    topic: String,
    call_timeout: Duration,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, topic: &str, call_timeout: Duration) -> Self {
        Self {
            sink,
            topic: topic.to_string(),
            call_timeout,
        }
    }

    /// Publish a message, returning any transport failure.
    pub async fn notify(&self, subject: &str, body: &str) -> FailoverResult<()> {
        with_deadline(self.call_timeout, self.sink.publish(&self.topic, subject, body))
            .await
            .map_err(|source| FailoverError::Notification {
                topic: self.topic.clone(),
                source,
            })?;
        debug!(topic = %self.topic, %subject, "notification published");
        Ok(())
    }

    /// Publish a message, logging and swallowing any failure.
    ///
    /// Returns whether the message was published.
    pub async fn notify_best_effort(&self, subject: &str, body: &str) -> bool {
        match self.notify(subject, body).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, %subject, "notification failed, continuing");
                false
            }
        }
    }
}
