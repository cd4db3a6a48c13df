//! standby-core — shared types for the database failover orchestrator.
//!
//! Holds the value types of a reconciliation cycle, the collaborator
//! traits the orchestrator is built against, the retry policy and its
//! backoff executor, and `standby.toml` parsing.
//!
//! # Collaborators
//!
//! ```text
//! DatabaseControl   describe(id), promote(id, retention)
//! RoutingControl    upsert_weighted_records(name, [record; 2])
//! NotificationSink  publish(topic, subject, body)
//! ```
//!
//! Every collaborator call returns a [`ProviderFuture`] and is expected to
//! be wrapped in [`with_deadline`] by the component that makes it.

pub mod backoff;
pub mod config;
pub mod error;
pub mod memory;
pub mod provider;
pub mod types;

pub use backoff::{run_with_backoff, run_with_backoff_using, RetryPolicy};
pub use config::FailoverConfig;
pub use error::{ConfigError, FailoverError, FailoverResult, ProviderError, ProviderErrorKind};
pub use provider::{
    with_deadline, DatabaseControl, NotificationSink, ProviderFuture, RoutingControl,
};
pub use types::*;
