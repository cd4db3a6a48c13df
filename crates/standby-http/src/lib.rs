//! standby-http — collaborator adapters over a JSON control API.
//!
//! [`ControlApiClient`] implements all three collaborator traits against
//! one HTTP authority:
//!
//! ```text
//! GET  /v1/instances/{id}           → EndpointDescriptor
//! POST /v1/instances/{id}/promote   {"backup_retention_days": n}
//! POST /v1/records/{name}/batch     {"action": "UPSERT", "records": [..2]}
//! POST /v1/topics/{topic}/messages  {"subject": .., "body": ..}
//! ```
//!
//! Non-2xx responses are mapped to a `ProviderError` kind here, so the
//! orchestrator never looks at provider error text.

pub mod adapters;
pub mod client;

pub use client::{classify_response, ControlApiClient};
