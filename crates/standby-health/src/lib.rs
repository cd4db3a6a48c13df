//! standby-health — endpoint health probing.
//!
//! Turns a database-control descriptor into an [`EndpointStatus`]:
//!
//! ```text
//! describe(id) ──► status == "available" ? Available : Unavailable
//!                  replica_of.is_some()  ? is_replica
//!                  address.unwrap_or("")
//! ```
//!
//! Probe failures are classified as `EndpointNotFound` or `Probe`; both
//! are retried by the caller.
//!
//! [`EndpointStatus`]: standby_core::EndpointStatus

pub mod checker;

pub use checker::{classify, EndpointProber};
