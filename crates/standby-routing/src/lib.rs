//! standby-routing — weighted traffic routing between two endpoints.
//!
//! # Components
//!
//! - **`router`** — `TrafficRouter`, which writes both weighted records
//!   as a single batch
//! - **`records`** — `MemoryRecordSet`, an in-memory weighted record store

pub mod records;
pub mod router;

pub use records::{MemoryRecordSet, RecordSnapshot};
pub use router::{TrafficRouter, PRIMARY_SET_ID, REPLICA_SET_ID};
