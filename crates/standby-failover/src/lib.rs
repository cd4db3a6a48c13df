//! standby-failover — the database failover orchestrator.
//!
//! One call to [`Orchestrator::run_cycle`] is one reconciliation cycle.
//! Nothing is carried between cycles; every decision is re-derived from
//! two fresh probes.
//!
//! # Cycle
//!
//! ```text
//! probe(primary) ─► probe(replica) ─► decide()
//!   NoAction          set_weights(100/0)
//!   PromoteAndReroute notify(initiated) ─► promote() ─► set_weights(0/100)
//!                     ─► notify(completed)
//!   BothUnavailable   notify(critical), report Degraded
//! ```
//!
//! Probes, promotion and routing run under the cycle's [`RetryPolicy`].
//! Notifications are best-effort and never fail a cycle.
//!
//! # Overlapping cycles
//!
//! There is no lock between concurrent cycles. Promotion checks whether
//! the replica is still a replica before promoting and treats an
//! "invalid state" answer as a promotion already underway; routing
//! writes are upserts. Two overlapping cycles converge on the same state.
//!
//! [`RetryPolicy`]: standby_core::RetryPolicy

pub mod decision;
pub mod notifier;
pub mod orchestrator;
pub mod promotion;

pub use decision::{decide, target_weights};
pub use notifier::Notifier;
pub use orchestrator::{CycleOutcome, CycleReport, Orchestrator};
pub use promotion::PromotionExecutor;
