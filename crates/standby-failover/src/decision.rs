//! Failover decision procedure.
//!
//! A pure function of the two probe results. `Unknown` is handled like
//! `Unavailable`.

use standby_core::{EndpointState, EndpointStatus, FailoverAction, RoutingWeights};

/// Decide what a cycle should do for the given primary/replica statuses.
pub fn decide(primary: &EndpointStatus, replica: &EndpointStatus) -> FailoverAction {
    match (primary.state, replica.state) {
        (EndpointState::Available, _) => FailoverAction::NoAction,
        (_, EndpointState::Available) => FailoverAction::PromoteAndReroute,
        _ => FailoverAction::BothUnavailable,
    }
}

/// Routing weights an action converges on, if it touches routing at all.
pub fn target_weights(action: FailoverAction) -> Option<RoutingWeights> {
    match action {
        FailoverAction::NoAction | FailoverAction::RestoreToPrimary => {
            Some(RoutingWeights::PRIMARY_ONLY)
        }
        FailoverAction::PromoteAndReroute => Some(RoutingWeights::REPLICA_ONLY),
        FailoverAction::BothUnavailable => None,
    }
}
