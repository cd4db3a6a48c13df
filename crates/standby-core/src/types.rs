//! Value types shared by every stage of a reconciliation cycle.
//!
//! All of these are created and discarded within a single cycle. None of
//! them is persisted.

use serde::{Deserialize, Serialize};

use crate::error::FailoverError;

/// Total weight shared by the two routing records.
pub const TOTAL_WEIGHT: u32 = 100;

// ── Endpoint status ────────────────────────────────────────────────

/// Availability classification of a database endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointState {
    Available,
    Unavailable,
    Unknown,
}

impl EndpointState {
    /// Map a provider-reported instance status.
    ///
    /// Only the exact string `"available"` counts as available.
    pub fn from_provider_status(status: &str) -> Self {
        if status == "available" {
            Self::Available
        } else {
            Self::Unavailable
        }
    }

    pub fn is_available(self) -> bool {
        self == Self::Available
    }
}

/// Result of probing one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStatus {
    pub state: EndpointState,
    /// Still configured as a read replica of another instance.
    pub is_replica: bool,
    /// Address currently serving the endpoint, empty if undeterminable.
    pub address: String,
}

impl EndpointStatus {
    pub fn new(state: EndpointState, is_replica: bool, address: impl Into<String>) -> Self {
        Self {
            state,
            is_replica,
            address: address.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.state.is_available()
    }
}

/// Raw endpoint descriptor as reported by the database-control provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Provider status string, e.g. `"available"`, `"rebooting"`.
    pub status: String,
    /// Identifier of the replication source, if this is a replica.
    #[serde(default)]
    pub replica_of: Option<String>,
    /// Hostname or address, if the provider reports one.
    #[serde(default)]
    pub address: Option<String>,
}

// ── Decisions ──────────────────────────────────────────────────────

/// Outcome of evaluating a (primary, replica) status pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverAction {
    /// Primary is healthy. Routing is re-asserted to the primary.
    NoAction,
    /// Primary is down and the standby is healthy.
    PromoteAndReroute,
    /// Operator-initiated failback to the primary.
    RestoreToPrimary,
    /// Neither endpoint is healthy.
    BothUnavailable,
}

/// Result of a promotion request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionOutcome {
    /// The promote call was issued and accepted.
    Promoted,
    /// The endpoint was no longer a replica; no call was issued.
    AlreadyPromoted,
    /// The provider reported the endpoint is mid-transition.
    PromotionInProgress,
}

// ── Routing ────────────────────────────────────────────────────────

/// Desired traffic split between primary and replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingWeights {
    pub primary: u32,
    pub replica: u32,
}

impl RoutingWeights {
    /// All traffic to the primary.
    pub const PRIMARY_ONLY: Self = Self {
        primary: TOTAL_WEIGHT,
        replica: 0,
    };

    /// All traffic to the promoted replica.
    pub const REPLICA_ONLY: Self = Self {
        primary: 0,
        replica: TOTAL_WEIGHT,
    };

    /// Build a split, rejecting pairs that do not sum to [`TOTAL_WEIGHT`].
    pub fn new(primary: u32, replica: u32) -> Result<Self, FailoverError> {
        if primary.checked_add(replica) != Some(TOTAL_WEIGHT) {
            return Err(FailoverError::InvalidWeights { primary, replica });
        }
        Ok(Self { primary, replica })
    }
}

/// One weighted record as submitted to the routing provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedRecord {
    /// Distinguishes the two records sharing a name.
    pub set_identifier: String,
    pub target: String,
    pub weight: u32,
    pub ttl: u32,
}
