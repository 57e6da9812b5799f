pub mod breaker;
pub mod child_status;
pub mod conditions;
pub mod errors;
pub mod hash;
pub mod managed_cluster;
pub mod validation;

pub use breaker::{BreakerState, CircuitBreaker};
pub use child_status::{aggregate_phase, ChildStatus, Phase};
pub use errors::{Error, Result, StdError};
pub use hash::{hash_spec, hash_value};
pub use managed_cluster::{
    AgentConfig, GpuCapacity, ManagedCluster, ManagedClusterSpec, ManagedClusterStatus, ResourceCounts,
};

/// API group shared by every custom resource kind this system owns.
pub const API_GROUP: &str = "gwfabric.dev";
/// API version for all owned kinds in this revision of the system.
pub const API_VERSION: &str = "v1alpha1";

/// Sentinel message used throughout child-status reporting to mean
/// "this child kind is legitimately absent, not broken". Never log this as an error.
pub const NOT_CONFIGURED: &str = "not configured";
