//! Shared interface types.

use serde::{Deserialize, Serialize};

/// Health status of a generation back end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Back end is fully operational
    #[display("healthy")]
    Healthy,
    /// Back end is operational but with reduced performance
    #[display("degraded: {message}")]
    Degraded {
        /// Description of the degradation
        message: String,
    },
    /// Back end is not operational
    #[display("unhealthy: {message}")]
    Unhealthy {
        /// Description of the problem
        message: String,
    },
}

impl HealthStatus {
    /// Whether requests can be served at all.
    pub fn is_operational(&self) -> bool {
        !matches!(self, HealthStatus::Unhealthy { .. })
    }
}
