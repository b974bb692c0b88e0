//! Service health model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Overall service state reported on `/health`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Store and mailbox are both production-backed
    Healthy,
    /// Serving, but on a fallback (in-memory store or synthetic mailbox)
    Degraded,
    /// A dependency is unreachable
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        })
    }
}

/// What the health probe observed about the backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendProbe {
    pub store_reachable: bool,
    pub store_persistent: bool,
    pub mailbox_synthetic: bool,
}

impl BackendProbe {
    /// Worst status across the backends, with one warning per finding
    pub fn assess(&self) -> (HealthStatus, Vec<&'static str>) {
        let mut status = HealthStatus::Healthy;
        let mut warnings = Vec::new();

        if !self.store_reachable {
            status = status.max(HealthStatus::Unhealthy);
            warnings.push("Grant store is unreachable");
        } else if !self.store_persistent {
            status = status.max(HealthStatus::Degraded);
            warnings.push("Grants are held in memory and will not survive a restart");
        }

        if self.mailbox_synthetic {
            status = status.max(HealthStatus::Degraded);
            warnings.push("Synthetic mailbox in use; payments are not really checked");
        }

        (status, warnings)
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub details: Value,
}

impl HealthResponse {
    /// Degraded still serves traffic, so only an unreachable dependency is a 503
    pub fn http_status_code(&self) -> u16 {
        match self.status {
            HealthStatus::Healthy | HealthStatus::Degraded => 200,
            HealthStatus::Unhealthy => 503,
        }
    }
}
