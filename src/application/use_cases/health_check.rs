use crate::{
    domain::health::*,
    infrastructure::adapters::PurchaseGrantStore,
    shared::error::AppResult,
};
use serde_json::json;
use std::sync::Arc;

/// Health check use case
pub struct HealthCheckUseCase {
    store: Arc<PurchaseGrantStore>,
    mailbox: &'static str,
}

impl HealthCheckUseCase {
    pub fn new(store: Arc<PurchaseGrantStore>, mailbox: &'static str) -> Self {
        Self { store, mailbox }
    }

    /// Report store reachability and which backends are in use
    pub async fn execute(&self) -> AppResult<HealthResponse> {
        let store_mode = if self.store.is_persistent() { "redis" } else { "memory" };
        let store_reachable = match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Grant store health check failed");
                false
            }
        };

        let probe = BackendProbe {
            store_reachable,
            store_persistent: self.store.is_persistent(),
            mailbox_synthetic: self.mailbox == "synthetic",
        };
        let (status, warnings) = probe.assess();

        let details = json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION"),
            "store": { "mode": store_mode, "reachable": store_reachable },
            "mailbox": self.mailbox,
            "warnings": warnings,
        });

        Ok(HealthResponse { status, details })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_and_synthetic_mailbox_are_degraded() {
        let use_case = HealthCheckUseCase::new(Arc::new(PurchaseGrantStore::in_memory()), "synthetic");
        let health = use_case.execute().await.unwrap();

        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.http_status_code(), 200);
        assert_eq!(health.details["store"]["mode"], "memory");
        assert_eq!(health.details["mailbox"], "synthetic");
        assert_eq!(health.details["warnings"].as_array().unwrap().len(), 2);
    }
}
