use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub components: ComponentHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub ledger_rpc: bool,
    pub last_round_succeeded: Option<bool>,
    pub last_round_at: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    status: Arc<RwLock<ComponentHealth>>,
}

impl HealthChecker {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            status: Arc::new(RwLock::new(ComponentHealth {
                ledger_rpc: false,
                last_round_succeeded: None,
                last_round_at: None,
            })),
        }
    }

    pub async fn set_ledger_reachable(&self, reachable: bool) {
        self.status.write().await.ledger_rpc = reachable;
    }

    pub async fn record_round(&self, succeeded: bool) {
        let mut status = self.status.write().await;
        status.last_round_succeeded = Some(succeeded);
        status.last_round_at = Some(Utc::now());
    }

    pub async fn get_status(&self) -> HealthStatus {
        let components = self.status.read().await.clone();

        HealthStatus {
            status: if components.ledger_rpc {
                "healthy".to_string()
            } else {
                "degraded".to_string()
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            components,
        }
    }
}

impl Default for HealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_transitions() {
        let checker = HealthChecker::new();
        assert_eq!(checker.get_status().await.status, "degraded");

        checker.set_ledger_reachable(true).await;
        checker.record_round(true).await;

        let status = checker.get_status().await;
        assert_eq!(status.status, "healthy");
        assert_eq!(status.components.last_round_succeeded, Some(true));
        assert!(status.components.last_round_at.is_some());
    }
}
