use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::services::lifecycle::SupportSessionService;

/// Periodic sweep that force-ends connecting sessions nobody joined and
/// retries dispatch of anything still queued.
pub struct HousekeepingService {
    service: Arc<SupportSessionService>,
    interval: Duration,
    is_shutdown: RwLock<bool>,
}

impl HousekeepingService {
    pub fn new(service: Arc<SupportSessionService>, config: &AppConfig) -> Self {
        Self {
            service,
            interval: Duration::from_secs(config.housekeeping_interval_seconds.max(1)),
            is_shutdown: RwLock::new(false),
        }
    }

    /// One pass; returns the number of sessions expired.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> usize {
        let expired = self.service.expire_stale_connections(now).await;
        let dispatched = self.service.dispatch_waiting().await;
        debug!(
            "Housekeeping sweep: {} expired, {} dispatched, {} queued",
            expired,
            dispatched,
            self.service.queue_depth().await
        );
        expired
    }

    pub async fn run(&self) {
        info!("Housekeeping started, sweeping every {:?}", self.interval);
        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;

            if *self.is_shutdown.read().await {
                break;
            }

            self.sweep_once(Utc::now()).await;
        }

        info!("Housekeeping stopped");
    }

    pub async fn shutdown(&self) {
        *self.is_shutdown.write().await = true;
    }
}
