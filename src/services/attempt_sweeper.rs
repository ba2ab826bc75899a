use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::services::attempt_service::AttemptService;

/// Background worker that periodically times out overdue in-progress
/// attempts. Catches attempts whose in-process countdown was lost to a
/// server restart, and attempts abandoned by clients that closed the tab.
pub struct AttemptSweeper {
    attempt_service: Arc<AttemptService>,
    interval: Duration,
    worker_handle: RwLock<Option<JoinHandle<()>>>,
}

impl AttemptSweeper {
    pub fn new(attempt_service: Arc<AttemptService>, interval_secs: u64) -> Self {
        Self {
            attempt_service,
            interval: Duration::from_secs(interval_secs.max(1)),
            worker_handle: RwLock::new(None),
        }
    }

    /// Start the background worker. Should be called once at application
    /// startup.
    pub async fn start_worker(&self) {
        let attempt_service = Arc::clone(&self.attempt_service);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(err) = attempt_service.sweep_overdue(Utc::now()).await {
                    log::error!("Attempt sweep failed: {}", err);
                }
            }
        });

        let mut worker = self.worker_handle.write().await;
        if let Some(previous) = worker.replace(handle) {
            previous.abort();
        }

        log::info!(
            "Attempt sweeper started (interval: {}s)",
            self.interval.as_secs()
        );
    }

    /// Stop the background worker.
    pub async fn stop_worker(&self) {
        let mut worker = self.worker_handle.write().await;
        if let Some(handle) = worker.take() {
            handle.abort();
        }
    }
}
