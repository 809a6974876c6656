mod reclaim;

use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::lease::{KeyLeaseManager, LeaseError};
use crate::store::keys::RECLAIM_INTERVAL;

pub use reclaim::{run_reclaim_cycle, ReclaimStats};

/// Owns the background reclamation task.
pub struct WorkerManager {
    manager: KeyLeaseManager,
    interval: Duration,
    shutdown_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerManager {
    pub fn new(manager: KeyLeaseManager) -> Self {
        Self::with_interval(manager, RECLAIM_INTERVAL)
    }

    pub fn with_interval(manager: KeyLeaseManager, interval: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            manager,
            interval,
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub async fn start(&self) {
        let mut slot = self.handle.lock().await;
        if slot.is_some() {
            warn!("Reclaim worker already running");
            return;
        }

        let manager = self.manager.clone();
        let interval = self.interval;
        let shutdown_rx = self.shutdown_tx.subscribe();
        *slot = Some(tokio::spawn(reclaim_loop(manager, interval, shutdown_rx)));

        info!(interval_ms = interval.as_millis() as u64, "Reclaim worker started");
    }

    /// Stops scheduling ticks and waits for an in-flight tick to finish.
    pub async fn stop(&self) {
        let Some(handle) = self.handle.lock().await.take() else {
            return;
        };

        info!("Stopping reclaim worker...");
        let _ = self.shutdown_tx.send(());

        if let Err(e) = handle.await {
            warn!(error = %e, "Reclaim worker task ended abnormally");
        }
        info!("Reclaim worker stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

async fn reclaim_loop(
    manager: KeyLeaseManager,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {}
        }

        if let Err(e) = run_reclaim_cycle(&manager).await {
            error!(error = %e, "Reclaim worker error");
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Lease store error: {0}")]
    Lease(#[from] LeaseError),
}
