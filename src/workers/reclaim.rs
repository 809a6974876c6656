use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::lease::{KeyLeaseManager, LeaseError};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReclaimStats {
    pub expired: usize,
    pub returned: usize,
    pub orphaned: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl ReclaimStats {
    pub fn is_empty(&self) -> bool {
        self.expired == 0 && self.returned == 0 && self.orphaned == 0 && self.failed == 0
    }
}

/// One reclamation tick: expire keys past their lifetime, then hand
/// timed-out leases back to the pool.
///
/// Both sweeps always run. If either index query fails, the tick still
/// completes the other sweep and then reports the first query error.
pub async fn run_reclaim_cycle(manager: &KeyLeaseManager) -> Result<ReclaimStats, super::WorkerError> {
    let start = Instant::now();
    let mut stats = ReclaimStats::default();

    let now = manager.now();

    let expiry_sweep = sweep_expired(manager, now, &mut stats).await;
    if let Err(e) = &expiry_sweep {
        warn!(error = %e, "Expiry index query failed, running lease sweep anyway");
    }
    let lease_sweep = sweep_lease_timeouts(manager, now, &mut stats).await;

    stats.duration = start.elapsed();

    if stats.is_empty() {
        debug!("Reclaim cycle found nothing to do");
    } else {
        info!(
            expired = stats.expired,
            returned = stats.returned,
            orphaned = stats.orphaned,
            failed = stats.failed,
            duration_ms = stats.duration.as_millis() as u64,
            "Reclaim cycle completed"
        );
    }

    expiry_sweep?;
    lease_sweep?;
    Ok(stats)
}

async fn sweep_expired(
    manager: &KeyLeaseManager,
    now: i64,
    stats: &mut ReclaimStats,
) -> Result<(), LeaseError> {
    for key in manager.expired_keys(now).await? {
        match manager.purge(&key).await {
            Ok(()) => stats.expired += 1,
            Err(e) => {
                stats.failed += 1;
                warn!(key = %key, error = %e, "Failed to delete expired key");
            }
        }
    }
    Ok(())
}

async fn sweep_lease_timeouts(
    manager: &KeyLeaseManager,
    now: i64,
    stats: &mut ReclaimStats,
) -> Result<(), LeaseError> {
    for key in manager.lease_timeouts(now).await? {
        match manager.return_to_pool(&key).await {
            Ok(true) => stats.returned += 1,
            Ok(false) => stats.orphaned += 1,
            Err(e) => {
                stats.failed += 1;
                warn!(key = %key, error = %e, "Failed to return timed-out key");
            }
        }
    }
    Ok(())
}
