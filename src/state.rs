use std::time::{Instant, SystemTime};

use crate::lease::KeyLeaseManager;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    manager: KeyLeaseManager,
    store_backend: &'static str,
}

impl AppState {
    pub fn new(manager: KeyLeaseManager, store_backend: &'static str) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            manager,
            store_backend,
        }
    }

    pub fn manager(&self) -> &KeyLeaseManager {
        &self.manager
    }

    pub fn store_backend(&self) -> &'static str {
        self.store_backend
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }
}
