#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use serde_json::Value;
use tower::ServiceExt;

use key_lease_server::clock::ManualClock;
use key_lease_server::lease::KeyLeaseManager;
use key_lease_server::store::{LeaseStore, MemoryStore, StoreError, Transaction};

pub const START: i64 = 1_700_000_000;

/// Wraps [`MemoryStore`] and fails selected calls as a broken Redis would.
pub struct FlakyStore {
    inner: MemoryStore,
    down: AtomicBool,
    failing_writes: Mutex<Vec<String>>,
    failing_ranges: Mutex<Vec<String>>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            down: AtomicBool::new(false),
            failing_writes: Mutex::new(Vec::new()),
            failing_ranges: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails while the store is down.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// The next transaction writing `target` fails without applying anything.
    pub fn fail_next_write_to(&self, target: &str) {
        self.failing_writes.lock().push(target.to_string());
    }

    /// The next range query on `set` fails.
    pub fn fail_next_range_on(&self, set: &str) {
        self.failing_ranges.lock().push(set.to_string());
    }

    fn check_down(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(connection_refused());
        }
        Ok(())
    }

    fn take_fault(faults: &Mutex<Vec<String>>, matches: impl Fn(&str) -> bool) -> bool {
        let mut faults = faults.lock();
        match faults.iter().position(|target| matches(target.as_str())) {
            Some(index) => {
                faults.remove(index);
                true
            }
            None => false,
        }
    }
}

pub fn connection_refused() -> StoreError {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
    StoreError::from(redis::RedisError::from(io))
}

#[async_trait]
impl LeaseStore for FlakyStore {
    async fn exec(&self, tx: &Transaction) -> Result<(), StoreError> {
        self.check_down()?;
        let hit = Self::take_fault(&self.failing_writes, |target| {
            tx.commands().iter().any(|command| command.target() == target)
        });
        if hit {
            return Err(connection_refused());
        }
        self.inner.exec(tx).await
    }

    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        self.check_down()?;
        self.inner.exists(name).await
    }

    async fn spop(&self, set: &str) -> Result<Option<String>, StoreError> {
        self.check_down()?;
        self.inner.spop(set).await
    }

    async fn sismember(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        self.check_down()?;
        self.inner.sismember(set, member).await
    }

    async fn zscore(&self, set: &str, member: &str) -> Result<Option<i64>, StoreError> {
        self.check_down()?;
        self.inner.zscore(set, member).await
    }

    async fn zrange_by_score(&self, set: &str, lo: i64, hi: i64) -> Result<Vec<String>, StoreError> {
        self.check_down()?;
        if Self::take_fault(&self.failing_ranges, |target| target == set) {
            return Err(connection_refused());
        }
        self.inner.zrange_by_score(set, lo, hi).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_down()?;
        self.inner.ping().await
    }
}

pub struct TestContext {
    pub manager: KeyLeaseManager,
    pub store: MemoryStore,
    pub faults: Arc<FlakyStore>,
    pub clock: ManualClock,
}

impl TestContext {
    pub fn new() -> Self {
        let clock = ManualClock::new(START);
        let store = MemoryStore::with_clock(Arc::new(clock.clone()));
        let faults = Arc::new(FlakyStore::new(store.clone()));
        let manager = KeyLeaseManager::with_clock(faults.clone(), Arc::new(clock.clone()));
        Self {
            manager,
            store,
            faults,
            clock,
        }
    }

    pub fn app(&self) -> Router {
        key_lease_server::create_app(self.manager.clone(), "memory")
    }
}

pub async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
