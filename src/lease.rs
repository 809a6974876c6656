//! Key lease manager.
//!
//! Owns the four store structures for every key: the existence record,
//! the available set, the expiry index and the block index. Each
//! operation issues its multi-structure mutation as a single transaction.
//! Unknown or malformed keys are reported as `Ok(false)`/`Ok(None)`; only
//! store failures surface as errors.

use std::sync::Arc;

use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::store::keys::{self, BLOCK_TIME, EXPIRY_TIME, KEY_BYTES, RECORD_VALUE};
use crate::store::{LeaseStore, StoreError, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    Unknown,
    Available,
    Leased,
    /// Known, but in neither the available set nor the block index.
    Idle,
}

#[derive(Debug, thiserror::Error)]
pub enum LeaseError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LeaseError {
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_unavailable(),
        }
    }
}

#[derive(Clone)]
pub struct KeyLeaseManager {
    store: Arc<dyn LeaseStore>,
    clock: Arc<dyn Clock>,
}

impl KeyLeaseManager {
    pub fn new(store: Arc<dyn LeaseStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn LeaseStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<dyn LeaseStore> {
        &self.store
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    pub async fn generate(&self) -> Result<String, LeaseError> {
        let key = new_key();
        self.store.exec(&self.mark_available(&key)).await?;
        Ok(key)
    }

    /// Leases one arbitrary available key.
    ///
    /// `Ok(None)` means the pool is empty, or the drawn key expired between
    /// the pop and the existence check; callers may retry.
    pub async fn acquire(&self) -> Result<Option<String>, LeaseError> {
        let Some(key) = self.store.spop(keys::available_set()).await? else {
            return Ok(None);
        };

        if !self.store.exists(&keys::record_key(&key)).await? {
            self.purge(&key).await?;
            return Ok(None);
        }

        // The record TTL is left alone; only the expiry index moves.
        let now = self.now();
        let tx = Transaction::new()
            .zadd(keys::block_index(), key.as_str(), now + secs(BLOCK_TIME))
            .zadd(keys::expiry_index(), key.as_str(), now + secs(EXPIRY_TIME));
        if let Err(err) = self.store.exec(&tx).await {
            // Put the popped key back so it is not lost outside every index.
            let restore = Transaction::new().sadd(keys::available_set(), key.as_str());
            let _ = self.store.exec(&restore).await;
            return Err(err.into());
        }

        Ok(Some(key))
    }

    /// Returns a leased key to the pool ahead of its block timeout.
    pub async fn release(&self, key: &str) -> Result<bool, LeaseError> {
        if !self.is_known(key).await? {
            return Ok(false);
        }

        let tx = self.mark_available(key).zrem(keys::block_index(), key);
        self.store.exec(&tx).await?;
        Ok(true)
    }

    /// Refreshes the record TTL and expiry index. Never adds the key to the
    /// available set, so a leased key stays leased.
    pub async fn renew(&self, key: &str) -> Result<bool, LeaseError> {
        if !self.is_known(key).await? {
            return Ok(false);
        }

        let tx = Transaction::new()
            .set_ex(keys::record_key(key), RECORD_VALUE, EXPIRY_TIME)
            .zadd(keys::expiry_index(), key, self.now() + secs(EXPIRY_TIME));
        self.store.exec(&tx).await?;
        Ok(true)
    }

    /// Removes every trace of `key`. Idempotent for well-formed keys.
    pub async fn delete(&self, key: &str) -> Result<bool, LeaseError> {
        if !keys::is_valid_key(key) {
            return Ok(false);
        }

        self.purge(key).await?;
        Ok(true)
    }

    /// Full cleanup without input validation, for members read back from
    /// the store itself.
    pub async fn purge(&self, key: &str) -> Result<(), LeaseError> {
        let tx = Transaction::new()
            .del(keys::record_key(key))
            .srem(keys::available_set(), key)
            .zrem(keys::expiry_index(), key)
            .zrem(keys::block_index(), key);
        self.store.exec(&tx).await?;
        Ok(())
    }

    pub async fn status(&self, key: &str) -> Result<KeyStatus, LeaseError> {
        if !self.is_known(key).await? {
            return Ok(KeyStatus::Unknown);
        }

        if self.store.zscore(keys::block_index(), key).await?.is_some() {
            return Ok(KeyStatus::Leased);
        }

        if self.store.sismember(keys::available_set(), key).await? {
            Ok(KeyStatus::Available)
        } else {
            Ok(KeyStatus::Idle)
        }
    }

    /// Keys whose expiry index score is at or before `now`.
    pub async fn expired_keys(&self, now: i64) -> Result<Vec<String>, LeaseError> {
        Ok(self.store.zrange_by_score(keys::expiry_index(), 0, now).await?)
    }

    /// Keys whose lease deadline is at or before `now`.
    pub async fn lease_timeouts(&self, now: i64) -> Result<Vec<String>, LeaseError> {
        Ok(self.store.zrange_by_score(keys::block_index(), 0, now).await?)
    }

    /// Drops `key` from the block index and, if its record is still alive,
    /// makes it available again in the same transaction. Returns whether the
    /// key went back to the pool. On failure the block entry is kept, so the
    /// next sweep retries.
    pub async fn return_to_pool(&self, key: &str) -> Result<bool, LeaseError> {
        if !self.store.exists(&keys::record_key(key)).await? {
            self.store
                .exec(&Transaction::new().zrem(keys::block_index(), key))
                .await?;
            return Ok(false);
        }

        let tx = self.mark_available(key).zrem(keys::block_index(), key);
        self.store.exec(&tx).await?;
        Ok(true)
    }

    async fn is_known(&self, key: &str) -> Result<bool, StoreError> {
        if !keys::is_valid_key(key) {
            return Ok(false);
        }
        self.store.exists(&keys::record_key(key)).await
    }

    fn mark_available(&self, key: &str) -> Transaction {
        Transaction::new()
            .set_ex(keys::record_key(key), RECORD_VALUE, EXPIRY_TIME)
            .sadd(keys::available_set(), key)
            .zadd(keys::expiry_index(), key, self.now() + secs(EXPIRY_TIME))
    }
}

fn new_key() -> String {
    let bytes: [u8; KEY_BYTES] = rand::random();
    hex::encode(bytes)
}

fn secs(duration: std::time::Duration) -> i64 {
    duration.as_secs() as i64
}
