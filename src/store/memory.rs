//! In-process store backend.
//!
//! Everything lives behind a single mutex, so a transaction is applied
//! while no other caller can observe intermediate state. String TTLs are
//! checked lazily against the injected clock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;

use super::{Command, LeaseStore, StoreError, Transaction};
use crate::clock::{Clock, SystemClock};

#[derive(Default)]
struct Tables {
    strings: HashMap<String, Entry>,
    sets: HashMap<String, HashSet<String>>,
    zsets: HashMap<String, HashMap<String, i64>>,
}

struct Entry {
    value: String,
    expires_at: i64,
}

impl Tables {
    fn purge_if_expired(&mut self, name: &str, now: i64) {
        if self
            .strings
            .get(name)
            .is_some_and(|entry| entry.expires_at <= now)
        {
            self.strings.remove(name);
        }
    }

    fn apply(&mut self, command: &Command, now: i64) {
        match command {
            Command::SetEx { name, value, ttl } => {
                let ttl = ttl.as_secs().max(1) as i64;
                self.strings.insert(
                    name.clone(),
                    Entry {
                        value: value.clone(),
                        expires_at: now + ttl,
                    },
                );
            }
            Command::Del(name) => {
                self.strings.remove(name);
            }
            Command::SAdd { set, member } => {
                self.sets.entry(set.clone()).or_default().insert(member.clone());
            }
            Command::SRem { set, member } => {
                if let Some(members) = self.sets.get_mut(set) {
                    members.remove(member);
                    if members.is_empty() {
                        self.sets.remove(set);
                    }
                }
            }
            Command::ZAdd { set, member, score } => {
                self.zsets
                    .entry(set.clone())
                    .or_default()
                    .insert(member.clone(), *score);
            }
            Command::ZRem { set, member } => {
                if let Some(members) = self.zsets.get_mut(set) {
                    members.remove(member);
                    if members.is_empty() {
                        self.zsets.remove(set);
                    }
                }
            }
        }
    }

    fn pop_random(&mut self, set: &str) -> Option<String> {
        let members = self.sets.get_mut(set)?;
        let index = rand::rng().random_range(0..members.len());
        let member = members.iter().nth(index).cloned()?;
        members.remove(&member);
        if members.is_empty() {
            self.sets.remove(set);
        }
        Some(member)
    }
}

#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            clock,
        }
    }

    /// Number of live string records.
    pub fn record_count(&self) -> usize {
        let now = self.clock.now();
        let tables = self.tables.lock();
        tables
            .strings
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub fn record_value(&self, name: &str) -> Option<String> {
        let now = self.clock.now();
        let tables = self.tables.lock();
        tables
            .strings
            .get(name)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone())
    }

    pub fn set_len(&self, set: &str) -> usize {
        self.tables.lock().sets.get(set).map_or(0, HashSet::len)
    }

    pub fn zset_len(&self, set: &str) -> usize {
        self.tables.lock().zsets.get(set).map_or(0, HashMap::len)
    }

    /// Drops a string record as if its TTL had run out.
    pub fn expire_now(&self, name: &str) {
        self.tables.lock().strings.remove(name);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LeaseStore for MemoryStore {
    async fn exec(&self, tx: &Transaction) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut tables = self.tables.lock();
        for command in tx.commands() {
            tables.apply(command, now);
        }
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut tables = self.tables.lock();
        tables.purge_if_expired(name, now);
        Ok(tables.strings.contains_key(name))
    }

    async fn spop(&self, set: &str) -> Result<Option<String>, StoreError> {
        Ok(self.tables.lock().pop_random(set))
    }

    async fn sismember(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        let tables = self.tables.lock();
        Ok(tables.sets.get(set).is_some_and(|members| members.contains(member)))
    }

    async fn zscore(&self, set: &str, member: &str) -> Result<Option<i64>, StoreError> {
        let tables = self.tables.lock();
        Ok(tables
            .zsets
            .get(set)
            .and_then(|members| members.get(member).copied()))
    }

    async fn zrange_by_score(&self, set: &str, lo: i64, hi: i64) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.lock();
        let Some(members) = tables.zsets.get(set) else {
            return Ok(Vec::new());
        };

        let mut due: Vec<(&String, i64)> = members
            .iter()
            .filter(|(_, score)| (lo..=hi).contains(*score))
            .map(|(member, score)| (member, *score))
            .collect();
        due.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        Ok(due.into_iter().map(|(member, _)| member.clone()).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
