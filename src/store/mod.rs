//! Time-indexed store contract used by the lease manager.
//!
//! The store offers strings with TTL, unordered sets with random pop,
//! sorted sets with score range queries, and atomic multi-command
//! transactions. [`RedisStore`] is the production backend; [`MemoryStore`]
//! implements the same contract in-process for tests and single-node runs.

pub mod keys;
mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// One mutation inside a [`Transaction`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetEx {
        name: String,
        value: String,
        ttl: Duration,
    },
    Del(String),
    SAdd {
        set: String,
        member: String,
    },
    SRem {
        set: String,
        member: String,
    },
    ZAdd {
        set: String,
        member: String,
        score: i64,
    },
    ZRem {
        set: String,
        member: String,
    },
}

impl Command {
    /// Name of the string, set or sorted set the command writes.
    pub fn target(&self) -> &str {
        match self {
            Self::SetEx { name, .. } | Self::Del(name) => name,
            Self::SAdd { set, .. }
            | Self::SRem { set, .. }
            | Self::ZAdd { set, .. }
            | Self::ZRem { set, .. } => set,
        }
    }
}

/// Ordered batch of commands applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    commands: Vec<Command>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ex(mut self, name: impl Into<String>, value: impl Into<String>, ttl: Duration) -> Self {
        self.commands.push(Command::SetEx {
            name: name.into(),
            value: value.into(),
            ttl,
        });
        self
    }

    pub fn del(mut self, name: impl Into<String>) -> Self {
        self.commands.push(Command::Del(name.into()));
        self
    }

    pub fn sadd(mut self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.commands.push(Command::SAdd {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    pub fn srem(mut self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.commands.push(Command::SRem {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    pub fn zadd(mut self, set: impl Into<String>, member: impl Into<String>, score: i64) -> Self {
        self.commands.push(Command::ZAdd {
            set: set.into(),
            member: member.into(),
            score,
        });
        self
    }

    pub fn zrem(mut self, set: impl Into<String>, member: impl Into<String>) -> Self {
        self.commands.push(Command::ZRem {
            set: set.into(),
            member: member.into(),
        });
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Applies every command of `tx` atomically.
    async fn exec(&self, tx: &Transaction) -> Result<(), StoreError>;

    async fn exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Removes and returns one arbitrary member of `set`.
    async fn spop(&self, set: &str) -> Result<Option<String>, StoreError>;

    async fn sismember(&self, set: &str, member: &str) -> Result<bool, StoreError>;

    async fn zscore(&self, set: &str, member: &str) -> Result<Option<i64>, StoreError>;

    /// Members with `lo <= score <= hi`, lowest score first.
    async fn zrange_by_score(&self, set: &str, lo: i64, hi: i64) -> Result<Vec<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(#[source] redis::RedisError),

    #[error("store operation failed: {0}")]
    Operation(#[source] redis::RedisError),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            Self::Unavailable(err)
        } else {
            Self::Operation(err)
        }
    }
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
