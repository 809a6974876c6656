use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::{Command, LeaseStore, StoreError, Transaction};

#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    pub fn new(connection: MultiplexedConnection) -> Self {
        Self { connection }
    }

    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        Ok(Self::new(connection))
    }
}

#[async_trait]
impl LeaseStore for RedisStore {
    async fn exec(&self, tx: &Transaction) -> Result<(), StoreError> {
        if tx.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for command in tx.commands() {
            match command {
                Command::SetEx { name, value, ttl } => {
                    pipe.set_ex(name, value, ttl.as_secs().max(1)).ignore();
                }
                Command::Del(name) => {
                    pipe.del(name).ignore();
                }
                Command::SAdd { set, member } => {
                    pipe.sadd(set, member).ignore();
                }
                Command::SRem { set, member } => {
                    pipe.srem(set, member).ignore();
                }
                Command::ZAdd { set, member, score } => {
                    pipe.zadd(set, member, *score).ignore();
                }
                Command::ZRem { set, member } => {
                    pipe.zrem(set, member).ignore();
                }
            }
        }

        let mut conn = self.connection.clone();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        Ok(conn.exists(name).await?)
    }

    async fn spop(&self, set: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        Ok(conn.spop(set).await?)
    }

    async fn sismember(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.clone();
        Ok(conn.sismember(set, member).await?)
    }

    async fn zscore(&self, set: &str, member: &str) -> Result<Option<i64>, StoreError> {
        let mut conn = self.connection.clone();
        let score: Option<f64> = conn.zscore(set, member).await?;
        Ok(score.map(|s| s as i64))
    }

    async fn zrange_by_score(&self, set: &str, lo: i64, hi: i64) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection.clone();
        Ok(conn.zrangebyscore(set, lo, hi).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}
