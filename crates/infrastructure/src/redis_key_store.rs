//! Redis-backed key store speaking RESP.

use std::time::Duration;

use async_trait::async_trait;
use fitgate_application::{KeyStore, KeyTtl};
use fitgate_core::{StoreResult, TransportError};
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use crate::store_timeout::within_deadline;

/// Redis implementation of the key store port.
#[derive(Clone)]
pub struct RedisKeyStore {
    client: redis::Client,
    timeout: Duration,
}

impl RedisKeyStore {
    /// Creates a store with a configured Redis client and per-call timeout.
    #[must_use]
    pub fn new(client: redis::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Opens a client for `redis_url`. No connection is made until first use.
    pub fn open(redis_url: &str, timeout: Duration) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url).map_err(|error| {
            TransportError::Connection(format!("invalid redis url: {error}"))
        })?;
        Ok(Self::new(client, timeout))
    }

    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| {
                TransportError::Connection(format!("failed to connect to redis: {error}"))
            })
    }
}

fn command_error(command: &str, key: &str, error: redis::RedisError) -> TransportError {
    if error.is_io_error() {
        return TransportError::Connection(format!(
            "redis connection lost during {command} '{key}': {error}"
        ));
    }
    TransportError::Command(format!("redis {command} '{key}' failed: {error}"))
}

fn expiry_seconds(ttl_seconds: u64) -> i64 {
    i64::try_from(ttl_seconds).unwrap_or(i64::MAX)
}

#[async_trait]
impl KeyStore for RedisKeyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        within_deadline(self.timeout, async {
            let mut connection = self.connection().await?;
            let value: Option<String> = connection
                .get(key)
                .await
                .map_err(|error| command_error("GET", key, error))?;
            Ok(value)
        })
        .await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        within_deadline(self.timeout, async {
            let mut connection = self.connection().await?;
            connection
                .set_ex::<_, _, ()>(key, value, ttl_seconds)
                .await
                .map_err(|error| command_error("SETEX", key, error))
        })
        .await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        within_deadline(self.timeout, async {
            let mut connection = self.connection().await?;
            connection
                .del::<_, ()>(key)
                .await
                .map_err(|error| command_error("DEL", key, error))
        })
        .await
    }

    async fn increment(&self, key: &str) -> StoreResult<i64> {
        within_deadline(self.timeout, async {
            let mut connection = self.connection().await?;
            let count: i64 = connection
                .incr(key, 1_i64)
                .await
                .map_err(|error| command_error("INCR", key, error))?;
            Ok(count)
        })
        .await
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        within_deadline(self.timeout, async {
            let mut connection = self.connection().await?;
            let applied: bool = connection
                .expire(key, expiry_seconds(ttl_seconds))
                .await
                .map_err(|error| command_error("EXPIRE", key, error))?;
            Ok(applied)
        })
        .await
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        within_deadline(self.timeout, async {
            let mut connection = self.connection().await?;
            let raw: i64 = connection
                .ttl(key)
                .await
                .map_err(|error| command_error("TTL", key, error))?;
            Ok(KeyTtl::from_raw(raw))
        })
        .await
    }

    async fn ping(&self) -> StoreResult<()> {
        within_deadline(self.timeout, async {
            let mut connection = self.connection().await?;
            let reply: String = connection
                .ping()
                .await
                .map_err(|error| command_error("PING", "", error))?;
            if reply == "PONG" {
                Ok(())
            } else {
                Err(TransportError::MalformedResponse(format!(
                    "unexpected redis ping response: {reply}"
                )))
            }
        })
        .await
    }

    async fn add_member(&self, set_key: &str, member: &str) -> StoreResult<()> {
        within_deadline(self.timeout, async {
            let mut connection = self.connection().await?;
            connection
                .sadd::<_, _, ()>(set_key, member)
                .await
                .map_err(|error| command_error("SADD", set_key, error))
        })
        .await
    }

    async fn members(&self, set_key: &str) -> StoreResult<Vec<String>> {
        within_deadline(self.timeout, async {
            let mut connection = self.connection().await?;
            let members: Vec<String> = connection
                .smembers(set_key)
                .await
                .map_err(|error| command_error("SMEMBERS", set_key, error))?;
            Ok(members)
        })
        .await
    }

    async fn remove_member(&self, set_key: &str, member: &str) -> StoreResult<()> {
        within_deadline(self.timeout, async {
            let mut connection = self.connection().await?;
            connection
                .srem::<_, _, ()>(set_key, member)
                .await
                .map_err(|error| command_error("SREM", set_key, error))
        })
        .await
    }
}
