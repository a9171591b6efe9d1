//! Redis as a flat key/value store.
//!
//! Keys map one to one (plus an optional prefix), batches are single
//! pipelines, and memory is read from `INFO memory`.

use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, info};
use redis::{AsyncCommands, AsyncConnectionConfig};
use redis::aio::MultiplexedConnection;
use tokio::sync::RwLock;

use crate::conf::RedisConfig;
use crate::core::BenchError;
use crate::workload::TestItem;

use super::BackendAdapter;

const NAME: &str = "redis";

pub struct RedisBackend {
    config: RedisConfig,
    conn: RwLock<Option<MultiplexedConnection>>,
}

impl RedisBackend {
    pub fn new(config: RedisConfig) -> Self {
        Self {
            config,
            conn: RwLock::new(None),
        }
    }

    fn key(&self, key: &str) -> String {
        if self.config.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}{}", self.config.key_prefix, key)
        }
    }

    fn connection_config(&self) -> AsyncConnectionConfig {
        let config =
            AsyncConnectionConfig::new().set_connection_timeout(self.config.connect_timeout);
        match self.config.response_timeout {
            Some(timeout) => config.set_response_timeout(timeout),
            None => config,
        }
    }

    /// Multiplexed connections are cheap handles onto one socket.
    async fn connection(&self) -> Result<MultiplexedConnection, BenchError> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or_else(|| BenchError::NotConnected(NAME.to_string()))
    }
}

/// Extracts `used_memory` from an `INFO memory` reply.
pub fn parse_used_memory(info: &str) -> Option<u64> {
    info.lines()
        .find_map(|line| line.strip_prefix("used_memory:"))
        .and_then(|value| value.trim().parse().ok())
}

fn op_err(err: redis::RedisError) -> BenchError {
    BenchError::operation(NAME, err)
}

#[async_trait]
impl BackendAdapter for RedisBackend {
    fn name(&self) -> &str {
        NAME
    }

    async fn connect(&self) -> Result<(), BenchError> {
        let mut conn = self.conn.write().await;
        if conn.is_some() {
            debug!("[{NAME}] already connected");
            return Ok(());
        }

        let client = redis::Client::open(self.config.url.as_str())
            .map_err(|e| BenchError::connection(NAME, e))?;
        let connection = client
            .get_multiplexed_async_connection_with_config(&self.connection_config())
            .await
            .map_err(|e| BenchError::connection(NAME, e))?;

        *conn = Some(connection);
        info!("[{NAME}] connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BenchError> {
        if self.conn.write().await.take().is_some() {
            info!("[{NAME}] connection closed");
        }
        Ok(())
    }

    async fn put_one(&self, key: &str, value: &str) -> Result<(), BenchError> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(self.key(key), value)
            .await
            .map_err(op_err)
    }

    async fn get_one(&self, key: &str) -> Result<Option<String>, BenchError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(self.key(key))
            .await
            .map_err(op_err)
    }

    async fn put_batch(&self, items: &[TestItem]) -> Result<(), BenchError> {
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for item in items {
            pipe.set(self.key(&item.key), &item.value).ignore();
        }
        pipe.query_async::<()>(&mut conn).await.map_err(op_err)
    }

    async fn get_batch(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, Option<String>>, BenchError> {
        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.get(self.key(key));
        }
        let values: Vec<Option<String>> = pipe.query_async(&mut conn).await.map_err(op_err)?;
        if values.len() != keys.len() {
            return Err(BenchError::operation(
                NAME,
                format!("pipeline answered {} of {} reads", values.len(), keys.len()),
            ));
        }
        Ok(keys.iter().cloned().zip(values).collect())
    }

    /// Flushes the configured database only.
    async fn reset(&self) -> Result<bool, BenchError> {
        let mut conn = self.connection().await?;
        redis::cmd("FLUSHDB")
            .query_async::<()>(&mut conn)
            .await
            .map_err(op_err)?;
        Ok(true)
    }

    /// Server-wide `used_memory`, not a per-key cost.
    async fn memory_snapshot(&self) -> Result<Option<u64>, BenchError> {
        let mut conn = self.connection().await?;
        let info: String = redis::cmd("INFO")
            .arg("memory")
            .query_async(&mut conn)
            .await
            .map_err(op_err)?;
        parse_used_memory(&info)
            .map(Some)
            .ok_or_else(|| BenchError::operation(NAME, "INFO memory reply has no used_memory"))
    }
}
