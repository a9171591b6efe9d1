//! Aerospike as a namespaced record store.
//!
//! Every item becomes a record addressed by `(namespace, set, key)` holding a
//! single `value` bin. The client is blocking, so each request runs on the
//! tokio blocking pool.

use std::collections::HashMap;
use std::sync::Arc;

use aerospike::errors::{Error as AerospikeError, ErrorKind};
use aerospike::{
    BatchPolicy, BatchRead, Bin, Bins, Client, ClientPolicy, Key, ReadPolicy, ResultCode, Value,
    WritePolicy,
};
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::RwLock;

use crate::conf::AerospikeConfig;
use crate::core::BenchError;
use crate::workload::TestItem;

use super::BackendAdapter;

const NAME: &str = "aerospike";
const VALUE_BIN: &str = "value";

pub struct AerospikeBackend {
    config: AerospikeConfig,
    client: RwLock<Option<Arc<Client>>>,
}

impl AerospikeBackend {
    pub fn new(config: AerospikeConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
        }
    }

    async fn client(&self) -> Result<Arc<Client>, BenchError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| BenchError::NotConnected(NAME.to_string()))
    }

    fn record_key(&self, key: &str) -> Result<Key, BenchError> {
        Key::new(
            self.config.namespace.as_str(),
            self.config.set.as_str(),
            Value::from(key),
        )
        .map_err(|e| BenchError::operation(NAME, e))
    }

    /// Keys for every item, built before any write is issued.
    fn records(&self, items: &[TestItem]) -> Result<Vec<(Key, String)>, BenchError> {
        items
            .iter()
            .map(|item| Ok::<_, BenchError>((self.record_key(&item.key)?, item.value.clone())))
            .collect()
    }

    fn client_policy(&self) -> Result<ClientPolicy, BenchError> {
        let mut policy = ClientPolicy::default();
        policy.timeout = Some(self.config.timeout);
        if let (Some(user), Some(password)) = (&self.config.user, &self.config.password) {
            policy
                .set_user_password(user.clone(), password.clone())
                .map_err(|e| BenchError::connection(NAME, e))?;
        }
        Ok(policy)
    }

    fn write_policy(&self) -> WritePolicy {
        let mut policy = WritePolicy::default();
        policy.base_policy.timeout = Some(self.config.timeout);
        policy.base_policy.max_retries = Some(self.config.max_retries);
        policy.send_key = self.config.send_key;
        policy
    }

    fn read_policy(&self) -> ReadPolicy {
        let mut policy = ReadPolicy::default();
        policy.timeout = Some(self.config.timeout);
        policy.max_retries = Some(self.config.max_retries);
        policy
    }

    fn batch_policy(&self) -> BatchPolicy {
        let mut policy = BatchPolicy::default();
        policy.base_policy.timeout = Some(self.config.timeout);
        policy.base_policy.max_retries = Some(self.config.max_retries);
        policy
    }

    /// Runs `request` against the shared client on the blocking pool.
    async fn blocking<T, F>(&self, request: F) -> Result<T, BenchError>
    where
        F: FnOnce(&Client) -> Result<T, String> + Send + 'static,
        T: Send + 'static,
    {
        let client = self.client().await?;
        tokio::task::spawn_blocking(move || request(&client))
            .await
            .map_err(|e| BenchError::operation(NAME, e))?
            .map_err(|e| BenchError::operation(NAME, e))
    }
}

fn bin_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.as_string(),
    }
}

fn is_not_found(err: &AerospikeError) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ServerError(ResultCode::KeyNotFoundError)
    )
}

#[async_trait]
impl BackendAdapter for AerospikeBackend {
    fn name(&self) -> &str {
        NAME
    }

    async fn connect(&self) -> Result<(), BenchError> {
        let mut client = self.client.write().await;
        if client.is_some() {
            debug!("[{NAME}] already connected");
            return Ok(());
        }

        let policy = self.client_policy()?;
        let hosts = self.config.hosts.clone();
        let connected = tokio::task::spawn_blocking(move || {
            Client::new(&policy, &hosts).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| BenchError::connection(NAME, e))?
        .map_err(|e| BenchError::connection(NAME, e))?;

        *client = Some(Arc::new(connected));
        info!("[{NAME}] connected to {}", self.config.hosts);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BenchError> {
        let Some(client) = self.client.write().await.take() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || client.close().map_err(|e| e.to_string()))
            .await
            .map_err(|e| BenchError::operation(NAME, e))?
            .map_err(|e| BenchError::operation(NAME, e))?;
        info!("[{NAME}] connection closed");
        Ok(())
    }

    async fn put_one(&self, key: &str, value: &str) -> Result<(), BenchError> {
        let key = self.record_key(key)?;
        let value = value.to_string();
        let policy = self.write_policy();
        self.blocking(move |client| {
            let bins = [Bin::new(VALUE_BIN, Value::from(value))];
            client.put(&policy, &key, &bins).map_err(|e| e.to_string())
        })
        .await
    }

    async fn get_one(&self, key: &str) -> Result<Option<String>, BenchError> {
        let key = self.record_key(key)?;
        let policy = self.read_policy();
        self.blocking(move |client| match client.get(&policy, &key, Bins::All) {
            Ok(record) => Ok(record.bins.get(VALUE_BIN).map(bin_to_string)),
            Err(err) if is_not_found(&err) => Ok(None),
            Err(err) => Err(err.to_string()),
        })
        .await
    }

    /// No native batch write in the client: one put per record, all in flight at once.
    async fn put_batch(&self, items: &[TestItem]) -> Result<(), BenchError> {
        let client = self.client().await?;
        let records = self.records(items)?;

        let mut handles = Vec::with_capacity(records.len());
        for (key, value) in records {
            let client = client.clone();
            let policy = self.write_policy();
            handles.push(tokio::task::spawn_blocking(move || {
                let bins = [Bin::new(VALUE_BIN, Value::from(value))];
                client.put(&policy, &key, &bins).map_err(|e| e.to_string())
            }));
        }

        let total = handles.len();
        let mut failed = 0;
        let mut first_error = None;
        for handle in handles {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(join_err.to_string()),
            };
            if let Err(err) = outcome {
                failed += 1;
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            None => Ok(()),
            Some(err) => {
                warn!("[{NAME}] {failed} of {total} batch writes failed");
                Err(BenchError::operation(
                    NAME,
                    format!("{failed} of {total} batch writes failed, first: {err}"),
                ))
            }
        }
    }

    async fn get_batch(
        &self,
        keys: &[String],
    ) -> Result<HashMap<String, Option<String>>, BenchError> {
        let record_keys = keys
            .iter()
            .map(|key| self.record_key(key))
            .collect::<Result<Vec<_>, _>>()?;
        let policy = self.batch_policy();
        let values = self
            .blocking(move |client| {
                let bins = Bins::All;
                let reads = record_keys
                    .into_iter()
                    .map(|key| BatchRead::new(key, &bins))
                    .collect();
                let results = client
                    .batch_get(&policy, reads)
                    .map_err(|e| e.to_string())?;
                Ok(results
                    .into_iter()
                    .map(|read| {
                        read.record
                            .and_then(|record| record.bins.get(VALUE_BIN).map(bin_to_string))
                    })
                    .collect::<Vec<_>>())
            })
            .await?;

        if values.len() != keys.len() {
            return Err(BenchError::operation(
                NAME,
                format!("batch read answered {} of {} keys", values.len(), keys.len()),
            ));
        }
        Ok(keys.iter().cloned().zip(values).collect())
    }

    /// Truncates the configured set.
    async fn reset(&self) -> Result<bool, BenchError> {
        let namespace = self.config.namespace.clone();
        let set = self.config.set.clone();
        let policy = self.write_policy();
        self.blocking(move |client| {
            client
                .truncate(&policy, &namespace, &set, 0)
                .map_err(|e| e.to_string())
        })
        .await?;
        Ok(true)
    }
}
