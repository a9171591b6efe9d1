use futures::future::join_all;
use log::{error, info, warn};

use crate::core::BenchError;

use super::BackendAdapter;

/// One adapter and the outcome of connecting it.
pub struct Backend {
    adapter: Box<dyn BackendAdapter>,
    connect_error: Option<String>,
}

impl Backend {
    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    /// The adapter, or `None` if it never connected.
    pub fn adapter(&self) -> Option<&dyn BackendAdapter> {
        match self.connect_error {
            None => Some(self.adapter.as_ref()),
            Some(_) => None,
        }
    }

    pub fn connect_error(&self) -> Option<&str> {
        self.connect_error.as_deref()
    }
}

/// Sessions for every backend in the run, acquired once and closed once.
///
/// A backend that fails to connect stays in the set so the runner can record
/// its slots as failed. `close` must be awaited on every exit path.
pub struct Backends {
    backends: Vec<Backend>,
}

impl Backends {
    /// Connects all adapters concurrently. Fails only if none of them connects.
    pub async fn connect(adapters: Vec<Box<dyn BackendAdapter>>) -> Result<Self, BenchError> {
        let outcomes = join_all(adapters.iter().map(|adapter| adapter.connect())).await;
        let backends: Vec<Backend> = adapters
            .into_iter()
            .zip(outcomes)
            .map(|(adapter, outcome)| {
                let connect_error = outcome.err().map(|err| {
                    error!("[{}] {}", adapter.name(), err);
                    err.to_string()
                });
                Backend {
                    adapter,
                    connect_error,
                }
            })
            .collect();

        let backends = Self { backends };
        if backends.iter().all(|backend| backend.adapter().is_none()) {
            let reasons: Vec<String> = backends
                .iter()
                .filter_map(|backend| backend.connect_error().map(str::to_string))
                .collect();
            backends.close().await;
            return Err(BenchError::connection("all backends", reasons.join("; ")));
        }
        Ok(backends)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Backend> {
        self.backends.iter()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Disconnects every adapter, including ones whose connect failed.
    pub async fn close(self) {
        for backend in &self.backends {
            if let Err(err) = backend.adapter.disconnect().await {
                warn!("[{}] disconnect failed: {}", backend.name(), err);
            }
        }
        info!("closed {} backend session(s)", self.backends.len());
    }
}
