//! Centralized shutdown management.
//!
//! Grounded on the teacher's watch-channel + registered-task-drain pattern,
//! scoped down to TrendRadar's background tasks: the retention sweep and the
//! TTL cache's expiry sweep. There is no topic dispatcher or OTLP collector to
//! drain first, so the sequence simplifies to "drain tasks, then close every
//! open day-store connection".

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::constants::SHUTDOWN_TIMEOUT_SECS;
use crate::data::backend::StorageBackend;

#[derive(Clone)]
pub struct ShutdownService {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
    backend: Arc<StorageBackend>,
}

impl ShutdownService {
    /// Takes the `StorageBackend` enum rather than the concrete local backend
    /// so shutdown closes whichever variant is actually active — the remote
    /// backend's own `cleanup()` also tears down its shadow local store and
    /// temp directory (§4.5, §9 "resource cleanup").
    pub fn new(backend: Arc<StorageBackend>) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
            handles: Arc::new(Mutex::new(Vec::new())),
            backend,
        }
    }

    pub async fn register(&self, handle: JoinHandle<()>) {
        self.handles.lock().await.push(handle);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.rx.clone()
    }

    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Trigger shutdown, drain background tasks, then close every cached
    /// per-day connection.
    pub async fn shutdown(&self) {
        tracing::debug!("initiating graceful shutdown");
        self.trigger();

        let handles = std::mem::take(&mut *self.handles.lock().await);
        let task_count = handles.len();
        tracing::debug!(count = task_count, "waiting for background tasks to finish");

        let timeout = Duration::from_secs(SHUTDOWN_TIMEOUT_SECS);
        match tokio::time::timeout(timeout, futures::future::join_all(handles)).await {
            Ok(_) => tracing::debug!("all background tasks completed"),
            Err(_) => tracing::warn!(timeout_secs = timeout.as_secs(), "timeout waiting for background tasks"),
        }

        tracing::debug!("closing day-store connections");
        self.backend.cleanup().await;
        tracing::debug!("shutdown complete");
    }

    pub fn wait(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.rx.clone();
        async move {
            let _ = rx.wait_for(|&v| v).await;
        }
    }

    pub fn install_signal_handlers(&self) {
        let service = self.clone();
        tokio::spawn(async move {
            let ctrl_c = async {
                tokio::signal::ctrl_c()
                    .await
                    .expect("failed to install Ctrl+C handler");
            };

            #[cfg(unix)]
            let terminate = async {
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to install SIGTERM handler")
                    .recv()
                    .await;
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => tracing::debug!("received Ctrl+C, shutting down"),
                _ = terminate => tracing::debug!("received SIGTERM, shutting down"),
            }

            service.trigger();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::AppStorage;
    use crate::data::local::LocalStorageBackend;

    async fn make_shutdown() -> ShutdownService {
        let (storage, _tmp) = AppStorage::init_for_test();
        let backend = Arc::new(StorageBackend::Local(Arc::new(LocalStorageBackend::new(Arc::new(storage)))));
        ShutdownService::new(backend)
    }

    #[tokio::test]
    async fn not_triggered_initially() {
        let shutdown = make_shutdown().await;
        assert!(!shutdown.is_triggered());
    }

    #[tokio::test]
    async fn trigger_flips_the_flag() {
        let shutdown = make_shutdown().await;
        shutdown.trigger();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn wait_returns_after_trigger() {
        let shutdown = make_shutdown().await;
        let handle = tokio::spawn(shutdown.wait());
        tokio::task::yield_now().await;
        shutdown.trigger();
        tokio::time::timeout(std::time::Duration::from_millis(200), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn subscriber_observes_shutdown() {
        let shutdown = make_shutdown().await;
        let rx = shutdown.subscribe();
        assert!(!*rx.borrow());
        shutdown.trigger();
        assert!(*rx.borrow());
    }
}
