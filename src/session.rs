//! Lazily-initialized backend handle shared by every operation.
//!
//! The first call to [`ClientHandle::get`] builds the backend through a
//! [`BackendFactory`] and verifies the credential with
//! `GET /api/auth/verify`. Concurrent first callers wait on the same
//! initialization; exactly one backend is ever constructed. A failed
//! initialization leaves the cell empty so the next call retries.

use async_trait::async_trait;
use content_relay_core::backend::Backend;
use content_relay_core::{RelayError, RelayResult};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

use crate::client::HttpBackend;
use crate::config::BackendConfig;

/// Builds a backend on first use.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn connect(&self) -> RelayResult<Arc<dyn Backend>>;
}

/// Factory for the reqwest-based [`HttpBackend`].
pub struct HttpBackendFactory {
    config: BackendConfig,
}

impl HttpBackendFactory {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackendFactory for HttpBackendFactory {
    async fn connect(&self) -> RelayResult<Arc<dyn Backend>> {
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::from_config(&self.config)?);
        Ok(backend)
    }
}

pub struct ClientHandle {
    factory: Option<Box<dyn BackendFactory>>,
    cell: OnceCell<Arc<dyn Backend>>,
}

impl ClientHandle {
    pub fn new(factory: Box<dyn BackendFactory>) -> Self {
        Self {
            factory: Some(factory),
            cell: OnceCell::new(),
        }
    }

    /// Handle for the configured HTTP backend.
    pub fn from_config(config: &BackendConfig) -> Self {
        Self::new(Box::new(HttpBackendFactory::new(config.clone())))
    }

    /// Handle that is already initialized. No auth check is made.
    pub fn from_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            factory: None,
            cell: OnceCell::new_with(Some(backend)),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    /// The shared backend, constructing and verifying it on first use.
    pub async fn get(&self) -> RelayResult<Arc<dyn Backend>> {
        let backend = self
            .cell
            .get_or_try_init(|| async {
                let factory = self
                    .factory
                    .as_ref()
                    .ok_or_else(|| RelayError::Transport("backend handle has no factory".into()))?;
                let backend = factory.connect().await?;
                backend.verify_auth().await?;
                info!("backend credential verified");
                Ok::<_, RelayError>(backend)
            })
            .await?;
        Ok(backend.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_relay_core::backend::scripted::{Op, ScriptedBackend};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingFactory {
        builds: Arc<AtomicUsize>,
        backend: Arc<ScriptedBackend>,
    }

    #[async_trait]
    impl BackendFactory for CountingFactory {
        async fn connect(&self) -> RelayResult<Arc<dyn Backend>> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let backend: Arc<dyn Backend> = self.backend.clone();
            Ok(backend)
        }
    }

    #[tokio::test]
    async fn test_concurrent_first_use_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let backend =
            Arc::new(ScriptedBackend::default().respond(Op::VerifyAuth, Ok(json!({"ok": true}))));
        let handle = Arc::new(ClientHandle::new(Box::new(CountingFactory {
            builds: builds.clone(),
            backend: backend.clone(),
        })));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let h = handle.clone();
                tokio::spawn(async move { h.get().await.map(|_| ()) })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(backend.calls(Op::VerifyAuth), 1);
        assert!(handle.is_initialized());
    }

    #[tokio::test]
    async fn test_failed_auth_leaves_handle_uninitialized() {
        let builds = Arc::new(AtomicUsize::new(0));
        let backend = Arc::new(
            ScriptedBackend::default()
                .push(Op::VerifyAuth, Err(RelayError::Auth("expired".into())))
                .respond(Op::VerifyAuth, Ok(json!({"ok": true}))),
        );
        let handle = ClientHandle::new(Box::new(CountingFactory {
            builds: builds.clone(),
            backend,
        }));

        let err = handle.get().await.err().unwrap();
        assert!(err.is_auth());
        assert!(!handle.is_initialized());

        handle.get().await.unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_from_backend_skips_auth_check() {
        let backend = Arc::new(ScriptedBackend::default());
        let handle = ClientHandle::from_backend(backend.clone());
        handle.get().await.unwrap();
        assert_eq!(backend.calls(Op::VerifyAuth), 0);
    }
}
