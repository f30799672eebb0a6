//! One-time backend initialization shared by every caller.

use tokio::sync::OnceCell;

use crate::backend::ReleaseBackend;
use crate::error::{CatalogError, Result};

/// Runs [`ReleaseBackend::init`] at most once for the lifetime of the guard.
///
/// Concurrent first callers all wait on the same in-flight initialization.
/// The outcome is memoized, failures included: a backend that failed to
/// initialize keeps reporting that failure instead of being retried.
#[derive(Debug, Default)]
pub struct InitGuard {
    outcome: OnceCell<Result<(), String>>,
}

impl InitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize `backend` if nobody has yet, then report the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Backend`] with the original failure message if
    /// initialization failed.
    pub async fn ensure(&self, backend: &dyn ReleaseBackend) -> Result<()> {
        let outcome = self
            .outcome
            .get_or_init(|| async {
                tracing::debug!(backend = %backend.key(), "initializing backend");
                backend.init().await.map_err(|e| {
                    tracing::warn!(backend = %backend.key(), "backend init failed: {e:#}");
                    format!("{e:#}")
                })
            })
            .await;

        outcome.clone().map_err(CatalogError::Backend)
    }

    /// Whether initialization has completed (successfully or not).
    pub fn is_initialized(&self) -> bool {
        self.outcome.initialized()
    }
}
