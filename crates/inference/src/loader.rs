use crate::detector::Detector;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::OnceCell;

pub type DetectorHandle = Arc<dyn Detector>;

type LoadFn = dyn Fn() -> anyhow::Result<DetectorHandle> + Send + Sync;

/// Cached reason a model load failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct LoadError {
    reason: String,
}

impl LoadError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Process-wide model lifecycle.
///
/// Starts as `NotLoaded` and moves exactly once to `Loaded` or `Failed`.
/// Neither terminal state is ever left: a failed load is not retried for the
/// lifetime of the process.
#[derive(Clone)]
pub enum ModelState {
    NotLoaded,
    Loaded(DetectorHandle),
    Failed(LoadError),
}

impl ModelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelState::NotLoaded => "not_loaded",
            ModelState::Loaded(_) => "loaded",
            ModelState::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelState::NotLoaded => f.write_str("NotLoaded"),
            ModelState::Loaded(_) => f.write_str("Loaded(..)"),
            ModelState::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

struct Inner {
    identifier: String,
    load: Box<LoadFn>,
    outcome: OnceCell<Result<DetectorHandle, LoadError>>,
}

/// Lazily loads the detector on first use and memoizes the outcome.
///
/// Concurrent first callers share a single load; every caller observes the
/// same result. Once resolved, reads take no lock.
#[derive(Clone)]
pub struct ModelLoader {
    inner: Arc<Inner>,
}

impl ModelLoader {
    /// `identifier` names the weights in logs; `load` runs on the blocking
    /// pool at most once.
    pub fn new<F>(identifier: impl Into<String>, load: F) -> Self
    where
        F: Fn() -> anyhow::Result<DetectorHandle> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                identifier: identifier.into(),
                load: Box::new(load),
                outcome: OnceCell::new(),
            }),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.inner.identifier
    }

    /// Return the loaded detector, loading it first if this is the first call.
    pub async fn ensure_ready(&self) -> Result<DetectorHandle, LoadError> {
        if let Some(outcome) = self.inner.outcome.get() {
            return outcome.clone();
        }

        // Detached so a caller dropped mid-load cannot abandon the load and
        // let the next caller start a second one.
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let outcome = inner
                .outcome
                .get_or_init(|| Self::load_once(Arc::clone(&inner)))
                .await;
            outcome.clone()
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(LoadError::new(format!("model load task failed: {}", e))),
        }
    }

    async fn load_once(inner: Arc<Inner>) -> Result<DetectorHandle, LoadError> {
        tracing::info!(model = %inner.identifier, "Loading detection model");
        let start = Instant::now();

        let identifier = inner.identifier.clone();
        let outcome = match tokio::task::spawn_blocking(move || (inner.load)()).await {
            Ok(Ok(detector)) => Ok(detector),
            Ok(Err(e)) => Err(LoadError::new(format!(
                "Failed to load model {}: {:#}",
                identifier, e
            ))),
            Err(e) => Err(LoadError::new(format!(
                "Failed to load model {}: loader panicked: {}",
                identifier, e
            ))),
        };

        match &outcome {
            Ok(_) => tracing::info!(
                model = %identifier,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Model loaded successfully"
            ),
            Err(e) => tracing::error!(
                model = %identifier,
                error = %e,
                "Model failed to load; it will not be retried"
            ),
        }

        outcome
    }

    /// Current state without triggering a load.
    pub fn state(&self) -> ModelState {
        match self.inner.outcome.get() {
            None => ModelState::NotLoaded,
            Some(Ok(detector)) => ModelState::Loaded(Arc::clone(detector)),
            Some(Err(e)) => ModelState::Failed(e.clone()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.inner.outcome.get(), Some(Ok(_)))
    }
}
