//! Deferred-start gate.
//!
//! Stage handlers and hooks return a [`Deferred`] when they start work whose
//! completion must be observed before the listener opens. The gate collects
//! them during boot and `start()` waits on all of them at once.

use std::future::Future;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, try_join_all};
use tracing::{debug, info, warn};

use jackstack_core::error::{AppError, ErrorKind};
use jackstack_core::result::AppResult;

/// An asynchronous result the listener waits for.
pub struct Deferred {
    /// Name used in logs.
    label: Option<String>,
    /// The pending work.
    future: BoxFuture<'static, AppResult<()>>,
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("label", &self.label)
            .field("future", &"<future>")
            .finish()
    }
}

impl Deferred {
    /// Wraps a future. It is first polled when the gate is awaited.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self {
            label: None,
            future: future.boxed(),
        }
    }

    /// Wraps a future under a name used in logs.
    pub fn labeled<F>(label: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self {
            label: Some(label.into()),
            future: future.boxed(),
        }
    }

    /// Wraps best-effort work: a failure is logged and treated as success.
    ///
    /// Used by optional subsystems whose unavailability must not keep the
    /// listener closed.
    pub fn tolerant<F>(label: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = AppResult<()>> + Send + 'static,
    {
        let label = label.into();
        let name = label.clone();
        Self::labeled(label, async move {
            if let Err(err) = future.await {
                warn!(
                    deferred = %name,
                    error = %err,
                    "Deferred work failed, continuing with fallback"
                );
            }
            Ok(())
        })
    }

    /// Starts the work right away on the current tokio runtime.
    ///
    /// Outside a runtime the future is kept and polled by the gate instead.
    pub fn spawn<F>(label: impl Into<String>, future: F) -> Self
    where
        F: Future<Output = AppResult<()>> + Send + 'static,
    {
        let label = label.into();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return Self::labeled(label, future);
        };

        let task = runtime.spawn(future);
        let name = label.clone();
        Self::labeled(label, async move {
            task.await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Deferred,
                    format!("Deferred task '{name}' did not complete"),
                    e,
                )
            })?
        })
    }

    /// A deferred result that has already failed.
    pub fn failed(error: AppError) -> Self {
        Self::new(async move { Err(error) })
    }

    /// Returns the label, if one was given.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Accumulator of pending deferred results.
#[derive(Debug, Default)]
pub struct DeferredGate {
    /// Registered, not yet awaited.
    pending: Vec<Deferred>,
}

impl DeferredGate {
    /// Creates an empty gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a deferred result to the pending list.
    pub fn register(&mut self, deferred: Deferred) {
        self.pending.push(deferred);
        debug!(
            deferred = self.pending.last().and_then(Deferred::label).unwrap_or("-"),
            pending = self.pending.len(),
            "Deferred result registered"
        );
    }

    /// Adds the value if there is one; `None` is a no-op.
    pub fn register_optional(&mut self, value: Option<Deferred>) {
        if let Some(deferred) = value {
            self.register(deferred);
        }
    }

    /// Number of results not yet awaited.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Returns whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drains the pending list into a single future.
    ///
    /// The future resolves once every entry resolved and fails with the first
    /// error any entry reports, without waiting for the rest.
    pub fn await_all(&mut self) -> impl Future<Output = AppResult<()>> + Send + 'static {
        let pending = std::mem::take(&mut self.pending);
        async move {
            if pending.is_empty() {
                return Ok(());
            }

            info!(pending = pending.len(), "Waiting for deferred results");
            try_join_all(pending.into_iter().map(|d| d.future)).await?;
            info!("Deferred results settled");
            Ok(())
        }
    }

    /// Like [`DeferredGate::await_all`], bounded by `limit` when one is given.
    pub fn await_all_within(
        &mut self,
        limit: Option<Duration>,
    ) -> impl Future<Output = AppResult<()>> + Send + 'static {
        let waiting = self.await_all();
        async move {
            match limit {
                Some(limit) => tokio::time::timeout(limit, waiting).await.map_err(|_| {
                    AppError::timeout(format!(
                        "Deferred results did not settle within {}s",
                        limit.as_secs()
                    ))
                })?,
                None => waiting.await,
            }
        }
    }
}
