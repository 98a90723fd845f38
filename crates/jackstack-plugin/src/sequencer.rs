//! Boot sequencer.
//!
//! Drives a [`Stack`] through its lifecycle:
//!
//! ```text
//! Uninitialized --init()--> Initializing --> Initialized --start()--> Ready
//!                                 \                 \                   |
//!                                  `--> Failed <-----`             shutdown()
//!                                                                        v
//!                                                                     Stopped
//! ```
//!
//! `init()` orders and initializes the enabled plugins, then runs every
//! built-in stage. `start()` runs `init()` if needed, waits for the deferred
//! gate and opens the listener. Both are safe to call again: a ready stack
//! returns its address, a failed one returns the error that failed it, and a
//! stopped one reports that its listener is closed. A listener is never
//! opened twice.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use jackstack_core::error::{AppError, ErrorKind};
use jackstack_core::result::AppResult;

use crate::hooks::definitions::Stage;
use crate::registry::is_disabled_by;
use crate::stack::Stack;

/// Where a stack is in its lifecycle.
#[derive(Debug, Clone)]
pub enum BootState {
    /// No stage has run.
    Uninitialized,
    /// Plugins and stages are running.
    Initializing,
    /// Every stage ran; the listener is not open yet.
    Initialized,
    /// Accepting connections.
    Ready(SocketAddr),
    /// Was listening on this address until [`Stack::shutdown`].
    Stopped(SocketAddr),
    /// Boot failed; the stack will not retry.
    Failed(AppError),
}

impl BootState {
    /// Returns whether every stage has run.
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized | Self::Ready(_) | Self::Stopped(_))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// A server task started by [`Stack::start`].
#[derive(Debug)]
pub(crate) struct ServerHandle {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<std::io::Result<()>>,
}

impl Stack {
    /// Initializes plugins and runs every built-in stage, once.
    ///
    /// A hook calling `init()` while stages are running is a no-op.
    pub fn init(&mut self) -> AppResult<()> {
        match &self.state {
            BootState::Uninitialized => {}
            BootState::Failed(err) => return Err(err.clone()),
            _ => return Ok(()),
        }

        self.state = BootState::Initializing;
        info!(boot_id = %self.boot_id, "Initializing stack");

        let result = self
            .initialize_plugins()
            .and_then(|()| self.run_stages());

        match result {
            Ok(()) => {
                self.state = BootState::Initialized;
                info!(stages = self.stage_counter, "Stack initialized");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Stack initialization failed");
                self.state = BootState::Failed(err.clone());
                Err(err)
            }
        }
    }

    fn initialize_plugins(&mut self) -> AppResult<()> {
        let order = self.plugins.resolve(self.config.plugins.ordering)?;

        for name in order {
            let Some((initializer, config)) = self.plugins.take_initializer(&name) else {
                continue;
            };

            if is_disabled_by(&config) {
                info!(plugin = %name, "Plugin disabled by configuration, skipping");
                continue;
            }

            info!(plugin = %name, "Initializing plugin");
            initializer(self, &config)?;
        }

        Ok(())
    }

    fn run_stages(&mut self) -> AppResult<()> {
        for stage in Stage::SEQUENCE {
            match self.stage_handlers.get(&stage).cloned() {
                Some(handler) => self.wrap(stage, |stack| handler(stack))?,
                None => self.wrap_bare(stage)?,
            }
        }
        Ok(())
    }

    /// Boots the stack and starts serving. Returns the bound address.
    pub async fn start(&mut self) -> AppResult<SocketAddr> {
        self.start_with(|_| {}).await
    }

    /// Like [`Stack::start`], then calls `callback` once with the outcome.
    pub async fn start_with<C>(&mut self, callback: C) -> AppResult<SocketAddr>
    where
        C: FnOnce(Option<&AppError>) + Send,
    {
        let result = self.boot().await;

        match &result {
            Ok(_) => callback(None),
            Err(err) => {
                error!(error = %err, "Stack failed to start");
                callback(Some(err));
            }
        }

        result
    }

    async fn boot(&mut self) -> AppResult<SocketAddr> {
        match self.state {
            BootState::Ready(addr) => return Ok(addr),
            BootState::Stopped(addr) => {
                return Err(AppError::listener(format!("Listener on {addr} was shut down")));
            }
            _ => {}
        }

        self.init()?;

        let limit = self
            .config
            .server
            .startup_timeout_seconds
            .map(Duration::from_secs);

        let waited = self.gate.await_all_within(limit).await;
        let result = match waited {
            Ok(()) => self.listen().await,
            Err(err) => Err(err),
        };

        match result {
            Ok(addr) => {
                self.state = BootState::Ready(addr);
                Ok(addr)
            }
            Err(err) => {
                self.state = BootState::Failed(err.clone());
                Err(err)
            }
        }
    }

    async fn listen(&mut self) -> AppResult<SocketAddr> {
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => {
                let addr = self.config.server.bind_address();
                TcpListener::bind(&addr).await.map_err(|e| {
                    AppError::with_source(ErrorKind::Listener, format!("Failed to bind {addr}"), e)
                })?
            }
        };

        let addr = listener.local_addr()?;
        let router = self.app.build();
        let (shutdown, mut signal) = watch::channel(false);

        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = signal.wait_for(|stop| *stop).await;
                })
                .await
        });

        info!(%addr, boot_id = %self.boot_id, "Stack listening");
        self.server = Some(ServerHandle {
            addr,
            shutdown,
            task,
        });

        Ok(addr)
    }

    /// Address the server is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(|server| server.addr)
    }

    /// Stops accepting connections and waits for in-flight requests.
    ///
    /// Waits at most `server.shutdown_grace_seconds`. A stack that never
    /// started has nothing to stop.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        let Some(server) = self.server.take() else {
            return Ok(());
        };

        self.state = BootState::Stopped(server.addr);
        info!(addr = %server.addr, "Starting graceful shutdown");
        let _ = server.shutdown.send(true);

        let grace = Duration::from_secs(self.config.server.shutdown_grace_seconds);
        match tokio::time::timeout(grace, server.task).await {
            Ok(Ok(Ok(()))) => {
                info!("Stack shut down gracefully");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(AppError::with_source(
                ErrorKind::Listener,
                "Server error",
                e,
            )),
            Ok(Err(e)) => Err(AppError::with_source(
                ErrorKind::Internal,
                "Server task failed",
                e,
            )),
            Err(_) => {
                warn!(grace_seconds = grace.as_secs(), "Graceful shutdown timed out");
                Err(AppError::timeout(format!(
                    "Server did not stop within {}s",
                    grace.as_secs()
                )))
            }
        }
    }
}
