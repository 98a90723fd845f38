//! Jackstack Server: plugin-driven web stack bootstrap.
//!
//! Main entry point that wires the crates together and starts the server.

use tracing_subscriber::{EnvFilter, fmt};

use jackstack_core::config::StackConfig;
use jackstack_core::error::AppError;
use jackstack_middleware::RouteTable;
use jackstack_plugin::Stack;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<StackConfig, AppError> {
    let config_path =
        std::env::var("JACKSTACK_CONFIG").unwrap_or_else(|_| "config/default".to_string());

    let env = std::env::var("JACKSTACK_ENV").unwrap_or_else(|_| "development".to_string());

    StackConfig::load(&config_path, &env)
}

/// Initialize tracing/logging
fn init_logging(config: &StackConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Builds the stack, serves until a shutdown signal arrives, then drains.
async fn run(config: StackConfig) -> Result<(), AppError> {
    tracing::info!("Starting Jackstack v{}", env!("CARGO_PKG_VERSION"));

    let mut stack = Stack::new(config);

    // ── Framework stage handlers ─────────────────────────────────
    jackstack_middleware::install(&mut stack, RouteTable::new())?;

    // ── Plugins ──────────────────────────────────────────────────
    stack.register(jackstack_middleware::health::plugin())?;
    stack.apply_toggles();

    // ── Boot ─────────────────────────────────────────────────────
    let addr = stack.start().await?;

    tracing::info!(
        "Jackstack listening on {} after {} stages",
        addr,
        stack.stage_counter()
    );

    // ── Graceful shutdown ────────────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");
    stack.shutdown().await?;

    tracing::info!("Jackstack server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
