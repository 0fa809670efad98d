//! TableCheck webhook relay server.
//!
//! Registers a webhook subscription with TableCheck on request, receives the
//! resulting callbacks, and appends everything it sees to the event logs.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay::{router, AppState, Config, FileEventLog, TableCheckClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if it exists
    dotenvy::dotenv().ok();

    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_starting");

    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        port = config.port,
        franchise_id = %config.franchise_id,
        shop_id = %config.shop_id,
        callback_url = %config.callback_url,
        tablecheck_api_url = %config.tablecheck_api_url,
        request_timeout_ms = ?config.request_timeout_ms,
        "config_loaded"
    );

    let events = FileEventLog::new(&config.log_dir);
    events
        .prepare()
        .await
        .context("Failed to prepare log directory")?;
    let log_dir = std::fs::canonicalize(events.dir()).unwrap_or_else(|_| events.dir().to_path_buf());
    info!(log_dir = %log_dir.display(), "event_log_ready");

    let tablecheck =
        TableCheckClient::from_config(&config).context("Failed to build HTTP client")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState::new(config, tablecheck, Arc::new(events));
    let app = router(state);

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("relay_shutdown_complete");

    Ok(())
}

/// Resolve once SIGINT or SIGTERM arrives.
///
/// A handler that cannot be installed is logged and never fires; the other
/// one still stops the server.
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "sigint_handler_unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal as unix_signal, SignalKind};

        match unix_signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "sigterm_handler_unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    };

    info!(signal = received, "relay_shutting_down");
}
