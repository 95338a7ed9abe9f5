//! Relay HTTP server lifecycle management.
//!
//! [`start_server`] binds the configured address and serves until
//! `Ctrl-C`. [`serve`] runs on an already-bound listener with a caller
//! supplied shutdown future, which is what the integration tests use.
//!
//! On shutdown every live connection is sent close code 1001, then the
//! server waits briefly for the sockets to drain before returning.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::relay::Relay;
use crate::router::build_router;

/// How long shutdown waits for closed connections to disconnect.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Poll interval while draining.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Errors that can occur when starting or running the relay server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Bind the configured address and serve until `Ctrl-C`.
///
/// # Errors
///
/// Returns an error if the address is invalid, the listener cannot bind,
/// or the server encounters a fatal I/O error.
pub async fn start_server(relay: Arc<Relay>) -> Result<(), ServerError> {
    let addr: SocketAddr = relay
        .config()
        .server
        .bind_addr()
        .parse()
        .map_err(|e| ServerError::Bind(format!("invalid address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))?;

    serve(listener, relay, shutdown_signal()).await
}

/// Serve the relay on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server encounters a fatal I/O error.
pub async fn serve<F>(listener: TcpListener, relay: Arc<Relay>, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    let identity = &relay.config().relay;
    info!(
        %local_addr,
        relay = %identity.name,
        version = %identity.version,
        "RiftClaw relay listening"
    );

    let stats_task = spawn_stats_logger(Arc::clone(&relay));
    let router = build_router(Arc::clone(&relay));
    let closing = Arc::clone(&relay);

    let result = axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.await;
        closing.shutdown().await;
        drain(&closing).await;
    })
    .await
    .map_err(|e| ServerError::Serve(format!("serve error: {e}")));

    if let Some(task) = stats_task {
        task.abort();
    }

    info!("RiftClaw relay stopped");
    result
}

/// Resolve on `Ctrl-C`.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
    }
}

/// Wait until every connection has disconnected, or the drain timeout.
async fn drain(relay: &Relay) {
    let waited = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while relay.stats().await.connections > 0 {
            tokio::time::sleep(DRAIN_POLL).await;
        }
    })
    .await;

    if waited.is_err() {
        let remaining = relay.stats().await.connections;
        warn!(remaining, "Connections still open after drain timeout");
    }
}

/// Log relay counters on the configured interval.
fn spawn_stats_logger(relay: Arc<Relay>) -> Option<JoinHandle<()>> {
    let period = relay.config().relay.stats_interval()?;
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let stats = relay.stats().await;
            info!(
                connections = stats.connections,
                worlds = stats.worlds,
                agents = stats.agents,
                uptime_secs = stats.uptime_secs,
                "Relay stats"
            );
        }
    }))
}
