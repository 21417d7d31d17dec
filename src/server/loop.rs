// Server loop module
// Accepts connections until shutdown is requested, then drains them

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop until `shutdown` resolves.
///
/// After shutdown the listener is closed, every open connection is told to
/// finish its current response, and the loop waits up to the configured
/// grace period for them to close.
pub async fn start_server_loop<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(
                        stream,
                        peer_addr,
                        &state,
                        &active_connections,
                        shutdown_rx.clone(),
                    ),
                    Err(e) => tracing::error!("Failed to accept connection: {e}"),
                }
            }
            () = &mut shutdown => break,
        }
    }

    drop(listener);
    drop(shutdown_rx);
    logger::log_shutdown_started(active_connections.load(Ordering::SeqCst));

    // Every connection task holds a receiver; `closed` resolves once all
    // of them are gone
    shutdown_tx.send_replace(true);
    let grace = state.config.performance.shutdown_grace_period();
    if tokio::time::timeout(grace, shutdown_tx.closed()).await.is_err() {
        tracing::debug!(grace_secs = grace.as_secs(), "shutdown grace period elapsed");
    }

    logger::log_shutdown_complete(active_connections.load(Ordering::SeqCst));
    Ok(())
}
