//! Signal handling for graceful shutdown.

use tracing::{info, warn};

/// Wait for SIGINT, SIGTERM or SIGQUIT.
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let handlers = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
        signal(SignalKind::quit()),
    );
    let (mut sigint, mut sigterm, mut sigquit) = match handlers {
        (Ok(int), Ok(term), Ok(quit)) => (int, term, quit),
        _ => {
            warn!("Failed to install unix signal handlers, falling back to Ctrl-C");
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigint.recv() => info!(signal = "SIGINT", "Signal received"),
        _ = sigterm.recv() => info!(signal = "SIGTERM", "Signal received"),
        _ = sigquit.recv() => info!(signal = "SIGQUIT", "Signal received"),
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!(signal = "Ctrl-C", "Signal received"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {}", e);
            // Without a signal source, run until the process is killed.
            std::future::pending::<()>().await;
        }
    }
}
