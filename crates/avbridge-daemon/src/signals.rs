//! Signal handling for shutdown and settings reload.

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

/// What a signal asks the daemon to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Tear everything down and exit.
    Shutdown,
    /// Re-read connection settings and reconnect the receiver link.
    Reload,
}

/// Set up signal handlers.
///
/// SIGTERM and SIGINT request shutdown; SIGHUP requests a settings
/// reload and may fire any number of times.
pub fn setup_signal_handlers() -> Result<mpsc::Receiver<Signal>> {
    let (tx, rx) = mpsc::channel(1);

    // Handle SIGTERM
    let tx_term = tx.clone();
    tokio::spawn(async move {
        if let Ok(mut stream) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            stream.recv().await;
            info!("Received SIGTERM");
            let _ = tx_term.send(Signal::Shutdown).await;
        }
    });

    // Handle SIGINT (Ctrl+C)
    let tx_int = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received SIGINT");
            let _ = tx_int.send(Signal::Shutdown).await;
        }
    });

    // Handle SIGHUP
    let tx_hup = tx;
    tokio::spawn(async move {
        if let Ok(mut stream) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())
        {
            while stream.recv().await.is_some() {
                info!("Received SIGHUP");
                let _ = tx_hup.send(Signal::Reload).await;
            }
        }
    });

    Ok(rx)
}
