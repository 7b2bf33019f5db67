//! Process termination signals.

use std::future;

use tokio::signal::unix::{SignalKind, signal};

/// Wait for SIGINT or SIGTERM (and SIGHUP when `hangup` is set). Returns the
/// name of the signal received.
pub async fn shutdown_signal(hangup: bool) -> std::io::Result<&'static str> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    // Only take over SIGHUP when asked; otherwise it keeps its default action.
    let mut sighup = if hangup {
        Some(signal(SignalKind::hangup())?)
    } else {
        None
    };

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
        _ = async {
            match sighup.as_mut() {
                Some(s) => s.recv().await,
                None => future::pending().await,
            }
        } => "SIGHUP",
    };
    info!(signal = name, "signal received");
    Ok(name)
}
