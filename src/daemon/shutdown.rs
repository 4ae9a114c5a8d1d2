use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancels `cancelation` once the process is asked to stop. `habitwatch stop` sends SIGTERM on
/// unix, ctrl-c covers running in a console.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received ctrl-c"),
                    _ = terminate.recv() => info!("Received SIGTERM"),
                    _ = cancelation.cancelled() => return,
                }
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM {e:?}");
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received ctrl-c"),
                    _ = cancelation.cancelled() => return,
                }
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Received ctrl-c"),
            _ = cancelation.cancelled() => return,
        }
    }
    cancelation.cancel();
}
