//! Signal handling for graceful shutdown

use crate::executor::CancellationToken;

/// Cancel `token` so the running workflow stops at the next node boundary
pub fn request_shutdown(token: &CancellationToken) {
    tracing::info!("Shutdown requested");
    token.cancel();
}

/// Wait for SIGINT/SIGTERM (Ctrl+C elsewhere), then cancel `token`.
///
/// The running workflow stops at the next node boundary.
pub async fn setup_signal_handlers(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::warn!(error = %e, "Failed to install signal handlers");
                    return;
                }
            };

        tokio::select! {
            _ = sigint.recv() => {
                eprintln!("\nReceived SIGINT, stopping after the current node...");
            }
            _ = sigterm.recv() => {
                eprintln!("\nReceived SIGTERM, stopping after the current node...");
            }
        }

        request_shutdown(&token);
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }
        eprintln!("\nReceived Ctrl+C, stopping after the current node...");
        request_shutdown(&token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shutdown_cancels_token() {
        let token = CancellationToken::new();
        let observer = token.clone();

        request_shutdown(&token);

        assert!(observer.is_cancelled());
    }
}
