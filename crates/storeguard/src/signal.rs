//! OS shutdown signals.

use storeguard_connection::ShutdownSignal;

/// Resolves when the process receives SIGINT (Ctrl-C) or, on Unix, SIGTERM.
///
/// A handler that cannot be registered is logged and never fires; the other
/// one keeps working.
pub async fn wait_for_signal() -> ShutdownSignal {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ShutdownSignal::Interrupt,
            Err(_error) => {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %_error, "failed to register SIGINT handler");
                std::future::pending().await
            }
        }
    };

    tokio::select! {
        signal = interrupt => signal,
        signal = terminate() => signal,
    }
}

#[cfg(unix)]
async fn terminate() -> ShutdownSignal {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
            ShutdownSignal::Terminate
        }
        Err(_error) => {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %_error, "failed to register SIGTERM handler");
            std::future::pending().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() -> ShutdownSignal {
    std::future::pending().await
}
