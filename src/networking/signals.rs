use tokio::signal;
use tracing::{event, Level};

/// Resolves on ctrl-c, or on SIGTERM / SIGQUIT where those exist.
#[cfg(unix)]
pub async fn signal_for_shutdown() {
    use signal::unix::SignalKind;

    let (mut terminate_signal, mut quit_signal) = match (
        signal::unix::signal(SignalKind::terminate()),
        signal::unix::signal(SignalKind::quit()),
    ) {
        (Ok(terminate_signal), Ok(quit_signal)) => (terminate_signal, quit_signal),
        (Err(err), _) | (_, Err(err)) => {
            event!(Level::WARN, "falling back to ctrl-c only: {}", err);
            signal::ctrl_c().await.ok();
            return;
        }
    };

    tokio::select! {
        _ = signal::ctrl_c() => (),
        _ = terminate_signal.recv() => (),
        _ = quit_signal.recv() => (),
    }
}

#[cfg(not(unix))]
pub async fn signal_for_shutdown() {
    signal::ctrl_c().await.ok();
}
