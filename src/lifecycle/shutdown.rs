use tokio::signal;

/// Completes when the process receives Ctrl+C or SIGTERM.
///
/// A signal handler that cannot be installed is logged and never fires, so
/// the other one still works.
///
/// # Example
///
/// ```rust,no_run
/// use nanoservice::lifecycle::shutdown_signal;
///
/// # async fn run() {
/// tokio::select! {
///     _ = shutdown_signal() => tracing::info!("stopping"),
///     _ = std::future::pending::<()>() => {}
/// }
/// # }
/// ```
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }
}
