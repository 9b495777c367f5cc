use axum::Router;
use eyre::Context as _;
use std::future::Future;
use tokio::net::TcpListener;

/// Serves `router` until `shutdown` resolves, then drains open connections.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> eyre::Result<()> {
    if let Ok(address) = listener.local_addr() {
        info!("listening on {address}");
    }
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .wrap_err("HTTP server failed")
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
