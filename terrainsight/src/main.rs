use terrainsight::api::{ApiServer, ApiServerConfig, AppState};
use terrainsight::config::Settings;
use terrainsight::logging::{LogFormat, init_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    init_logging(LogFormat::from_env())?;

    let settings = Settings::from_env();
    tracing::info!(
        webhooks = ?settings.webhooks,
        timeout_secs = settings.delivery.timeout.as_secs(),
        retry_delay_ms = settings.delivery.retry_delay.as_millis() as u64,
        is_production = settings.is_production,
        "Settings loaded"
    );

    let server = ApiServer::new(ApiServerConfig::from_env_or_default(), AppState::new(settings));

    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        cancel_token.cancel();
    });

    server.run().await?;

    Ok(())
}

/// Resolves on SIGINT/SIGTERM (Ctrl+C elsewhere). If no handler can be
/// registered the server keeps running until killed.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!(error = %e, "Failed to register shutdown signal handlers");
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
    tracing::info!("Shutdown signal received");
}
