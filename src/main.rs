//! # WP Sync Main Entry Point
//!
//! This is the main entry point for the WP Sync service.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wp_sync::migration::{Migrator, MigratorTrait};
use wp_sync::{
    config::{AppConfig, ConfigLoader, WpSourceMode},
    db::init_pool,
    engine::SyncEngine,
    repositories::SyncLogRepository,
    scheduler::SyncScheduler,
    server::{AppState, run_server},
    source::{WpSource, http::HttpSource, mysql::MysqlSource},
    telemetry::init_tracing,
};

fn build_source(config: &AppConfig) -> anyhow::Result<Arc<dyn WpSource>> {
    let source = &config.source;
    match source.mode {
        WpSourceMode::Mysql => {
            let url = source
                .wp_database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("WP_DATABASE_URL is required in mysql mode"))?;
            Ok(Arc::new(MysqlSource::new(
                url,
                Duration::from_millis(source.wp_connect_timeout_ms),
            )))
        }
        WpSourceMode::Http => {
            let site_url = source
                .wp_site_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("WP_SITE_URL is required in http mode"))?;
            let username = source
                .wp_username
                .clone()
                .ok_or_else(|| anyhow::anyhow!("WP_USERNAME is required in http mode"))?;
            let password = source
                .wp_app_password
                .clone()
                .ok_or_else(|| anyhow::anyhow!("WP_APP_PASSWORD is required in http mode"))?;
            let http = HttpSource::new(
                site_url,
                username,
                password,
                Duration::from_secs(source.wp_query_timeout_seconds),
            )
            .map_err(|err| anyhow::anyhow!("failed to build http source: {err}"))?;
            Ok(Arc::new(http))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from layered env files and variables
    let config = Arc::new(ConfigLoader::new().load()?);

    init_tracing(&config)?;
    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted) = config.redacted_json() {
        tracing::debug!(config = %redacted, "Effective configuration");
    }

    let db = init_pool(&config).await?;
    Migrator::up(&db, None).await?;

    let source = build_source(&config)?;
    let engine = Arc::new(SyncEngine::new(db.clone(), source));

    let shutdown = CancellationToken::new();

    let scheduler = SyncScheduler::new(
        Arc::clone(&config),
        Arc::clone(&engine),
        SyncLogRepository::new(db.clone()),
    );
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    // Propagate SIGINT/SIGTERM into the shared shutdown token
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = wait_for_shutdown_signal().await {
            tracing::error!(error = %err, "Failed to listen for shutdown signals");
        }
        signal_token.cancel();
    });

    let state = AppState {
        db,
        config,
        engine,
    };
    run_server(state, shutdown.clone()).await?;

    shutdown.cancel();
    if let Err(err) = scheduler_handle.await {
        tracing::error!(error = %err, "Scheduler task panicked");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result,
            _ = sigterm.recv() => Ok(()),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
