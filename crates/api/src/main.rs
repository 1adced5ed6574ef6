use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use domain::services::{ChatProvider, DispatchMode, MockChatProvider, PushService};
use domain::MeetupCore;
use meetup_api::config::Config;
use meetup_api::jobs::{JobScheduler, OrphanChannelsJob, PoolMetricsJob, ScheduledDeletionJob};
use meetup_api::services::{FcmPushService, LoggingPushService, StreamChatClient};
use meetup_api::{app, middleware};
use persistence::PgStore;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics().context("Failed to install Prometheus recorder")?;

    info!("Starting Hotplace Meetup API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;
    persistence::db::run_migrations(&pool).await?;

    let chat = build_chat_provider(&config)?;
    let push = build_push_service(&config);
    let catalog = config.product_catalog();
    info!(products = catalog.len(), "Product catalog loaded");

    let core = MeetupCore::new(
        PgStore::new(pool.clone()),
        chat,
        push,
        config.core_settings(),
        catalog,
        DispatchMode::Background,
    );

    let mut scheduler = JobScheduler::new();
    if config.jobs.enabled {
        scheduler.register(ScheduledDeletionJob::new(
            core.clone(),
            config.jobs.deletion_interval_minutes,
        ));
        scheduler.register(OrphanChannelsJob::new(
            core.clone(),
            config.jobs.orphan_reconcile_interval_minutes,
        ));
        scheduler.register(PoolMetricsJob::new(
            pool.clone(),
            config.jobs.pool_metrics_interval_secs,
        ));
        scheduler.start();
    }

    let addr = config.socket_addr().context("Invalid server address")?;
    let shutdown_timeout = Duration::from_secs(config.jobs.shutdown_timeout_secs);
    let app = app::create_app(config, core);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(shutdown_timeout).await;
    pool.close().await;
    info!("Server stopped");

    Ok(())
}

fn build_chat_provider(config: &Config) -> Result<Arc<dyn ChatProvider>> {
    match config.chat.provider.as_str() {
        "mock" => {
            warn!("Using the in-memory mock chat provider");
            Ok(Arc::new(MockChatProvider::new(config.chat.api_secret.clone())))
        }
        _ => {
            let client = StreamChatClient::new(&config.chat)
                .context("Failed to build Stream Chat client")?;
            Ok(Arc::new(client))
        }
    }
}

fn build_push_service(config: &Config) -> Arc<dyn PushService> {
    if !config.fcm.enabled {
        info!("FCM disabled, push notifications will only be logged");
        return Arc::new(LoggingPushService);
    }

    match FcmPushService::new(config.fcm.clone()) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            warn!(error = %e, "Failed to initialize FCM, falling back to logging");
            Arc::new(LoggingPushService)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
