use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use copybot::api::create_router;
use copybot::config::AppConfig;
use copybot::db;
use copybot::execution::MirrorExecutor;
use copybot::metrics::init_metrics;
use copybot::polymarket::{DataClient, SessionResolver, StaticSessionResolver, TradeFeed};
use copybot::services::{run_mirror_poller, Notifier, PollerConfig, TelegramNotifier};
use copybot::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    let metrics_handle = init_metrics();

    tracing::info!(path = %config.database_path, "Connecting to database...");
    let db = db::init_pool(&config.database_path).await?;
    tracing::info!("Database connected");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let pause_flag = Arc::new(AtomicBool::new(false));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // --- Mirror poller ---
    let poller = if config.mirror_enabled {
        let resolver: Arc<dyn SessionResolver> = match &config.sessions_file {
            Some(path) => Arc::new(StaticSessionResolver::from_file(
                path,
                http.clone(),
                &config.clob_api_url,
            )?),
            None => {
                tracing::warn!(
                    "SESSIONS_FILE not set; mirrors will fail until sessions are configured"
                );
                Arc::new(StaticSessionResolver::empty())
            }
        };

        let notifier: Option<Arc<dyn Notifier>> = if config.has_telegram() {
            Some(Arc::new(TelegramNotifier::new(
                http.clone(),
                config.telegram_api_url.clone(),
                config.telegram_bot_token.clone().unwrap(),
                config.telegram_ops_chat_id.clone().unwrap(),
            )))
        } else {
            tracing::info!("Telegram notifications disabled");
            None
        };

        let feed: Arc<dyn TradeFeed> =
            Arc::new(DataClient::new(http.clone(), config.data_api_url.clone()));
        let executor = MirrorExecutor::new(
            resolver,
            config.min_mirror_notional,
            config.mirror_dry_run,
        );
        let poller_config = PollerConfig {
            interval: Duration::from_secs(config.poll_interval_secs),
            min_sleep: Duration::from_millis(config.min_sleep_ms),
            fetch_limit: config.trade_fetch_limit,
            heartbeat_interval: Duration::from_secs(config.heartbeat_interval_secs),
        };

        let poller_db = db.clone();
        let poller_pause = pause_flag.clone();
        Some(tokio::spawn(async move {
            run_mirror_poller(
                poller_db,
                feed,
                executor,
                notifier,
                poller_config,
                poller_pause,
                shutdown_rx,
            )
            .await;
        }))
    } else {
        tracing::info!("Mirroring disabled (MIRROR_ENABLED=false)");
        None
    };

    let state = AppState {
        db,
        config,
        metrics_handle,
        pause_flag,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let the poller finish its in-flight mirror attempt before exiting
    let _ = shutdown_tx.send(true);
    if let Some(handle) = poller {
        let _ = handle.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
