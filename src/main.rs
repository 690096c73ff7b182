use std::sync::Arc;

use tokio::sync::broadcast;

use mirrorbot::api::create_router;
use mirrorbot::api::ws_types::WsMessage;
use mirrorbot::config::AppConfig;
use mirrorbot::db::{self, PgMirrorStore};
use mirrorbot::execution::{
    CapabilityModel, DispatcherConfig, DispatcherDeps, MirrorDispatcher, OrderExecutor, PositionRegistry,
    RetryPolicy, RiskGate, RiskGateConfig,
};
use mirrorbot::ingestion::{EventIngestor, IngestorConfig};
use mirrorbot::ports::{Notifier, OrderExecution};
use mirrorbot::services::{MirrorService, PortfolioView, ResultRecorder, TelegramNotifier};
use mirrorbot::venue::{DryRunExecutor, VenueAuth, VenueClient};
use mirrorbot::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(config.log_json);

    // reqwest and sqlx both use rustls; pick the provider once per process
    let _ = rustls::crypto::ring::default_provider().install_default();

    let metrics_handle = mirrorbot::metrics::init_metrics()?;
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    tracing::info!("Database connected");
    let store = Arc::new(PgMirrorStore::new(pool.clone()));

    // --- Venue ---
    let http = reqwest::Client::builder()
        .timeout(config.submit_timeout.max(config.query_timeout))
        .build()?;
    let auth = match (&config.venue_api_key, &config.venue_api_secret, &config.venue_passphrase) {
        (Some(key), Some(secret), Some(pass)) => Some(VenueAuth::new(key.clone(), secret.clone(), pass.clone())),
        _ => None,
    };
    let venue = VenueClient::new(http.clone(), config.venue_base_url.clone(), auth);

    let execution: Arc<dyn OrderExecution> = if config.live_trading() {
        tracing::info!(venue = %config.venue_base_url, "Live order submission enabled");
        Arc::new(venue.clone())
    } else {
        if !config.dry_run {
            tracing::warn!("DRY_RUN=false but venue credentials are incomplete, running dry-run");
        }
        tracing::info!("Dry-run mode: mirror orders are logged, not submitted");
        Arc::new(DryRunExecutor)
    };

    // --- Result fan-out ---
    let (ws_tx, _) = broadcast::channel::<WsMessage>(256);
    let telegram: Option<Arc<dyn Notifier>> = config.telegram().map(|(token, chat)| {
        tracing::info!("Telegram notifications enabled");
        Arc::new(TelegramNotifier::new(http.clone(), token, chat)) as Arc<dyn Notifier>
    });
    let recorder = Arc::new(ResultRecorder::new(store.clone(), ws_tx.clone(), telegram));

    // --- Mirror core ---
    let registry = PositionRegistry::new();
    let portfolio = Arc::new(PortfolioView::new(pool.clone(), venue.clone()));

    let dispatcher = MirrorDispatcher::new(
        DispatcherDeps {
            registry: registry.clone(),
            capabilities: CapabilityModel::new(store.clone(), config.lookup_timeout),
            risk: RiskGate::new(
                portfolio,
                RiskGateConfig {
                    fail_open_on_balance_error: config.risk_fail_open_on_balance_error,
                    lookup_timeout: config.lookup_timeout,
                },
            ),
            executor: OrderExecutor::new(
                execution,
                RetryPolicy {
                    max_retries: config.submit_max_retries,
                    base_delay: config.submit_backoff,
                    attempt_timeout: config.submit_timeout,
                },
            ),
            sink: recorder.clone(),
            positions: store.clone(),
            notifier: Some(recorder),
        },
        DispatcherConfig {
            concurrency: config.dispatch_concurrency,
            quantity_decimal_places: config.scaled_quantity_dp,
        },
    );

    let ingestor = EventIngestor::new(
        Arc::new(venue),
        dispatcher,
        IngestorConfig {
            tick_interval: config.ingest_interval,
            query_timeout: config.query_timeout,
        },
    );

    let service = MirrorService::new(registry, ingestor.clone(), store);
    service.rehydrate().await?;

    if config.ingest_autostart {
        ingestor.start();
    } else {
        tracing::info!("Ingestor autostart disabled (INGEST_AUTOSTART=false)");
    }

    let state = AppState {
        db: pool,
        config,
        service,
        ws_tx,
        metrics_handle,
    };
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    ingestor.stop().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
