//! Root-Server Metrics Service — Binary Entrypoint
//! Boots the Axum HTTP server and the background collector, wiring the
//! snapshot store, routes, and middleware.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rootserver_metrics::collect::scheduler::{spawn_collector, CollectorCfg};
use rootserver_metrics::collect::source::{HttpRootServerSource, RootServerSource};
use rootserver_metrics::config::Config;
use rootserver_metrics::store::{JsonFileStore, SnapshotStore};
use rootserver_metrics::telemetry::Telemetry;
use rootserver_metrics::{api, AppState};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rootserver_metrics=info,collect=info,api=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = Config::from_env()?;

    let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::open(&cfg.data_dir)?);
    let source: Arc<dyn RootServerSource> = Arc::new(HttpRootServerSource::new(
        cfg.rootserver_url.clone(),
        cfg.fetch_timeout,
    )?);

    let telemetry = Telemetry::init()?;

    spawn_collector(
        CollectorCfg {
            interval_secs: cfg.collect_interval_secs,
            per_source: cfg.per_source,
        },
        source,
        store.clone(),
    );

    let mut router = api::router(AppState::new(store));
    if cfg.debug_routes {
        router = router.merge(telemetry.router());
    }

    tracing::info!(addr = %cfg.bind_addr, "listening");
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}
