use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::collect::{run_once, CollectOptions};
use crate::store::SnapshotStore;

use super::source::RootServerSource;

#[derive(Clone, Copy, Debug)]
pub struct CollectorCfg {
    pub interval_secs: u64,
    pub per_source: bool,
}

/// Spawn the background collector. The first tick fires immediately so a
/// fresh deployment gets a same-day snapshot; after that one run per
/// interval. Failures are logged and counted and never crash the task;
/// same-day re-runs are safe because writes upsert by date.
pub fn spawn_collector(
    cfg: CollectorCfg,
    source: Arc<dyn RootServerSource>,
    store: Arc<dyn SnapshotStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(cfg.interval_secs));
        loop {
            ticker.tick().await;
            let today = chrono::Utc::now().date_naive();
            let opts = CollectOptions {
                per_source: cfg.per_source,
            };

            match run_once(source.as_ref(), store.as_ref(), today, opts).await {
                Ok(snapshot) => {
                    tracing::info!(
                        target: "collect",
                        date = %snapshot.date,
                        source = source.name(),
                        "scheduled collection tick"
                    );
                }
                Err(e) => {
                    counter!("collect_run_errors_total").increment(1);
                    tracing::warn!(
                        target: "collect",
                        error = %e,
                        source = source.name(),
                        "scheduled collection failed; waiting for next tick"
                    );
                }
            }
        }
    })
}
