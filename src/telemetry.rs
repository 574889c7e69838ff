use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Prometheus recorder plus the exposition route. Mounted at
/// `/internal/metrics` (the public `/metrics` path belongs to the
/// snapshot query API) and only when debug routes are enabled.
pub struct Telemetry {
    pub handle: PrometheusHandle,
}

impl Telemetry {
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        Ok(Self { handle })
    }

    /// Router exposing `/internal/metrics` in Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/internal/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
