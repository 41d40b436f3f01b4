use std::sync::Arc;

use axum::routing::get;
use axum::{extract::State, response::IntoResponse, Router};
use http::{header::CONTENT_TYPE, StatusCode};
use prometheus::{Encoder, Registry, TextEncoder};
use tracing::error;

use crate::config::settings::MetricsConfig;

#[derive(Clone)]
pub struct MetricsState {
    pub registry: Arc<Registry>,
}

impl MetricsState {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Router serving the registry on `metrics_config.path`; empty when disabled.
    /// Hosts merge it into their own application router.
    pub fn router(&self, metrics_config: &MetricsConfig) -> Router {
        let mut router = Router::new();
        if metrics_config.is_enabled {
            router = router.route(metrics_config.path.as_str(), get(render_metrics));
        }
        router.with_state(self.clone())
    }
}

async fn render_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!("failed to encode metrics: {}", err);
        return (StatusCode::INTERNAL_SERVER_ERROR, [(CONTENT_TYPE, "text/plain")], String::new());
    }

    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        String::from_utf8_lossy(&buffer).into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::metrics::get_metrics;
    use crate::tests::common::{build_reqwest_client, spawn_axum};

    #[tokio::test]
    async fn metrics_route_serves_text_exposition() -> anyhow::Result<()> {
        let metrics = get_metrics().await;
        metrics.token_cache_hits.inc();

        let config = MetricsConfig {
            path: "/metrics".to_string(),
            is_enabled: true,
        };
        let router = MetricsState::new(metrics.registry.clone()).router(&config);
        let (handle, addr) = spawn_axum(router).await;

        let response = build_reqwest_client()
            .get(format!("http://{}/metrics", addr))
            .send()
            .await?;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.text().await?;
        assert!(body.contains("appbootstrap_token_cache_hits_total"));

        handle.abort();
        Ok(())
    }

    #[tokio::test]
    async fn disabled_metrics_route_is_not_served() -> anyhow::Result<()> {
        let metrics = get_metrics().await;
        let router = MetricsState::new(metrics.registry.clone()).router(&MetricsConfig::default());
        let (handle, addr) = spawn_axum(router).await;

        let response = build_reqwest_client()
            .get(format!("http://{}/metrics", addr))
            .send()
            .await?;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        handle.abort();
        Ok(())
    }
}
