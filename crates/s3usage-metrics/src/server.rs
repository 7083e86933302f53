// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! HTTP server for the Prometheus endpoint
//!
//! Serves `/metrics` in Prometheus text exposition format and a `/health`
//! probe that answers `OK` whether or not the storage endpoint is reachable.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::{Encoder, TextEncoder};
use std::future::Future;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::{types::MetricsConfig, MetricsRegistry};

/// HTTP server for Prometheus metrics
#[derive(Clone)]
pub struct MetricsServer {
    registry: MetricsRegistry,
    config: MetricsConfig,
}

impl MetricsServer {
    /// Create a new metrics server on `port`
    pub fn new(registry: MetricsRegistry, port: u16) -> Self {
        Self {
            registry,
            config: MetricsConfig::with_port(port),
        }
    }

    /// Create a new metrics server with custom configuration
    pub fn with_config(registry: MetricsRegistry, config: MetricsConfig) -> Self {
        Self { registry, config }
    }

    /// Get the bind address for the server
    pub fn bind_address(&self) -> String {
        self.config.socket_addr()
    }

    /// Routes served by this server
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .with_state(self.registry.clone())
    }

    /// Bind the configured address and serve until `shutdown` resolves
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind metrics server to {}: {}", addr, e))?;

        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        info!("Starting server on http://{}/metrics", local);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("Metrics server error: {}", e))?;

        info!("Metrics server stopped");
        Ok(())
    }
}

/// Handler for `/metrics` endpoint
async fn metrics_handler(State(registry): State<MetricsRegistry>) -> Response {
    debug!("Serving metrics");

    let metric_families = registry.registry().gather();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", encoder.format_type())],
            buffer,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}

/// Handler for `/health` endpoint
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EndpointLabels;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use s3usage_engine::{CachePolicy, EngineError, SnapshotCache};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn server_with(cache: Arc<SnapshotCache>) -> MetricsServer {
        let registry = MetricsRegistry::new(cache, EndpointLabels::new("", "us-east-1")).unwrap();
        MetricsServer::new(registry, 9655)
    }

    async fn get_body(server: &MetricsServer, uri: &str) -> (StatusCode, String) {
        let response = server
            .router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_server_bind_address() {
        let server = server_with(Arc::new(SnapshotCache::default()));
        assert_eq!(server.bind_address(), "0.0.0.0:9655");
    }

    #[tokio::test]
    async fn test_health_is_ok_even_when_endpoint_down() {
        let cache = Arc::new(SnapshotCache::new(CachePolicy::default()));
        cache.publish(Err(EngineError::Discovery("refused".to_string())));
        let server = server_with(cache);

        let (status, body) = get_body(&server, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn test_metrics_route_serves_text_format() {
        let server = server_with(Arc::new(SnapshotCache::default()));

        let (status, body) = get_body(&server, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("# TYPE s3_endpoint_up gauge"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let server = server_with(Arc::new(SnapshotCache::default()));
        let (status, _) = get_body(&server, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
