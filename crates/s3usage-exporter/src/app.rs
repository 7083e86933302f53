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

//! Process wiring

use anyhow::{Context, Result};
use s3usage_engine::{RefreshLoop, SnapshotCache};
use s3usage_metrics::{MetricsConfig, MetricsRegistry, MetricsServer};
use s3usage_storage::{AuthProvider, AwsAuthProvider};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ExporterConfig;

/// The refresh loop and metrics server sharing one snapshot cache
pub struct Exporter {
    cache: Arc<SnapshotCache>,
    registry: MetricsRegistry,
    refresher: RefreshLoop,
    metrics: MetricsConfig,
}

impl Exporter {
    /// Build an exporter that authenticates through `aws-config`
    pub fn new(config: ExporterConfig) -> Result<Self> {
        let cache = Arc::new(SnapshotCache::new(config.cache_policy));
        let registry = MetricsRegistry::new(Arc::clone(&cache), config.labels.clone())
            .context("Failed to create metrics registry")?;
        let auth = AwsAuthProvider::new(config.auth.clone()).with_attempts(registry.auth_attempts());

        Ok(Self::assemble(config, cache, registry, Arc::new(auth)))
    }

    /// Build an exporter around a custom auth provider
    pub fn with_auth_provider(config: ExporterConfig, auth: Arc<dyn AuthProvider>) -> Result<Self> {
        let cache = Arc::new(SnapshotCache::new(config.cache_policy));
        let registry = MetricsRegistry::new(Arc::clone(&cache), config.labels.clone())
            .context("Failed to create metrics registry")?;

        Ok(Self::assemble(config, cache, registry, auth))
    }

    fn assemble(
        config: ExporterConfig,
        cache: Arc<SnapshotCache>,
        registry: MetricsRegistry,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let refresher = RefreshLoop::new(auth, Arc::clone(&cache), config.refresh);
        Self {
            cache,
            registry,
            refresher,
            metrics: config.metrics,
        }
    }

    /// Snapshot cache shared by the loop and the collector
    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Registry served on `/metrics`
    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    /// Bind the configured address and run until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let addr = self.metrics.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        self.run_on(listener, cancel).await
    }

    /// Run on an already bound listener until `cancel` fires.
    ///
    /// A server failure cancels the refresh loop as well.
    pub async fn run_on(self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        let refresh = tokio::spawn(self.refresher.run(cancel.clone()));

        let shutdown = cancel.clone();
        let served = MetricsServer::with_config(self.registry, self.metrics)
            .serve_on(listener, async move { shutdown.cancelled().await })
            .await;

        if let Err(e) = &served {
            error!("Metrics server failed: {:#}", e);
        }
        cancel.cancel();
        refresh.await.context("Refresh loop panicked")?;

        info!("Exporter stopped");
        served
    }
}
