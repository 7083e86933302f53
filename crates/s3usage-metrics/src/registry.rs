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
//! Metrics registry for the exporter

use prometheus::Registry;
use s3usage_engine::SnapshotCache;
use s3usage_storage::AuthAttempts;
use std::sync::Arc;

use crate::collector::UsageCollector;
use crate::types::EndpointLabels;

/// Registry holding every metric the exporter serves
///
/// Thread-safe registry that can be cloned and shared across handlers.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<MetricsRegistryInner>,
}

struct MetricsRegistryInner {
    /// Prometheus registry
    registry: Registry,
    /// Authentication attempt counter, handed to the auth provider
    auth_attempts: AuthAttempts,
    labels: EndpointLabels,
}

impl MetricsRegistry {
    /// Create a registry serving usage from `cache`
    pub fn new(cache: Arc<SnapshotCache>, labels: EndpointLabels) -> anyhow::Result<Self> {
        let registry = Registry::new();

        let collector = UsageCollector::new(cache, labels.clone())?;
        registry.register(Box::new(collector))?;

        let auth_attempts = AuthAttempts::register(&registry)?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        Ok(Self {
            inner: Arc::new(MetricsRegistryInner {
                registry,
                auth_attempts,
                labels,
            }),
        })
    }

    /// Get the underlying Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Counter to pass to the auth provider
    pub fn auth_attempts(&self) -> AuthAttempts {
        self.inner.auth_attempts.clone()
    }

    /// Labels attached to the usage gauges
    pub fn labels(&self) -> &EndpointLabels {
        &self.inner.labels
    }
}
