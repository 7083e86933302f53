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

//! Periodic refresh loop
//!
//! A single task alternates between running a cycle and sleeping for the
//! configured interval. The sleep starts only after the cycle has been
//! published, so cycles never overlap and a slow cycle simply pushes the
//! next one back.

use crate::aggregator::{Aggregator, CycleOutcome};
use crate::cache::SnapshotCache;
use crate::error::{EngineError, EngineResult};
use crate::request::RequestOptions;
use crate::resolver::resolve_buckets;
use s3usage_storage::AuthProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Default pause between cycles
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Settings for each refresh cycle
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Pause between the end of one cycle and the start of the next
    pub interval: Duration,
    /// Comma-separated bucket list; empty means discover all buckets
    pub bucket_names: String,
    /// Region passed as the discovery hint
    pub region: String,
    /// Per-request timeout for storage calls
    pub request_timeout: Option<Duration>,
    /// Optional cap on concurrent bucket scans
    pub max_concurrency: Option<usize>,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            bucket_names: String::new(),
            region: String::from("us-east-1"),
            request_timeout: None,
            max_concurrency: None,
        }
    }
}

/// Drives resolution, aggregation and publishing on a fixed interval
#[derive(Debug, Clone)]
pub struct RefreshLoop {
    auth: Arc<dyn AuthProvider>,
    cache: Arc<SnapshotCache>,
    settings: RefreshSettings,
}

impl RefreshLoop {
    /// Create a loop publishing into `cache`
    pub fn new(auth: Arc<dyn AuthProvider>, cache: Arc<SnapshotCache>, settings: RefreshSettings) -> Self {
        Self { auth, cache, settings }
    }

    /// Cache this loop publishes into
    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Run one cycle without publishing it.
    ///
    /// Auth failure skips resolution and aggregation entirely; discovery
    /// failure skips aggregation.
    pub async fn execute_cycle(&self, cancel: &CancellationToken) -> EngineResult<CycleOutcome> {
        let options = RequestOptions::new(self.settings.request_timeout, cancel.clone());

        let client = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
            result = self.auth.client() => result.map_err(|e| {
                error!(error = %e, "Failed to configure authentication");
                EngineError::auth(&e)
            })?,
        };

        let buckets = resolve_buckets(
            &self.settings.bucket_names,
            client.as_ref(),
            &self.settings.region,
            &options,
        )
        .await?;

        Aggregator::new(client, options)
            .with_max_concurrency(self.settings.max_concurrency)
            .aggregate(&buckets)
            .await
    }

    /// Run one cycle and publish its outcome.
    ///
    /// A cancelled cycle publishes nothing and returns `false`.
    pub async fn refresh_once(&self, cancel: &CancellationToken) -> bool {
        let start = Instant::now();
        let outcome = self.execute_cycle(cancel).await;

        if matches!(outcome, Err(EngineError::Cancelled)) {
            info!("Refresh cycle cancelled before publishing");
            return false;
        }

        match &outcome {
            Ok(cycle) => info!(
                buckets = cycle.summary.buckets.len(),
                failed = cycle.failures.len(),
                available = cycle.summary.available,
                size = cycle.summary.total_size(),
                objects = cycle.summary.total_objects(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Refresh cycle complete"
            ),
            Err(err) => error!(
                error = %err,
                detail = err.detail().unwrap_or_default(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Refresh cycle failed"
            ),
        }

        self.cache.publish(outcome);
        true
    }

    /// Run cycles until `cancel` fires.
    ///
    /// The first cycle starts immediately.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            interval_secs = self.settings.interval.as_secs_f64(),
            buckets = %self.settings.bucket_names,
            "Starting refresh loop"
        );

        loop {
            if !self.refresh_once(&cancel).await {
                break;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        info!("Refresh loop stopped");
    }
}
