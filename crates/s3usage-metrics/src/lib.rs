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

//! s3usage Metrics Module
//!
//! Prometheus exposition of the cached bucket usage snapshot.
//!
//! # Features
//!
//! - **Snapshot translation**: a custom [`prometheus::core::Collector`] turns the
//!   latest cached cycle into gauges at scrape time
//! - **HTTP Endpoint**: Axum-based `/metrics` and `/health` endpoints
//! - **Auth accounting**: `s3_auth_attempts_total` shares the same registry
//!
//! # Exposed gauges
//!
//! | name | extra labels |
//! |---|---|
//! | `s3_endpoint_up` | |
//! | `s3_total_size`, `s3_total_object_number` | `storageClass` |
//! | `s3_list_total_duration_seconds` | |
//! | `s3_bucket_size`, `s3_bucket_object_number` | `bucketName`, `storageClass` |
//! | `s3_list_duration_seconds` | `bucketName` |
//!
//! Every gauge carries `s3Endpoint` and `s3Region`.
//!
//! # Example
//!
//! ```ignore
//! use s3usage_engine::{CachePolicy, SnapshotCache};
//! use s3usage_metrics::{EndpointLabels, MetricsRegistry, MetricsServer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = Arc::new(SnapshotCache::new(CachePolicy::default()));
//!     let registry = MetricsRegistry::new(cache, EndpointLabels::new("", "us-east-1"))?;
//!
//!     MetricsServer::new(registry, 9655)
//!         .serve(async { let _ = tokio::signal::ctrl_c().await; })
//!         .await
//! }
//! ```

pub mod collector;
pub mod registry;
pub mod server;
pub mod types;

pub use collector::UsageCollector;
pub use registry::MetricsRegistry;
pub use server::MetricsServer;
pub use types::{EndpointLabels, MetricsConfig, DEFAULT_PORT};

// Re-export prometheus types for convenience
pub use prometheus::{Encoder, TextEncoder};
