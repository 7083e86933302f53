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

//! Bucket usage aggregation engine
//!
//! Each refresh cycle flows one way:
//!
//! ```text
//! RefreshLoop -> resolve_buckets -> Aggregator -> scan_bucket x N -> SnapshotCache
//! ```
//!
//! - [`resolver`] picks the buckets to scan, from an explicit list or by discovery
//! - [`scanner`] walks one bucket's listing pages and totals it per storage class
//! - [`aggregator`] scans buckets concurrently and merges the reports
//! - [`cache`] holds the latest snapshot for metric readers
//! - [`refresh`] runs cycles on a fixed interval, one at a time
//!
//! # Example
//!
//! ```rust,no_run
//! use s3usage_engine::{CachePolicy, RefreshLoop, RefreshSettings, SnapshotCache};
//! use s3usage_storage::mock::{MockAuthProvider, MockStorageClient};
//! use s3usage_storage::ObjectEntry;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = MockStorageClient::new().with_bucket("logs", vec![ObjectEntry::new(1024, "")]);
//!     let cache = Arc::new(SnapshotCache::new(CachePolicy::default()));
//!     let refresher = RefreshLoop::new(
//!         Arc::new(MockAuthProvider::new(Arc::new(client))),
//!         Arc::clone(&cache),
//!         RefreshSettings::default(),
//!     );
//!
//!     refresher.refresh_once(&CancellationToken::new()).await;
//!     assert!(cache.snapshot().summary.available);
//! }
//! ```

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod model;
pub mod refresh;
pub mod request;
pub mod resolver;
pub mod scanner;

pub use aggregator::{Aggregator, CycleOutcome};
pub use cache::{CachePolicy, Snapshot, SnapshotCache};
pub use error::{BucketFailure, EngineError, EngineResult};
pub use model::{BucketReport, ClassTotals, EndpointSummary, StorageClassMetrics, DEFAULT_STORAGE_CLASS};
pub use refresh::{RefreshLoop, RefreshSettings, DEFAULT_INTERVAL};
pub use request::RequestOptions;
pub use resolver::{distinct, resolve_buckets};
pub use scanner::scan_bucket;
