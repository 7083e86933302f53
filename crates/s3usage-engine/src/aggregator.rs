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

//! Concurrent aggregation across buckets
//!
//! One task per bucket is spawned into a [`JoinSet`]. Successful reports are
//! merged into a summary shared behind a mutex that lives only for the
//! cycle; failures are collected and never cancel sibling scans. The join
//! loop is the barrier: the summary is finished only after every task ends.
//!
//! Fan-out is unbounded unless a concurrency cap is configured, in which
//! case a [`Semaphore`] limits how many scans hold a permit at once.

use crate::error::{BucketFailure, EngineError, EngineResult};
use crate::model::EndpointSummary;
use crate::request::RequestOptions;
use crate::scanner::scan_bucket;
use s3usage_storage::StorageClient;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{Id, JoinSet};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcome of aggregating one resolved bucket list
#[derive(Debug, Clone, Default)]
pub struct CycleOutcome {
    /// Merged usage of all buckets that scanned successfully
    pub summary: EndpointSummary,
    /// Buckets that failed, in the order their failures were observed
    pub failures: Vec<BucketFailure>,
}

/// Fans bucket scans out over tasks and folds the results together
#[derive(Debug, Clone)]
pub struct Aggregator {
    client: Arc<dyn StorageClient>,
    options: RequestOptions,
    max_concurrency: Option<usize>,
}

impl Aggregator {
    /// Aggregator over `client` with unbounded fan-out
    pub fn new(client: Arc<dyn StorageClient>, options: RequestOptions) -> Self {
        Self {
            client,
            options,
            max_concurrency: None,
        }
    }

    /// Cap the number of concurrent bucket scans; `None` or zero is unbounded
    pub fn with_max_concurrency(mut self, max_concurrency: Option<usize>) -> Self {
        self.max_concurrency = max_concurrency.filter(|&n| n > 0);
        self
    }

    /// Scan every bucket and merge the results.
    ///
    /// Bucket failures never fail the call. The only error is
    /// [`EngineError::Cancelled`], returned when shutdown interrupts the
    /// cycle; no partial summary is returned in that case.
    pub async fn aggregate(&self, buckets: &[String]) -> EngineResult<CycleOutcome> {
        let start = Instant::now();
        let summary = Arc::new(Mutex::new(EndpointSummary::default()));
        let limiter = self.max_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks = JoinSet::new();
        let mut task_buckets: HashMap<Id, String> = HashMap::with_capacity(buckets.len());

        for bucket in buckets {
            let bucket = bucket.clone();
            let client = Arc::clone(&self.client);
            let options = self.options.clone();
            let summary = Arc::clone(&summary);
            let limiter = limiter.clone();
            let name = bucket.clone();

            let handle = tasks.spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(_) => return Err(BucketFailure {
                            bucket,
                            error: "scan limiter closed".to_string(),
                        }),
                    },
                    None => None,
                };

                match scan_bucket(client.as_ref(), &bucket, &options).await {
                    Ok(report) => {
                        debug!(
                            bucket = %report.name,
                            size = report.total_size(),
                            objects = report.total_objects(),
                            "Finish bucket processing"
                        );
                        summary.lock().await.merge(report);
                        Ok(())
                    }
                    Err(e) => Err(BucketFailure::new(bucket, &e)),
                }
            });
            task_buckets.insert(handle.id(), name);
        }

        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((_, Err(failure))) => failures.push(failure),
                Err(join_error) => failures.push(BucketFailure {
                    bucket: task_buckets
                        .remove(&join_error.id())
                        .unwrap_or_else(|| String::from("<unknown>")),
                    error: format!("scan task failed: {}", join_error),
                }),
            }
        }

        if self.options.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut summary = match Arc::try_unwrap(summary) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };

        // Completion order is arbitrary; report buckets in resolution order
        let position: HashMap<&str, usize> = buckets
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        summary
            .buckets
            .sort_by_key(|report| position.get(report.name.as_str()).copied().unwrap_or(usize::MAX));

        summary.finish(start.elapsed());

        if !failures.is_empty() {
            let errors: Vec<String> = failures.iter().map(ToString::to_string).collect();
            warn!(
                failed = failures.len(),
                succeeded = summary.buckets.len(),
                ?errors,
                "Encountered errors while processing buckets"
            );
        }

        Ok(CycleOutcome { summary, failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StorageClassMetrics;
    use s3usage_storage::mock::MockStorageClient;
    use s3usage_storage::{ObjectEntry, ObjectPage, StorageResult};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn two_objects() -> Vec<ObjectEntry> {
        vec![ObjectEntry::new(1024, ""), ObjectEntry::new(2048, "")]
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_two_buckets_aggregate() {
        let client = MockStorageClient::new()
            .with_bucket("bucket1", two_objects())
            .with_bucket("bucket2", two_objects());
        let aggregator = Aggregator::new(Arc::new(client), RequestOptions::default());

        let outcome = aggregator.aggregate(&names(&["bucket1", "bucket2"])).await.unwrap();

        assert!(outcome.failures.is_empty());
        assert!(outcome.summary.available);
        assert_eq!(outcome.summary.buckets.len(), 2);
        assert_eq!(
            outcome.summary.per_class["STANDARD"],
            StorageClassMetrics::new(6144, 4)
        );
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_cycle() {
        let client = MockStorageClient::new()
            .with_bucket("a", two_objects())
            .with_bucket("b", two_objects())
            .with_bucket("c", two_objects())
            .with_failing_bucket("b");
        let aggregator = Aggregator::new(Arc::new(client), RequestOptions::default());

        let outcome = aggregator.aggregate(&names(&["a", "b", "c"])).await.unwrap();

        assert!(outcome.summary.available);
        let scanned: Vec<&str> = outcome.summary.buckets.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(scanned, vec!["a", "c"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].bucket, "b");
    }

    #[tokio::test]
    async fn test_all_failed_is_unavailable_not_error() {
        let client = MockStorageClient::new()
            .with_bucket("a", two_objects())
            .with_failing_bucket("a")
            .with_failing_bucket("ghost");
        let aggregator = Aggregator::new(Arc::new(client), RequestOptions::default());

        let outcome = aggregator.aggregate(&names(&["a", "ghost"])).await.unwrap();

        assert!(!outcome.summary.available);
        assert!(outcome.summary.buckets.is_empty());
        assert!(outcome.summary.per_class.is_empty());
        assert_eq!(outcome.failures.len(), 2);
    }

    /// Panics while listing `poisoned`, serves the mock otherwise
    #[derive(Debug)]
    struct PanicsOn {
        inner: MockStorageClient,
        poisoned: &'static str,
    }

    #[async_trait::async_trait]
    impl StorageClient for PanicsOn {
        async fn list_buckets(&self, region_hint: &str) -> StorageResult<Vec<String>> {
            self.inner.list_buckets(region_hint).await
        }

        async fn list_objects(&self, bucket: &str, token: Option<&str>) -> StorageResult<ObjectPage> {
            if bucket == self.poisoned {
                panic!("listing {} blew up", bucket);
            }
            self.inner.list_objects(bucket, token).await
        }
    }

    #[tokio::test]
    async fn test_panicked_scan_keeps_bucket_name() {
        let client = PanicsOn {
            inner: MockStorageClient::new()
                .with_bucket("a", two_objects())
                .with_bucket("b", two_objects()),
            poisoned: "b",
        };
        let aggregator = Aggregator::new(Arc::new(client), RequestOptions::default());

        let outcome = aggregator.aggregate(&names(&["a", "b"])).await.unwrap();

        assert_eq!(outcome.summary.buckets.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].bucket, "b");
        assert!(outcome.failures[0].error.contains("scan task failed"));
    }

    #[tokio::test]
    async fn test_empty_bucket_list() {
        let aggregator = Aggregator::new(Arc::new(MockStorageClient::new()), RequestOptions::default());
        let outcome = aggregator.aggregate(&[]).await.unwrap();
        assert!(!outcome.summary.available);
        assert!(outcome.failures.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scans_overlap_in_time() {
        let client = MockStorageClient::new()
            .with_latency(Duration::from_secs(10))
            .with_bucket("a", two_objects())
            .with_bucket("b", two_objects())
            .with_bucket("c", two_objects());
        let probe = client.clone();
        let aggregator = Aggregator::new(Arc::new(client), RequestOptions::default());

        let outcome = aggregator.aggregate(&names(&["a", "b", "c"])).await.unwrap();

        assert_eq!(probe.peak_in_flight(), 3);
        // Wall-clock of the cycle, not the sum of the scans
        assert!(outcome.summary.total_scan_duration < Duration::from_secs(30));
        let summed: Duration = outcome.summary.buckets.iter().map(|b| b.scan_duration).sum();
        assert!(summed >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap_is_respected() {
        let client = MockStorageClient::new().with_latency(Duration::from_secs(1));
        let client = ["a", "b", "c", "d", "e"]
            .iter()
            .fold(client, |c, name| c.with_bucket(*name, two_objects()));
        let probe = client.clone();
        let aggregator = Aggregator::new(Arc::new(client), RequestOptions::default())
            .with_max_concurrency(Some(2));

        let outcome = aggregator
            .aggregate(&names(&["a", "b", "c", "d", "e"]))
            .await
            .unwrap();

        assert_eq!(outcome.summary.buckets.len(), 5);
        assert!(probe.peak_in_flight() <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_returns_error() {
        let cancel = CancellationToken::new();
        let client = MockStorageClient::new()
            .with_latency(Duration::from_secs(60))
            .with_bucket("a", two_objects());
        let aggregator = Aggregator::new(
            Arc::new(client),
            RequestOptions::new(None, cancel.clone()),
        );

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });

        let result = aggregator.aggregate(&names(&["a"])).await;
        trigger.await.unwrap();
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }
}
