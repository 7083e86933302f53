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

//! Snapshot cache shared between the refresh loop and metric readers
//!
//! The refresh loop is the only writer. Readers copy the whole snapshot out
//! under a shared lock and never hold it across any other work, so a reader
//! sees either the previous cycle or the new one in full.
//!
//! A blocking [`RwLock`] is used because the Prometheus collector reads the
//! snapshot from a synchronous `collect()` call.

use crate::aggregator::CycleOutcome;
use crate::error::{BucketFailure, EngineError, EngineResult};
use crate::model::EndpointSummary;
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// What a failed cycle does to the previously published summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CachePolicy {
    /// Replace the summary with an empty, unavailable one
    #[default]
    ResetOnError,
    /// Keep the last good summary alongside the new error
    KeepStaleOnError,
}

/// Latest published cycle outcome
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Usage computed by the last cycle (or kept from an earlier one)
    pub summary: EndpointSummary,
    /// Set when the last cycle was aborted
    pub last_error: Option<EngineError>,
    /// Buckets that failed during the last cycle
    pub failed_buckets: Vec<BucketFailure>,
    /// When the last cycle was published; `None` before the first one
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of cycles published so far
    pub cycle: u64,
}

impl Snapshot {
    /// Whether at least one cycle has been published
    pub fn is_initialized(&self) -> bool {
        self.updated_at.is_some()
    }
}

/// Lock-guarded holder of the latest [`Snapshot`]
#[derive(Debug, Default)]
pub struct SnapshotCache {
    state: RwLock<Snapshot>,
    policy: CachePolicy,
}

impl SnapshotCache {
    /// Empty cache; readers see an unavailable summary until the first publish
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            state: RwLock::new(Snapshot::default()),
            policy,
        }
    }

    /// Policy applied to failed cycles
    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Replace the cached state with the outcome of one cycle
    pub fn publish(&self, outcome: EngineResult<CycleOutcome>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let cycle = state.cycle + 1;
        let (summary, last_error, failed_buckets) = match outcome {
            Ok(CycleOutcome { summary, failures }) => (summary, None, failures),
            Err(err) => {
                let summary = match self.policy {
                    CachePolicy::ResetOnError => EndpointSummary::default(),
                    CachePolicy::KeepStaleOnError => std::mem::take(&mut state.summary),
                };
                (summary, Some(err), Vec::new())
            }
        };

        *state = Snapshot {
            summary,
            last_error,
            failed_buckets,
            updated_at: Some(Utc::now()),
            cycle,
        };

        debug!(
            cycle,
            available = state.summary.available,
            error = state.last_error.is_some(),
            "Published snapshot"
        );
    }

    /// Copy of the latest snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BucketReport, ClassTotals, StorageClassMetrics};
    use std::sync::Arc;
    use std::time::Duration;

    fn outcome(bucket: &str, size: u64) -> CycleOutcome {
        let mut per_class = ClassTotals::new();
        per_class.insert("STANDARD".to_string(), StorageClassMetrics::new(size, 1));
        let mut summary = EndpointSummary::default();
        summary.merge(BucketReport {
            name: bucket.to_string(),
            per_class,
            scan_duration: Duration::from_millis(5),
        });
        summary.finish(Duration::from_millis(5));
        CycleOutcome {
            summary,
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_initial_snapshot_is_unavailable() {
        let cache = SnapshotCache::new(CachePolicy::default());
        let snapshot = cache.snapshot();

        assert!(!snapshot.summary.available);
        assert!(snapshot.last_error.is_none());
        assert!(!snapshot.is_initialized());
        assert_eq!(snapshot.cycle, 0);
    }

    #[test]
    fn test_publish_replaces_wholesale() {
        let cache = SnapshotCache::new(CachePolicy::ResetOnError);
        cache.publish(Ok(outcome("a", 10)));
        cache.publish(Ok(outcome("b", 20)));

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.cycle, 2);
        assert_eq!(snapshot.summary.buckets.len(), 1);
        assert_eq!(snapshot.summary.buckets[0].name, "b");
        assert_eq!(snapshot.summary.total_size(), 20);
        assert!(snapshot.is_initialized());
    }

    #[test]
    fn test_reset_on_error_clears_summary() {
        let cache = SnapshotCache::new(CachePolicy::ResetOnError);
        cache.publish(Ok(outcome("a", 10)));
        cache.publish(Err(EngineError::Discovery("dns".to_string())));

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.summary, EndpointSummary::default());
        assert_eq!(snapshot.last_error, Some(EngineError::Discovery("dns".to_string())));
    }

    #[test]
    fn test_keep_stale_on_error_retains_summary() {
        let cache = SnapshotCache::new(CachePolicy::KeepStaleOnError);
        cache.publish(Ok(outcome("a", 10)));
        cache.publish(Err(EngineError::Auth("expired".to_string())));

        let snapshot = cache.snapshot();
        assert!(snapshot.summary.available);
        assert_eq!(snapshot.summary.total_size(), 10);
        assert!(snapshot.last_error.is_some());

        // A later success clears the error
        cache.publish(Ok(outcome("b", 3)));
        let snapshot = cache.snapshot();
        assert!(snapshot.last_error.is_none());
        assert_eq!(snapshot.summary.total_size(), 3);
    }

    #[test]
    fn test_failures_are_recorded() {
        let cache = SnapshotCache::new(CachePolicy::ResetOnError);
        let mut cycle = outcome("a", 10);
        cycle.failures.push(BucketFailure {
            bucket: "b".to_string(),
            error: "AccessDenied".to_string(),
        });
        cache.publish(Ok(cycle));

        assert_eq!(cache.snapshot().failed_buckets.len(), 1);
    }

    #[test]
    fn test_reader_survives_poisoned_lock() {
        let cache = Arc::new(SnapshotCache::new(CachePolicy::ResetOnError));
        cache.publish(Ok(outcome("a", 10)));

        let poisoner = Arc::clone(&cache);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.write().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(cache.snapshot().summary.total_size(), 10);
        cache.publish(Ok(outcome("b", 4)));
        assert_eq!(cache.snapshot().summary.total_size(), 4);
    }
}
