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

//! Usage data model
//!
//! Per-class totals are kept in `BTreeMap`s so exported series come out in a
//! stable order.

use std::collections::BTreeMap;
use std::ops::AddAssign;
use std::time::Duration;

/// Storage class assigned to objects whose listing entry carries none
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

/// Per-class totals keyed by storage class name
pub type ClassTotals = BTreeMap<String, StorageClassMetrics>;

/// Size and object count for one storage class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageClassMetrics {
    /// Total size in bytes
    pub size: u64,
    /// Number of objects
    pub object_count: u64,
}

impl StorageClassMetrics {
    /// Create metrics from raw totals
    pub fn new(size: u64, object_count: u64) -> Self {
        Self { size, object_count }
    }

    /// Account for one object of `size` bytes
    pub fn record_object(&mut self, size: u64) {
        self.size = self.size.saturating_add(size);
        self.object_count = self.object_count.saturating_add(1);
    }
}

impl AddAssign for StorageClassMetrics {
    fn add_assign(&mut self, other: Self) {
        self.size = self.size.saturating_add(other.size);
        self.object_count = self.object_count.saturating_add(other.object_count);
    }
}

/// Add every class of `from` into `into`
pub fn merge_class_totals(into: &mut ClassTotals, from: &ClassTotals) {
    for (class, metrics) in from {
        *into.entry(class.clone()).or_default() += *metrics;
    }
}

/// Result of one successful bucket scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketReport {
    /// Bucket name
    pub name: String,
    /// Totals per storage class; only classes with at least one object
    pub per_class: ClassTotals,
    /// Wall-clock time spent listing the bucket
    pub scan_duration: Duration,
}

impl BucketReport {
    /// Size across all classes
    pub fn total_size(&self) -> u64 {
        self.per_class.values().map(|m| m.size).sum()
    }

    /// Object count across all classes
    pub fn total_objects(&self) -> u64 {
        self.per_class.values().map(|m| m.object_count).sum()
    }
}

/// Aggregated usage of one endpoint for one refresh cycle
///
/// `per_class` is always the sum of the `per_class` maps of `buckets`, and
/// `available` is true exactly when `buckets` is non-empty once the cycle
/// has finished.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointSummary {
    /// Whether at least one bucket was scanned successfully
    pub available: bool,
    /// Totals per storage class across all buckets
    pub per_class: ClassTotals,
    /// One report per successfully scanned bucket
    pub buckets: Vec<BucketReport>,
    /// Wall-clock time from dispatch to the last scan finishing
    pub total_scan_duration: Duration,
}

impl EndpointSummary {
    /// Fold one bucket into the totals and append its report
    pub fn merge(&mut self, report: BucketReport) {
        merge_class_totals(&mut self.per_class, &report.per_class);
        self.buckets.push(report);
    }

    /// Close the cycle: derive availability and record the elapsed time
    pub fn finish(&mut self, total_scan_duration: Duration) {
        self.available = !self.buckets.is_empty();
        self.total_scan_duration = total_scan_duration;
    }

    /// Size across all classes
    pub fn total_size(&self) -> u64 {
        self.per_class.values().map(|m| m.size).sum()
    }

    /// Object count across all classes
    pub fn total_objects(&self) -> u64 {
        self.per_class.values().map(|m| m.object_count).sum()
    }

    /// Recompute the per-class totals from the bucket reports
    pub fn recomputed_totals(&self) -> ClassTotals {
        let mut totals = ClassTotals::new();
        for bucket in &self.buckets {
            merge_class_totals(&mut totals, &bucket.per_class);
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn report(name: &str, classes: &[(&str, u64, u64)]) -> BucketReport {
        BucketReport {
            name: name.to_string(),
            per_class: classes
                .iter()
                .map(|(c, s, n)| (c.to_string(), StorageClassMetrics::new(*s, *n)))
                .collect(),
            scan_duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_record_object() {
        let mut metrics = StorageClassMetrics::default();
        metrics.record_object(1024);
        metrics.record_object(2048);
        assert_eq!(metrics, StorageClassMetrics::new(3072, 2));
    }

    #[test]
    fn test_merge_adds_per_class_and_appends() {
        let mut summary = EndpointSummary::default();
        summary.merge(report("a", &[("STANDARD", 3072, 2)]));
        summary.merge(report("b", &[("STANDARD", 100, 1), ("GLACIER", 4096, 1)]));
        summary.finish(Duration::from_secs(1));

        assert!(summary.available);
        assert_eq!(summary.buckets.len(), 2);
        assert_eq!(summary.per_class["STANDARD"], StorageClassMetrics::new(3172, 3));
        assert_eq!(summary.per_class["GLACIER"], StorageClassMetrics::new(4096, 1));
        assert_eq!(summary.total_size(), 7268);
        assert_eq!(summary.total_objects(), 4);
        assert_eq!(summary.per_class, summary.recomputed_totals());
    }

    #[test]
    fn test_finish_without_buckets_is_unavailable() {
        let mut summary = EndpointSummary::default();
        summary.finish(Duration::from_millis(3));
        assert!(!summary.available);
        assert!(summary.per_class.is_empty());
        assert_eq!(summary.total_scan_duration, Duration::from_millis(3));
    }

    fn arb_report() -> impl Strategy<Value = BucketReport> {
        (
            "[a-z]{1,8}",
            prop::collection::btree_map(
                prop::sample::select(vec!["STANDARD", "GLACIER", "STANDARD_IA", "ONEZONE_IA"]),
                (0u64..1_000_000, 1u64..1000),
                0..4,
            ),
        )
            .prop_map(|(name, classes)| BucketReport {
                name,
                per_class: classes
                    .into_iter()
                    .map(|(c, (s, n))| (c.to_string(), StorageClassMetrics::new(s, n)))
                    .collect(),
                scan_duration: Duration::ZERO,
            })
    }

    proptest! {
        #[test]
        fn prop_merge_order_does_not_matter(
            reports in prop::collection::vec(arb_report(), 0..8),
            seed in any::<u64>(),
        ) {
            let mut forward = EndpointSummary::default();
            for r in reports.iter().cloned() {
                forward.merge(r);
            }

            let mut shuffled = reports.clone();
            // Deterministic permutation driven by the seed
            let len = shuffled.len();
            if len > 1 {
                for i in 0..len {
                    let j = ((seed.rotate_left(i as u32) as usize) ^ i) % len;
                    shuffled.swap(i, j);
                }
            }
            let mut permuted = EndpointSummary::default();
            for r in shuffled {
                permuted.merge(r);
            }

            prop_assert_eq!(&forward.per_class, &permuted.per_class);
            prop_assert_eq!(&forward.per_class, &forward.recomputed_totals());
        }

        #[test]
        fn prop_merge_is_associative(
            a in arb_report(),
            b in arb_report(),
            c in arb_report(),
        ) {
            // (a + b) + c
            let mut left = a.per_class.clone();
            merge_class_totals(&mut left, &b.per_class);
            merge_class_totals(&mut left, &c.per_class);

            // a + (b + c)
            let mut bc = b.per_class.clone();
            merge_class_totals(&mut bc, &c.per_class);
            let mut right = a.per_class.clone();
            merge_class_totals(&mut right, &bc);

            prop_assert_eq!(left, right);
        }

        #[test]
        fn prop_available_iff_buckets(reports in prop::collection::vec(arb_report(), 0..5)) {
            let mut summary = EndpointSummary::default();
            let expected = !reports.is_empty();
            for r in reports {
                summary.merge(r);
            }
            summary.finish(Duration::ZERO);
            prop_assert_eq!(summary.available, expected);
        }
    }
}
