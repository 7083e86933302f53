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

//! Prometheus collector for cached usage snapshots
//!
//! Nothing is recorded between scrapes. Each `collect()` copies the latest
//! snapshot out of the cache and translates it into fresh gauges, so a scrape
//! always reflects exactly one refresh cycle.

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use s3usage_engine::{Snapshot, SnapshotCache};
use std::sync::Arc;
use tracing::{debug, error};

use crate::types::EndpointLabels;

const ENDPOINT_LABELS: &[&str] = &["s3Endpoint", "s3Region"];
const CLASS_LABELS: &[&str] = &["s3Endpoint", "s3Region", "storageClass"];
const BUCKET_LABELS: &[&str] = &["s3Endpoint", "s3Region", "bucketName"];
const BUCKET_CLASS_LABELS: &[&str] = &["s3Endpoint", "s3Region", "bucketName", "storageClass"];

/// One set of usage gauges, rebuilt for every scrape
struct UsageGauges {
    up: GaugeVec,
    total_size: GaugeVec,
    total_objects: GaugeVec,
    total_duration: GaugeVec,
    bucket_size: GaugeVec,
    bucket_objects: GaugeVec,
    bucket_duration: GaugeVec,
}

impl UsageGauges {
    fn new() -> prometheus::Result<Self> {
        let gauge = |name: &str, help: &str, labels: &[&str]| GaugeVec::new(Opts::new(name, help), labels);

        Ok(Self {
            up: gauge("s3_endpoint_up", "Connection to S3 successful", ENDPOINT_LABELS)?,
            total_size: gauge("s3_total_size", "S3 Total Bucket Size", CLASS_LABELS)?,
            total_objects: gauge("s3_total_object_number", "S3 Total Object Number", CLASS_LABELS)?,
            total_duration: gauge(
                "s3_list_total_duration_seconds",
                "Total time spent listing objects across all buckets",
                ENDPOINT_LABELS,
            )?,
            bucket_size: gauge("s3_bucket_size", "S3 Bucket Size", BUCKET_CLASS_LABELS)?,
            bucket_objects: gauge("s3_bucket_object_number", "S3 Bucket Object Number", BUCKET_CLASS_LABELS)?,
            bucket_duration: gauge(
                "s3_list_duration_seconds",
                "Time spent listing objects in bucket",
                BUCKET_LABELS,
            )?,
        })
    }

    fn all(&self) -> [&GaugeVec; 7] {
        [
            &self.up,
            &self.total_size,
            &self.total_objects,
            &self.total_duration,
            &self.bucket_size,
            &self.bucket_objects,
            &self.bucket_duration,
        ]
    }

    fn fill(&self, snapshot: &Snapshot, labels: &EndpointLabels) {
        let endpoint = labels.endpoint.as_str();
        let region = labels.region.as_str();
        let summary = &snapshot.summary;

        self.up
            .with_label_values(&[endpoint, region])
            .set(if summary.available { 1.0 } else { 0.0 });

        for (class, metrics) in &summary.per_class {
            let values = [endpoint, region, class.as_str()];
            self.total_size.with_label_values(&values).set(metrics.size as f64);
            self.total_objects
                .with_label_values(&values)
                .set(metrics.object_count as f64);
        }
        self.total_duration
            .with_label_values(&[endpoint, region])
            .set(summary.total_scan_duration.as_secs_f64());

        for bucket in &summary.buckets {
            for (class, metrics) in &bucket.per_class {
                let values = [endpoint, region, bucket.name.as_str(), class.as_str()];
                self.bucket_size.with_label_values(&values).set(metrics.size as f64);
                self.bucket_objects
                    .with_label_values(&values)
                    .set(metrics.object_count as f64);
            }
            self.bucket_duration
                .with_label_values(&[endpoint, region, bucket.name.as_str()])
                .set(bucket.scan_duration.as_secs_f64());
        }
    }
}

/// Custom Prometheus collector over a [`SnapshotCache`]
///
/// While the cached snapshot carries an error only `s3_endpoint_up` is
/// reported, with value 0.
pub struct UsageCollector {
    cache: Arc<SnapshotCache>,
    labels: EndpointLabels,
    descriptors: UsageGauges,
}

impl UsageCollector {
    /// Create a collector reading from `cache`
    pub fn new(cache: Arc<SnapshotCache>, labels: EndpointLabels) -> prometheus::Result<Self> {
        Ok(Self {
            cache,
            labels,
            descriptors: UsageGauges::new()?,
        })
    }

    /// Labels attached to every gauge
    pub fn labels(&self) -> &EndpointLabels {
        &self.labels
    }
}

impl Collector for UsageCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descriptors
            .all()
            .into_iter()
            .flat_map(|gauge| gauge.desc())
            .collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let snapshot = self.cache.snapshot();

        let gauges = match UsageGauges::new() {
            Ok(gauges) => gauges,
            Err(e) => {
                error!("Failed to build usage gauges: {}", e);
                return Vec::new();
            }
        };

        if let Some(err) = &snapshot.last_error {
            debug!(error = %err, cycle = snapshot.cycle, "Cached error");
            gauges
                .up
                .with_label_values(&[self.labels.endpoint.as_str(), self.labels.region.as_str()])
                .set(0.0);
            return gauges.up.collect();
        }

        debug!(
            endpoint = %self.labels.endpoint,
            cycle = snapshot.cycle,
            buckets = snapshot.summary.buckets.len(),
            "Collecting cached usage"
        );
        gauges.fill(&snapshot, &self.labels);

        gauges.all().into_iter().flat_map(|gauge| gauge.collect()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, Registry, TextEncoder};
    use s3usage_engine::{
        BucketReport, CachePolicy, ClassTotals, CycleOutcome, EndpointSummary, EngineError,
        StorageClassMetrics,
    };
    use std::time::Duration;

    fn render(cache: Arc<SnapshotCache>) -> String {
        let registry = Registry::new();
        let collector = UsageCollector::new(cache, EndpointLabels::new("minio:9000", "us-east-1")).unwrap();
        registry.register(Box::new(collector)).unwrap();

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&registry.gather(), &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn outcome() -> CycleOutcome {
        let mut per_class = ClassTotals::new();
        per_class.insert("STANDARD".to_string(), StorageClassMetrics::new(3072, 2));
        per_class.insert("GLACIER".to_string(), StorageClassMetrics::new(4096, 1));

        let mut summary = EndpointSummary::default();
        summary.merge(BucketReport {
            name: "media".to_string(),
            per_class,
            scan_duration: Duration::from_millis(250),
        });
        summary.finish(Duration::from_millis(300));
        CycleOutcome {
            summary,
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_available_snapshot_is_translated() {
        let cache = Arc::new(SnapshotCache::new(CachePolicy::default()));
        cache.publish(Ok(outcome()));

        let text = render(cache);

        assert!(text.contains(r#"s3_endpoint_up{s3Endpoint="minio:9000",s3Region="us-east-1"} 1"#));
        assert!(text.contains(
            r#"s3_total_size{s3Endpoint="minio:9000",s3Region="us-east-1",storageClass="STANDARD"} 3072"#
        ));
        assert!(text.contains(
            r#"s3_total_object_number{s3Endpoint="minio:9000",s3Region="us-east-1",storageClass="GLACIER"} 1"#
        ));
        assert!(text.contains(
            r#"s3_bucket_size{bucketName="media",s3Endpoint="minio:9000",s3Region="us-east-1",storageClass="GLACIER"} 4096"#
        ));
        assert!(text.contains(
            r#"s3_list_duration_seconds{bucketName="media",s3Endpoint="minio:9000",s3Region="us-east-1"} 0.25"#
        ));
        assert!(text.contains(
            r#"s3_list_total_duration_seconds{s3Endpoint="minio:9000",s3Region="us-east-1"} 0.3"#
        ));
    }

    #[test]
    fn test_error_emits_only_up_gauge() {
        let cache = Arc::new(SnapshotCache::new(CachePolicy::KeepStaleOnError));
        cache.publish(Ok(outcome()));
        cache.publish(Err(EngineError::Discovery("connection refused".to_string())));

        let text = render(cache);

        assert!(text.contains(r#"s3_endpoint_up{s3Endpoint="minio:9000",s3Region="us-east-1"} 0"#));
        assert!(!text.contains("s3_total_size"));
        assert!(!text.contains("s3_bucket_size"));
        assert!(!text.contains("s3_list_duration_seconds"));
    }

    #[test]
    fn test_before_first_cycle_reports_down() {
        let cache = Arc::new(SnapshotCache::new(CachePolicy::default()));
        let text = render(cache);

        assert!(text.contains(r#"s3_endpoint_up{s3Endpoint="minio:9000",s3Region="us-east-1"} 0"#));
        assert!(!text.contains("s3_bucket_size"));
    }

    #[test]
    fn test_scrapes_follow_new_cycles() {
        let cache = Arc::new(SnapshotCache::new(CachePolicy::default()));
        let collector =
            UsageCollector::new(Arc::clone(&cache), EndpointLabels::new("", "eu-west-1")).unwrap();

        assert_eq!(collector.desc().len(), 7);
        cache.publish(Ok(outcome()));
        let with_data = collector.collect().len();
        cache.publish(Err(EngineError::Auth("expired".to_string())));
        let with_error = collector.collect().len();

        assert!(with_data > with_error);
        assert_eq!(with_error, 1);
    }
}
