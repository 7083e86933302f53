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

//! Paginated bucket scanner
//!
//! Walks a bucket's `ListObjectsV2` pages until the endpoint stops reporting
//! truncation, totalling size and count per storage class. Any failed page
//! fails the whole bucket; partial totals are discarded.

use crate::model::{BucketReport, ClassTotals, DEFAULT_STORAGE_CLASS};
use crate::request::RequestOptions;
use s3usage_storage::{ObjectEntry, StorageClient, StorageError, StorageResult};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Storage class an object is counted under
pub fn effective_storage_class(reported: &str) -> &str {
    if reported.is_empty() {
        DEFAULT_STORAGE_CLASS
    } else {
        reported
    }
}

/// Add one page of objects to the running totals
pub fn accumulate(totals: &mut ClassTotals, objects: &[ObjectEntry]) {
    for object in objects {
        let class = effective_storage_class(&object.storage_class);
        match totals.get_mut(class) {
            Some(metrics) => metrics.record_object(object.size),
            None => {
                totals
                    .entry(class.to_string())
                    .or_default()
                    .record_object(object.size);
            }
        }
    }
}

/// Scan `bucket` to completion.
///
/// There is no page limit. A page that claims truncation without returning a
/// continuation token is treated as an error, since re-requesting without a
/// token would restart the listing from the beginning.
pub async fn scan_bucket(
    client: &dyn StorageClient,
    bucket: &str,
    options: &RequestOptions,
) -> StorageResult<BucketReport> {
    let start = Instant::now();
    let operation = format!("ListObjectsV2 on '{}'", bucket);
    let mut per_class = ClassTotals::new();
    let mut continuation_token: Option<String> = None;
    let mut pages: u64 = 0;

    loop {
        let page = options
            .run(&operation, client.list_objects(bucket, continuation_token.as_deref()))
            .await?;
        pages += 1;

        trace!(bucket, page = pages, objects = page.objects.len(), "Listed page");
        accumulate(&mut per_class, &page.objects);

        if !page.is_truncated {
            break;
        }

        match page.next_token {
            Some(token) if !token.is_empty() => continuation_token = Some(token),
            _ => {
                return Err(StorageError::request(
                    "ListObjectsV2",
                    bucket,
                    "truncated listing returned no continuation token",
                ))
            }
        }
    }

    let scan_duration = start.elapsed();
    debug!(
        bucket,
        pages,
        classes = per_class.len(),
        duration_ms = scan_duration.as_millis() as u64,
        "Finished bucket scan"
    );

    Ok(BucketReport {
        name: bucket.to_string(),
        per_class,
        scan_duration,
    })
}
