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

//! AWS SDK implementation of [`StorageClient`]
//!
//! Works against AWS S3 and S3-compatible services (Ceph RGW, MinIO, ...).
//! The client is built by [`AwsAuthProvider`](crate::auth::AwsAuthProvider);
//! this module only issues listing calls and maps SDK errors.
//!
//! No retry wrapper is applied: a failed call fails the bucket (or the
//! discovery) for the current refresh cycle, and the next cycle is the retry.

use crate::{ObjectEntry, ObjectPage, StorageClient, StorageError, StorageResult};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Output;
use aws_sdk_s3::Client;
use std::fmt;
use tracing::debug;

/// S3 listing client
///
/// Cheap to clone; the underlying SDK client shares its connection pool.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    endpoint: String,
}

impl S3Client {
    /// Wrap an SDK client. `endpoint` is only used for diagnostics.
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Endpoint this client was configured for (empty for the AWS default)
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for S3Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Client")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl StorageClient for S3Client {
    async fn list_buckets(&self, region_hint: &str) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_buckets();

            if !region_hint.is_empty() {
                request = request.bucket_region(region_hint);
            }

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| {
                StorageError::connection(format!(
                    "ListBuckets on '{}': {}",
                    self.endpoint,
                    DisplayErrorContext(&e)
                ))
            })?;

            names.extend(
                response
                    .buckets()
                    .iter()
                    .filter_map(|b| b.name())
                    .map(str::to_string),
            );

            // Endpoints without bucket pagination never return a token
            match response.continuation_token() {
                Some(token) if !token.is_empty() => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        debug!(count = names.len(), region = region_hint, "Discovered buckets");
        Ok(names)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<&str>,
    ) -> StorageResult<ObjectPage> {
        let mut request = self.client.list_objects_v2().bucket(bucket);

        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(|e| {
            StorageError::request(
                "ListObjectsV2",
                bucket,
                DisplayErrorContext(&e).to_string(),
            )
        })?;

        Ok(page_from_output(&response))
    }
}

/// Map one `ListObjectsV2` response onto an [`ObjectPage`].
///
/// Some endpoints omit `IsTruncated`; a continuation token alone still means
/// more pages follow.
fn page_from_output(response: &ListObjectsV2Output) -> ObjectPage {
    let objects = response
        .contents()
        .iter()
        .map(|obj| ObjectEntry {
            // Negative sizes are not produced by any known endpoint
            size: obj.size().map_or(0, |s| s.max(0) as u64),
            storage_class: obj
                .storage_class()
                .map(|c| c.as_str().to_string())
                .unwrap_or_default(),
        })
        .collect();

    let next_token = response
        .next_continuation_token()
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    ObjectPage {
        is_truncated: response.is_truncated().unwrap_or(next_token.is_some()),
        objects,
        next_token,
    }
}
