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

//! In-memory storage client and auth provider for testing
//!
//! [`MockStorageClient`] serves bucket listings from memory, splitting them
//! into pages of a configurable size, and can be told to fail discovery or
//! individual buckets. [`MockAuthProvider`] hands out a fixed client or a
//! fixed error.
//!
//! # Examples
//!
//! ```rust,no_run
//! use s3usage_storage::{mock::MockStorageClient, ObjectEntry, StorageClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = MockStorageClient::new()
//!         .with_page_size(1)
//!         .with_bucket("a", vec![ObjectEntry::new(1, ""), ObjectEntry::new(2, "")]);
//!
//!     let first = client.list_objects("a", None).await?;
//!     assert!(first.is_truncated);
//!     let second = client.list_objects("a", first.next_token.as_deref()).await?;
//!     assert!(!second.is_truncated);
//!     Ok(())
//! }
//! ```

use crate::{AuthProvider, ObjectEntry, ObjectPage, StorageClient, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory [`StorageClient`]
///
/// Buckets are listed in insertion order. Cloning shares the call counters.
#[derive(Clone)]
pub struct MockStorageClient {
    buckets: Vec<(String, Vec<ObjectEntry>)>,
    page_size: usize,
    failing_buckets: HashSet<String>,
    fail_discovery: bool,
    latency: Option<Duration>,
    bucket_latency: HashMap<String, Duration>,
    calls: Arc<MockCalls>,
}

#[derive(Default)]
struct MockCalls {
    list_buckets: AtomicUsize,
    list_objects: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    tokens_seen: Mutex<Vec<(String, Option<String>)>>,
}

impl MockStorageClient {
    /// Create an empty client with a page size of 1000 (the S3 default)
    pub fn new() -> Self {
        Self {
            buckets: Vec::new(),
            page_size: 1000,
            failing_buckets: HashSet::new(),
            fail_discovery: false,
            latency: None,
            bucket_latency: HashMap::new(),
            calls: Arc::new(MockCalls::default()),
        }
    }

    /// Add a bucket with the given objects
    pub fn with_bucket(mut self, name: impl Into<String>, objects: Vec<ObjectEntry>) -> Self {
        self.buckets.push((name.into(), objects));
        self
    }

    /// Objects per listing page; values below one are treated as one
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make every listing request for `bucket` fail
    pub fn with_failing_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.failing_buckets.insert(bucket.into());
        self
    }

    /// Make `list_buckets` fail
    pub fn with_failing_discovery(mut self) -> Self {
        self.fail_discovery = true;
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Delay listing calls for one bucket by `latency`
    pub fn with_bucket_latency(mut self, bucket: impl Into<String>, latency: Duration) -> Self {
        self.bucket_latency.insert(bucket.into(), latency);
        self
    }

    /// Number of `list_buckets` calls served so far
    pub fn list_buckets_calls(&self) -> usize {
        self.calls.list_buckets.load(Ordering::SeqCst)
    }

    /// Number of `list_objects` calls served so far
    pub fn list_objects_calls(&self) -> usize {
        self.calls.list_objects.load(Ordering::SeqCst)
    }

    /// Highest number of `list_objects` calls observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.calls.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Every `(bucket, continuation_token)` pair requested, in call order
    pub fn tokens_seen(&self) -> Vec<(String, Option<String>)> {
        self.calls
            .tokens_seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    fn objects(&self, bucket: &str) -> Option<&Vec<ObjectEntry>> {
        self.buckets
            .iter()
            .find(|(name, _)| name == bucket)
            .map(|(_, objects)| objects)
    }
}

impl Default for MockStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockStorageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockStorageClient")
            .field("buckets", &self.buckets.len())
            .field("page_size", &self.page_size)
            .finish()
    }
}

struct InFlight<'a>(&'a MockCalls);

impl<'a> InFlight<'a> {
    fn enter(calls: &'a MockCalls) -> Self {
        let now = calls.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        calls.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(calls)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageClient for MockStorageClient {
    async fn list_buckets(&self, _region_hint: &str) -> StorageResult<Vec<String>> {
        self.calls.list_buckets.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.fail_discovery {
            return Err(StorageError::connection("mock endpoint refused ListBuckets"));
        }

        Ok(self.buckets.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<&str>,
    ) -> StorageResult<ObjectPage> {
        self.calls.list_objects.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.calls.tokens_seen.lock() {
            seen.push((bucket.to_string(), continuation_token.map(str::to_string)));
        }
        let _in_flight = InFlight::enter(&self.calls);

        let delay = self.bucket_latency.get(bucket).copied().or(self.latency);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_buckets.contains(bucket) {
            return Err(StorageError::request("ListObjectsV2", bucket, "AccessDenied"));
        }

        let objects = self
            .objects(bucket)
            .ok_or_else(|| StorageError::request("ListObjectsV2", bucket, "NoSuchBucket"))?;

        let start = match continuation_token {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                StorageError::request("ListObjectsV2", bucket, "InvalidArgument: continuation token")
            })?,
        };

        let end = (start + self.page_size).min(objects.len());
        let is_truncated = end < objects.len();

        Ok(ObjectPage {
            objects: objects.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
            next_token: is_truncated.then(|| end.to_string()),
            is_truncated,
        })
    }
}

/// [`AuthProvider`] returning a fixed client or a fixed error message
#[derive(Clone)]
pub struct MockAuthProvider {
    client: Option<Arc<dyn StorageClient>>,
    error: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl MockAuthProvider {
    /// Always hand out `client`
    pub fn new(client: Arc<dyn StorageClient>) -> Self {
        Self {
            client: Some(client),
            error: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always fail with an auth error carrying `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            client: None,
            error: Some(message.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail with an auth error carrying `message` while still holding the
    /// client, so callers can check the client was never handed out
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    /// Number of times a client was requested
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for MockAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockAuthProvider")
            .field("error", &self.error)
            .finish()
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn client(&self) -> StorageResult<Arc<dyn StorageClient>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (&self.client, &self.error) {
            (Some(client), None) => Ok(Arc::clone(client)),
            (_, Some(message)) => Err(StorageError::auth(message.clone())),
            (None, None) => Err(StorageError::auth("no client configured")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objects(sizes: &[u64]) -> Vec<ObjectEntry> {
        sizes.iter().map(|&s| ObjectEntry::new(s, "")).collect()
    }

    #[tokio::test]
    async fn test_list_buckets_in_insertion_order() {
        let client = MockStorageClient::new()
            .with_bucket("zeta", vec![])
            .with_bucket("alpha", vec![]);

        let names = client.list_buckets("").await.unwrap();
        assert_eq!(names, vec!["zeta".to_string(), "alpha".to_string()]);
        assert_eq!(client.list_buckets_calls(), 1);
    }

    #[tokio::test]
    async fn test_pagination_walks_all_objects() {
        let client = MockStorageClient::new()
            .with_page_size(2)
            .with_bucket("b", objects(&[1, 2, 3, 4, 5]));

        let mut token: Option<String> = None;
        let mut sizes = Vec::new();
        loop {
            let page = client.list_objects("b", token.as_deref()).await.unwrap();
            sizes.extend(page.objects.iter().map(|o| o.size));
            if !page.is_truncated {
                assert!(page.next_token.is_none());
                break;
            }
            token = page.next_token;
        }

        assert_eq!(sizes, vec![1, 2, 3, 4, 5]);
        assert_eq!(client.list_objects_calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_bucket_single_page() {
        let client = MockStorageClient::new().with_bucket("empty", vec![]);
        let page = client.list_objects("empty", None).await.unwrap();
        assert!(page.objects.is_empty());
        assert!(!page.is_truncated);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let client = MockStorageClient::new()
            .with_bucket("ok", objects(&[1]))
            .with_failing_bucket("ok")
            .with_failing_discovery();

        assert!(client.list_buckets("").await.is_err());
        assert!(client.list_objects("ok", None).await.is_err());
        assert!(client.list_objects("missing", None).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_auth_provider() {
        let client: Arc<dyn StorageClient> = Arc::new(MockStorageClient::new());
        let ok = MockAuthProvider::new(client);
        assert!(ok.client().await.is_ok());

        let failing = MockAuthProvider::failing("expired token");
        let err = failing.client().await.unwrap_err();
        assert_eq!(err.to_string(), "authentication failed: expired token");
        assert_eq!(failing.calls(), 1);
    }
}
