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

//! Storage access layer for s3usage
//!
//! This crate provides the narrow, read-only view of an S3-compatible endpoint
//! that usage scanning needs:
//! - bucket discovery (`ListBuckets`)
//! - paginated object listing (`ListObjectsV2`)
//!
//! plus the [`AuthProvider`] collaborator that turns exporter settings into a
//! ready-to-use client.
//!
//! # Architecture
//!
//! The [`StorageClient`] trait is the seam between the usage engine and the
//! network. [`s3::S3Client`] implements it on top of the AWS SDK;
//! [`mock::MockStorageClient`] implements it in memory for tests.
//!
//! # Examples
//!
//! ```rust,no_run
//! use s3usage_storage::{mock::MockStorageClient, ObjectEntry, StorageClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = MockStorageClient::new()
//!         .with_bucket("logs", vec![ObjectEntry::new(1024, ""), ObjectEntry::new(2048, "GLACIER")]);
//!
//!     let buckets = client.list_buckets("us-east-1").await?;
//!     assert_eq!(buckets, vec!["logs".to_string()]);
//!
//!     let page = client.list_objects("logs", None).await?;
//!     assert_eq!(page.objects.len(), 2);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
pub mod mock;
pub mod s3;
mod tls;

use async_trait::async_trait;
use std::fmt::Debug;

pub use auth::{AuthAttempts, AuthConfig, AuthMethod, AuthProvider, AwsAuthProvider};
pub use error::{StorageError, StorageResult};
pub use s3::S3Client;

/// One object as reported by a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Object size in bytes
    pub size: u64,

    /// Storage class as reported by the endpoint; may be empty
    pub storage_class: String,
}

impl ObjectEntry {
    /// Create an object entry
    pub fn new(size: u64, storage_class: impl Into<String>) -> Self {
        Self {
            size,
            storage_class: storage_class.into(),
        }
    }
}

/// One page of a `ListObjectsV2` listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    /// Objects on this page
    pub objects: Vec<ObjectEntry>,

    /// Token to pass to the next request when `is_truncated` is set
    pub next_token: Option<String>,

    /// Whether more pages follow
    pub is_truncated: bool,
}

/// Read-only listing operations against an S3-compatible endpoint.
///
/// Implementations must be `Send + Sync` since one client is shared by every
/// bucket scan of a refresh cycle.
#[async_trait]
pub trait StorageClient: Send + Sync + Debug {
    /// List the names of all buckets visible to the credentials.
    ///
    /// `region_hint` restricts the listing to buckets of that region where the
    /// endpoint supports it.
    async fn list_buckets(&self, region_hint: &str) -> StorageResult<Vec<String>>;

    /// Fetch one page of the object listing of `bucket`.
    ///
    /// Pass `None` for the first page, then the previous page's `next_token`.
    async fn list_objects(
        &self,
        bucket: &str,
        continuation_token: Option<&str>,
    ) -> StorageResult<ObjectPage>;
}
