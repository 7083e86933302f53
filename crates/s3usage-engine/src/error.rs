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

//! Cycle-level errors
//!
//! These are the only failures that abort a refresh cycle. Per-bucket scan
//! failures are reported as [`BucketFailure`] values instead.

use s3usage_storage::StorageError;
use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a whole refresh cycle
///
/// Stored in the snapshot cache and copied out to readers, so it carries
/// rendered messages rather than source errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The storage client could not be configured or authenticated
    #[error("failed to configure authentication: {0}")]
    Auth(String),

    /// Bucket discovery failed; the detail is kept for logs
    #[error("unable to connect to S3 endpoint")]
    Discovery(String),

    /// Shutdown was requested while the cycle was running
    #[error("refresh cycle cancelled")]
    Cancelled,
}

impl EngineError {
    /// Underlying cause, when one was captured
    pub fn detail(&self) -> Option<&str> {
        match self {
            EngineError::Auth(detail) | EngineError::Discovery(detail) => Some(detail),
            EngineError::Cancelled => None,
        }
    }

    /// Map an auth provider failure
    pub fn auth(err: &StorageError) -> Self {
        match err {
            StorageError::Cancelled => EngineError::Cancelled,
            other => EngineError::Auth(other.to_string()),
        }
    }

    /// Map a discovery failure
    pub fn discovery(err: &StorageError) -> Self {
        match err {
            StorageError::Cancelled => EngineError::Cancelled,
            other => EngineError::Discovery(other.to_string()),
        }
    }
}

/// A bucket whose scan failed during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketFailure {
    /// Bucket name
    pub bucket: String,
    /// Rendered error
    pub error: String,
}

impl BucketFailure {
    /// Record a failed scan of `bucket`
    pub fn new(bucket: impl Into<String>, error: &StorageError) -> Self {
        Self {
            bucket: bucket.into(),
            error: error.to_string(),
        }
    }
}

impl std::fmt::Display for BucketFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.bucket, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_display_hides_detail() {
        let err = EngineError::discovery(&StorageError::connection("dns failure"));
        assert_eq!(err.to_string(), "unable to connect to S3 endpoint");
        assert_eq!(err.detail(), Some("connection error: dns failure"));
    }

    #[test]
    fn test_cancelled_storage_errors_map_to_cancelled() {
        assert_eq!(EngineError::auth(&StorageError::Cancelled), EngineError::Cancelled);
        assert_eq!(EngineError::discovery(&StorageError::Cancelled), EngineError::Cancelled);
    }

    #[test]
    fn test_bucket_failure_display() {
        let failure = BucketFailure::new(
            "logs",
            &StorageError::request("ListObjectsV2", "logs", "AccessDenied"),
        );
        assert_eq!(
            failure.to_string(),
            "logs: ListObjectsV2 failed for bucket 'logs': AccessDenied"
        );
    }
}
