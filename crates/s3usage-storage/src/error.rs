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

//! Storage error types and utilities

use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while talking to the storage endpoint
#[derive(Error, Debug)]
pub enum StorageError {
    /// Endpoint unreachable or refused the connection
    #[error("connection error: {0}")]
    Connection(String),

    /// A listing request was rejected or failed in transit
    #[error("{operation} failed for bucket '{bucket}': {message}")]
    Request {
        /// API operation name, e.g. `ListObjectsV2`
        operation: &'static str,
        /// Bucket the request targeted (empty for endpoint-wide calls)
        bucket: String,
        /// Rendered SDK error
        message: String,
    },

    /// Operation did not complete within the configured request timeout
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Operation was abandoned because shutdown was requested
    #[error("operation cancelled")]
    Cancelled,

    /// Credential resolution failed
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Client configuration is incomplete or contradictory
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Transparent error delegation for wrapped error types
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    /// Create a Request error for the given operation and bucket
    pub fn request<S: Into<String>, M: Into<String>>(
        operation: &'static str,
        bucket: S,
        message: M,
    ) -> Self {
        StorageError::Request {
            operation,
            bucket: bucket.into(),
            message: message.into(),
        }
    }

    /// Create a Connection error with context
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        StorageError::Connection(msg.into())
    }

    /// Create a Timeout error with context
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        StorageError::Timeout(msg.into())
    }

    /// Create an Auth error with context
    pub fn auth<S: Into<String>>(msg: S) -> Self {
        StorageError::Auth(msg.into())
    }

    /// Create an InvalidConfig error with context
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        StorageError::InvalidConfig(msg.into())
    }

    /// Check if this is a Timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, StorageError::Timeout(_))
    }

    /// Check if this is a Cancelled error
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display() {
        let err = StorageError::request("ListObjectsV2", "photos", "AccessDenied");
        assert_eq!(
            err.to_string(),
            "ListObjectsV2 failed for bucket 'photos': AccessDenied"
        );
    }

    #[test]
    fn test_timeout_error() {
        let err = StorageError::timeout("ListBuckets after 5s");
        assert!(err.is_timeout());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_invalid_config_error() {
        let err = StorageError::invalid_config("region is required");
        assert_eq!(err.to_string(), "invalid configuration: region is required");
    }

    #[test]
    fn test_anyhow_conversion() {
        let err = StorageError::from(anyhow::anyhow!("boom"));
        assert!(matches!(err, StorageError::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }
}
