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

//! Cancellation and timeout for storage calls

use s3usage_storage::{StorageError, StorageResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Limits applied to every storage request of a cycle
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Per-request deadline; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Aborts outstanding requests on shutdown
    pub cancel: CancellationToken,
}

impl RequestOptions {
    /// Options with the given timeout and cancellation token
    pub fn new(timeout: Option<Duration>, cancel: CancellationToken) -> Self {
        Self { timeout, cancel }
    }

    /// Drive `request` to completion unless it times out or is cancelled.
    ///
    /// `operation` names the call in the timeout error.
    pub async fn run<T, F>(&self, operation: &str, request: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, request)
                    .await
                    .map_err(|_| StorageError::timeout(format!("{} after {:?}", operation, limit)))?,
                None => request.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StorageError::Cancelled),
            result = bounded => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test(start_paused = true)]
    async fn test_timeout_elapses() {
        let options = RequestOptions::new(Some(Duration::from_secs(1)), CancellationToken::new());
        let result: StorageResult<()> = options
            .run("ListObjectsV2 slow", async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        let err = result.unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("ListObjectsV2 slow"));
    }

    #[tokio::test]
    async fn test_no_timeout_passes_through() {
        let options = RequestOptions::default();
        let result = options.run("ListBuckets", async { Ok(7) }).await;
        assert_eq!(assert_ok!(result), 7);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let options = RequestOptions::new(None, cancel);

        let result: StorageResult<()> = options.run("ListBuckets", std::future::pending()).await;
        assert!(assert_err!(result).is_cancelled());
    }

    #[tokio::test]
    async fn test_request_errors_are_returned_unchanged() {
        let options = RequestOptions::new(Some(Duration::from_secs(5)), CancellationToken::new());
        let result: StorageResult<()> = options
            .run("ListObjectsV2", async {
                Err(StorageError::request("ListObjectsV2", "b", "AccessDenied"))
            })
            .await;
        assert!(matches!(result, Err(StorageError::Request { .. })));
    }
}
