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

//! Bucket set resolution
//!
//! An explicit bucket list is used as given (after cleanup) without asking
//! the endpoint. An empty list means "all buckets" and requires a
//! `ListBuckets` call, whose failure aborts the cycle.

use crate::error::{EngineError, EngineResult};
use crate::request::RequestOptions;
use s3usage_storage::StorageClient;
use std::collections::HashSet;
use tracing::{debug, error};

/// Split a comma-separated list into distinct, trimmed, non-empty names.
///
/// First occurrence wins; case is preserved.
pub fn distinct(bucket_names: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    bucket_names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Determine which buckets this cycle scans.
///
/// A non-empty `bucket_names` is split with [`distinct`]; otherwise every
/// bucket visible in `region` is discovered.
pub async fn resolve_buckets(
    bucket_names: &str,
    client: &dyn StorageClient,
    region: &str,
    options: &RequestOptions,
) -> EngineResult<Vec<String>> {
    if !bucket_names.is_empty() {
        return Ok(distinct(bucket_names));
    }

    let discovered = options
        .run("ListBuckets", client.list_buckets(region))
        .await
        .map_err(|e| {
            error!(region, error = %e, "Failed to list buckets");
            EngineError::discovery(&e)
        })?;

    let mut seen = HashSet::new();
    let buckets: Vec<String> = discovered
        .into_iter()
        .filter(|name| !name.is_empty() && seen.insert(name.clone()))
        .collect();

    debug!(region, ?buckets, "List of buckets");
    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use s3usage_storage::mock::MockStorageClient;

    #[test]
    fn test_distinct_trims_and_dedups() {
        assert_eq!(
            distinct(" logs, media ,logs,,  , Media"),
            vec!["logs", "media", "Media"]
        );
    }

    #[test]
    fn test_distinct_empty_tokens_only() {
        assert!(distinct(" , ,").is_empty());
    }

    #[tokio::test]
    async fn test_explicit_list_skips_discovery() {
        let client = MockStorageClient::new().with_failing_discovery();
        let buckets = resolve_buckets("b1,b2", &client, "us-east-1", &RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(buckets, vec!["b1", "b2"]);
        assert_eq!(client.list_buckets_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_list_discovers() {
        let client = MockStorageClient::new()
            .with_bucket("one", vec![])
            .with_bucket("two", vec![])
            .with_bucket("three", vec![]);

        let buckets = resolve_buckets("", &client, "us-east-1", &RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(buckets, vec!["one", "two", "three"]);
        assert_eq!(client.list_buckets_calls(), 1);
    }

    #[tokio::test]
    async fn test_discovery_failure_is_fatal() {
        let client = MockStorageClient::new()
            .with_bucket("one", vec![])
            .with_failing_discovery();

        let err = resolve_buckets("", &client, "us-east-1", &RequestOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Discovery(_)));
        assert_eq!(err.to_string(), "unable to connect to S3 endpoint");
    }

    proptest! {
        #[test]
        fn prop_distinct_is_idempotent(input in "[a-c ,]{0,24}") {
            let once = distinct(&input);
            let twice = distinct(&once.join(","));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_distinct_keeps_first_occurrence_order(
            tokens in prop::collection::vec("[a-d]{0,2}", 0..12),
        ) {
            let input = tokens.join(",");
            let result = distinct(&input);

            let mut expected: Vec<String> = Vec::new();
            for token in &tokens {
                if !token.is_empty() && !expected.contains(token) {
                    expected.push(token.clone());
                }
            }
            prop_assert_eq!(result, expected);
        }

        #[test]
        fn prop_distinct_has_no_blank_tokens(input in "[a-z ,\t]{0,32}") {
            for name in distinct(&input) {
                prop_assert!(!name.trim().is_empty());
                prop_assert_eq!(name.trim(), name.as_str());
            }
        }
    }
}
