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

//! Exporter configuration
//!
//! Every flag can also be set through the environment variable named in its
//! help text. The underscore spellings (`--s3_endpoint`) are accepted as
//! aliases for existing deployments.

use clap::Parser;
use s3usage_engine::{CachePolicy, RefreshSettings};
use s3usage_metrics::{EndpointLabels, MetricsConfig};
use s3usage_observability::{normalize_level, LogFormat};
use s3usage_storage::{AuthConfig, AuthMethod};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors detected before anything starts
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Duration string could not be parsed
    #[error("invalid duration '{value}' for {field}: {reason}")]
    InvalidDuration {
        /// Flag the value came from
        field: &'static str,
        /// Rejected input
        value: String,
        /// What was wrong with it
        reason: String,
    },

    /// Scrape interval must be positive
    #[error("scrape interval must be greater than zero")]
    ZeroInterval,

    /// Listen address is neither `:port`, `host:port` nor `port`
    #[error("invalid listen address '{0}'")]
    InvalidListenAddress(String),

    /// Log level or format was rejected
    #[error("invalid logging configuration: {0}")]
    Logging(String),

    /// Auth method name is unknown
    #[error("invalid auth method: {0}")]
    AuthMethod(String),
}

/// Command-line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "s3usage-exporter")]
#[command(version, about = "Prometheus exporter for S3 bucket usage")]
#[command(
    long_about = "Periodically lists every object of the selected S3 buckets and exposes \
size and object counts per bucket and storage class on a Prometheus endpoint."
)]
pub struct Args {
    /// S3 endpoint, e.g. myceph.com:7480; empty for AWS
    #[arg(long, alias = "s3_endpoint", env = "S3_ENDPOINT", default_value = "")]
    pub s3_endpoint: String,

    /// Comma-separated bucket names; empty monitors every bucket
    #[arg(long, alias = "s3_bucket_names", env = "S3_BUCKET_NAMES", default_value = "")]
    pub s3_bucket_names: String,

    /// Access key
    #[arg(long, alias = "s3_access_key", env = "S3_ACCESS_KEY", default_value = "")]
    pub s3_access_key: String,

    /// Secret key
    #[arg(
        long,
        alias = "s3_secret_key",
        env = "S3_SECRET_KEY",
        default_value = "",
        hide_env_values = true
    )]
    pub s3_secret_key: String,

    /// Role to assume
    #[arg(long, alias = "s3_role_arn", env = "S3_ROLE_ARN", default_value = "")]
    pub s3_role_arn: String,

    /// Web identity token file, used together with the role ARN
    #[arg(
        long,
        alias = "s3_web_identity_token_file",
        env = "S3_WEB_IDENTITY_TOKEN_FILE",
        default_value = ""
    )]
    pub s3_web_identity_token_file: String,

    /// Force an auth method (iam, keys, role, webid, static) instead of detecting one
    #[arg(long, alias = "s3_auth_method", env = "S3_AUTH_METHOD")]
    pub s3_auth_method: Option<String>,

    /// Region
    #[arg(long, alias = "s3_region", env = "S3_REGION", default_value = "us-east-1")]
    pub s3_region: String,

    /// Use path-style bucket addressing
    #[arg(long, alias = "s3_force_path_style", env = "S3_FORCE_PATH_STYLE")]
    pub s3_force_path_style: bool,

    /// Skip TLS certificate verification for the S3 endpoint
    #[arg(long, alias = "s3_skip_tls_verify", env = "S3_SKIP_TLS_VERIFY")]
    pub s3_skip_tls_verify: bool,

    /// Listen address: ':9655', 'host:9655' or '9655'
    #[arg(long, alias = "listen_port", env = "LISTEN_PORT", default_value = ":9655")]
    pub listen_port: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, alias = "log_level", env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log format (text, compact, json)
    #[arg(long, alias = "log_format", env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Pause between refresh cycles, e.g. 30s, 5m, 1h
    #[arg(long, alias = "scrape_interval", env = "SCRAPE_INTERVAL", default_value = "5m")]
    pub scrape_interval: String,

    /// Per-request timeout for S3 calls; 0s disables it
    #[arg(long, env = "S3_REQUEST_TIMEOUT", default_value = "0s")]
    pub request_timeout: String,

    /// Maximum buckets scanned at once; 0 is unbounded
    #[arg(long, env = "S3_MAX_CONCURRENT_BUCKETS", default_value_t = 0)]
    pub max_concurrent_buckets: usize,

    /// Keep the last good usage data when a cycle fails
    #[arg(long, env = "KEEP_STALE_ON_ERROR")]
    pub keep_stale_on_error: bool,
}

/// Validated configuration for every component
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Storage authentication
    pub auth: AuthConfig,
    /// Refresh cycle settings
    pub refresh: RefreshSettings,
    /// HTTP listener
    pub metrics: MetricsConfig,
    /// Constant gauge labels
    pub labels: EndpointLabels,
    /// Failed-cycle policy
    pub cache_policy: CachePolicy,
    /// Normalized tracing filter
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Args {
    /// Validate arguments into an [`ExporterConfig`]
    pub fn into_config(self) -> Result<ExporterConfig, ConfigError> {
        let interval = parse_duration("scrape interval", &self.scrape_interval)?;
        if interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        let request_timeout = parse_duration("request timeout", &self.request_timeout)?;
        let (bind_address, port) = parse_listen_address(&self.listen_port)?;

        let log_level =
            normalize_level(&self.log_level).map_err(|e| ConfigError::Logging(e.to_string()))?;
        let log_format: LogFormat = self
            .log_format
            .parse()
            .map_err(|e: s3usage_observability::LogError| ConfigError::Logging(e.to_string()))?;

        let method = self
            .s3_auth_method
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .map(|m| m.parse::<AuthMethod>().map_err(|_| ConfigError::AuthMethod(m.to_string())))
            .transpose()?;

        let auth = AuthConfig {
            method,
            region: self.s3_region.clone(),
            endpoint: self.s3_endpoint.clone(),
            access_key: self.s3_access_key,
            secret_key: self.s3_secret_key,
            role_arn: self.s3_role_arn,
            web_identity_token_file: self.s3_web_identity_token_file,
            force_path_style: self.s3_force_path_style,
            skip_tls_verify: self.s3_skip_tls_verify,
        };

        let refresh = RefreshSettings {
            interval,
            bucket_names: self.s3_bucket_names,
            region: self.s3_region.clone(),
            request_timeout: (!request_timeout.is_zero()).then_some(request_timeout),
            max_concurrency: (self.max_concurrent_buckets > 0).then_some(self.max_concurrent_buckets),
        };

        let cache_policy = if self.keep_stale_on_error {
            CachePolicy::KeepStaleOnError
        } else {
            CachePolicy::ResetOnError
        };

        Ok(ExporterConfig {
            auth,
            refresh,
            metrics: MetricsConfig {
                port,
                bind_address,
            },
            labels: EndpointLabels::new(self.s3_endpoint, self.s3_region),
            cache_policy,
            log_level,
            log_format,
        })
    }
}

/// Parse a duration such as `500ms`, `30s`, `5m` or `1h30m`.
///
/// Units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`; fractions are
/// allowed (`1.5h`). A bare `0` is accepted. Negative values are rejected.
pub fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let input = value.trim();
    if input.is_empty() {
        return Err(invalid("empty duration"));
    }
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.starts_with('-') {
        return Err(invalid("negative durations are not allowed"));
    }

    let mut rest = input.strip_prefix('+').unwrap_or(input);
    let mut total_nanos: f64 = 0.0;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid("expected a number"));
        }
        let number: f64 = rest[..number_len]
            .parse()
            .map_err(|_| invalid("malformed number"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };
        rest = &rest[unit_len..];

        total_nanos += number * nanos_per_unit;
    }

    if !total_nanos.is_finite() || total_nanos > u64::MAX as f64 {
        return Err(invalid("duration out of range"));
    }
    Ok(Duration::from_nanos(total_nanos.round() as u64))
}

/// Split a listen address into bind host and port.
///
/// `:9655` and `9655` bind every interface.
pub fn parse_listen_address(value: &str) -> Result<(String, u16), ConfigError> {
    let invalid = || ConfigError::InvalidListenAddress(value.to_string());
    let trimmed = value.trim();

    let (host, port) = match trimmed.rsplit_once(':') {
        Some((host, port)) => match host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            Some(inner) => (inner, port),
            // IPv6 hosts must be bracketed
            None if host.contains([':', '[', ']']) => return Err(invalid()),
            None => (host, port),
        },
        None => ("", trimmed),
    };

    let port: u16 = port.parse().map_err(|_| invalid())?;
    let host = if host.is_empty() { "0.0.0.0" } else { host };

    Ok((host.to_string(), port))
}
