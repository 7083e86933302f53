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

//! Authentication method selection and client construction
//!
//! Supported methods:
//! - `iam`: default AWS credential chain (environment, profile, instance role)
//! - `keys` / `static`: explicit access key and secret key
//! - `role`: assume an IAM role through STS
//! - `webid`: assume a role with a web identity token file (IRSA)
//!
//! When no method is configured it is detected from which settings are
//! present, see [`AuthConfig::detect_method`].

use crate::{tls, S3Client, StorageClient, StorageError, StorageResult};
use async_trait::async_trait;
use aws_config::sts::AssumeRoleProvider;
use aws_config::web_identity_token::{StaticConfiguration, WebIdentityTokenCredentialsProvider};
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use prometheus::{IntCounterVec, Opts, Registry};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

const SESSION_NAME: &str = "s3usage";

/// How credentials are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    /// Default credential chain
    Iam,
    /// Access key and secret key, both required
    Keys,
    /// Assume role via STS
    Role,
    /// Assume role with web identity token
    WebId,
    /// Access key and secret key passed through as given
    Static,
}

impl AuthMethod {
    /// Get string label for Prometheus and logs
    pub fn as_label(&self) -> &'static str {
        match self {
            AuthMethod::Iam => "iam",
            AuthMethod::Keys => "keys",
            AuthMethod::Role => "role",
            AuthMethod::WebId => "webid",
            AuthMethod::Static => "static",
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for AuthMethod {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "iam" => Ok(AuthMethod::Iam),
            "keys" => Ok(AuthMethod::Keys),
            "role" => Ok(AuthMethod::Role),
            "webid" => Ok(AuthMethod::WebId),
            "static" => Ok(AuthMethod::Static),
            other => Err(StorageError::invalid_config(format!(
                "unsupported authentication method: {}",
                other
            ))),
        }
    }
}

/// Settings needed to build a storage client
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Explicit method; detected when `None`
    pub method: Option<AuthMethod>,
    /// Signing region, required
    pub region: String,
    /// Custom endpoint URL; empty for AWS
    pub endpoint: String,
    /// Access key for `keys` / `static`
    pub access_key: String,
    /// Secret key for `keys` / `static`
    pub secret_key: String,
    /// Role ARN for `role` / `webid`
    pub role_arn: String,
    /// Token file for `webid`
    pub web_identity_token_file: String,
    /// Use path-style addressing (required by most self-hosted endpoints)
    pub force_path_style: bool,
    /// Accept any server certificate
    pub skip_tls_verify: bool,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("method", &self.method)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key", &redact(&self.access_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("role_arn", &self.role_arn)
            .field("web_identity_token_file", &self.web_identity_token_file)
            .field("force_path_style", &self.force_path_style)
            .field("skip_tls_verify", &self.skip_tls_verify)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "***"
    }
}

impl AuthConfig {
    /// Determine the method from the populated settings.
    ///
    /// An explicit method always wins. Otherwise: web identity when both a
    /// token file and role ARN are set, role when only the ARN is set, keys
    /// when both keys are set, and the default chain for everything else.
    pub fn detect_method(&self) -> AuthMethod {
        if let Some(method) = self.method {
            return method;
        }

        if !self.web_identity_token_file.is_empty() && !self.role_arn.is_empty() {
            AuthMethod::WebId
        } else if !self.role_arn.is_empty() {
            AuthMethod::Role
        } else if !self.access_key.is_empty() && !self.secret_key.is_empty() {
            AuthMethod::Keys
        } else {
            AuthMethod::Iam
        }
    }

    /// Check the settings required by the detected method
    pub fn validate(&self) -> StorageResult<AuthMethod> {
        if self.region.is_empty() {
            return Err(StorageError::invalid_config("region is required"));
        }

        let method = self.detect_method();
        match method {
            AuthMethod::Keys if self.access_key.is_empty() || self.secret_key.is_empty() => {
                Err(StorageError::invalid_config(
                    "access key and secret key are required for keys authentication",
                ))
            }
            AuthMethod::Role | AuthMethod::WebId if self.role_arn.is_empty() => Err(
                StorageError::invalid_config(format!("role ARN is required for {} authentication", method)),
            ),
            AuthMethod::WebId if self.web_identity_token_file.is_empty() => Err(
                StorageError::invalid_config("web identity token file is required for webid authentication"),
            ),
            _ => Ok(method),
        }
    }

    /// Endpoint URL with a scheme, or `None` for the AWS default endpoint.
    ///
    /// Endpoints are commonly configured as `host:port`; those get `https://`.
    pub fn endpoint_url(&self) -> Option<String> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            None
        } else if endpoint.contains("://") {
            Some(endpoint.to_string())
        } else {
            Some(format!("https://{}", endpoint))
        }
    }
}

/// Supplies a ready-to-use storage client for one refresh cycle.
///
/// Called at the start of every cycle so that rotated credentials are picked
/// up without restarting the exporter.
#[async_trait]
pub trait AuthProvider: Send + Sync + fmt::Debug {
    /// Resolve credentials and build a client
    async fn client(&self) -> StorageResult<Arc<dyn StorageClient>>;
}

/// Counter of authentication attempts by method and outcome
#[derive(Clone)]
pub struct AuthAttempts {
    counter: IntCounterVec,
}

impl AuthAttempts {
    /// Create the counter and register it with `registry`
    pub fn register(registry: &Registry) -> prometheus::Result<Self> {
        let counter = IntCounterVec::new(
            Opts::new(
                "s3_auth_attempts_total",
                "Total number of authentication attempts by method and status",
            ),
            &["method", "status", "s3Endpoint"],
        )?;
        registry.register(Box::new(counter.clone()))?;
        Ok(Self { counter })
    }

    fn record(&self, method: AuthMethod, success: bool, endpoint: &str) {
        let status = if success { "success" } else { "error" };
        self.counter
            .with_label_values(&[method.as_label(), status, endpoint])
            .inc();
    }

    /// Current count for the given labels
    pub fn get(&self, method: AuthMethod, status: &str, endpoint: &str) -> u64 {
        self.counter
            .with_label_values(&[method.as_label(), status, endpoint])
            .get()
    }
}

/// [`AuthProvider`] backed by `aws-config`
pub struct AwsAuthProvider {
    config: AuthConfig,
    attempts: Option<AuthAttempts>,
}

impl AwsAuthProvider {
    /// Create a provider for the given settings
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            attempts: None,
        }
    }

    /// Count attempts in `attempts`
    pub fn with_attempts(mut self, attempts: AuthAttempts) -> Self {
        self.attempts = Some(attempts);
        self
    }

    /// Settings this provider was built with
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    async fn build_client(&self, method: AuthMethod) -> StorageResult<S3Client> {
        let cfg = &self.config;
        let region = Region::new(cfg.region.clone());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region.clone());

        match method {
            AuthMethod::Keys | AuthMethod::Static => {
                let credentials = Credentials::new(
                    cfg.access_key.clone(),
                    cfg.secret_key.clone(),
                    None,
                    None,
                    "s3usage-static",
                );
                loader = loader.credentials_provider(credentials);
            }
            AuthMethod::Role => {
                let provider = AssumeRoleProvider::builder(cfg.role_arn.clone())
                    .session_name(SESSION_NAME)
                    .region(region)
                    .build()
                    .await;
                loader = loader.credentials_provider(provider);
            }
            AuthMethod::WebId => {
                let provider = WebIdentityTokenCredentialsProvider::builder()
                    .static_configuration(StaticConfiguration {
                        web_identity_token_file: PathBuf::from(&cfg.web_identity_token_file),
                        role_arn: cfg.role_arn.clone(),
                        session_name: SESSION_NAME.to_string(),
                    })
                    .build();
                loader = loader.credentials_provider(provider);
            }
            AuthMethod::Iam => {}
        }

        if cfg.skip_tls_verify {
            warn!("TLS certificate verification is disabled for {}", cfg.endpoint);
            loader = loader.http_client(tls::insecure_http_client());
        }

        let sdk_config = loader.load().await;
        if sdk_config.credentials_provider().is_none() {
            return Err(StorageError::auth(format!(
                "no credentials provider available for {} authentication",
                method
            )));
        }

        let mut builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(cfg.force_path_style);

        if let Some(url) = cfg.endpoint_url() {
            debug!("Using custom S3 endpoint: {}", url);
            builder = builder.endpoint_url(url);
        }

        Ok(S3Client::new(
            aws_sdk_s3::Client::from_conf(builder.build()),
            cfg.endpoint.clone(),
        ))
    }
}

impl fmt::Debug for AwsAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsAuthProvider")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl AuthProvider for AwsAuthProvider {
    async fn client(&self) -> StorageResult<Arc<dyn StorageClient>> {
        let method = self.config.detect_method();
        debug!(method = %method, "Starting authentication");

        let result = match self.config.validate() {
            Ok(method) => self.build_client(method).await,
            Err(e) => Err(e),
        };

        if let Some(attempts) = &self.attempts {
            attempts.record(method, result.is_ok(), &self.config.endpoint);
        }

        match result {
            Ok(client) => Ok(Arc::new(client)),
            Err(e) => {
                warn!(method = %method, error = %e, "Authentication failed");
                Err(e)
            }
        }
    }
}
