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

//! Common types for metrics exposition

/// Default port, matching the exporter's registered Prometheus port
pub const DEFAULT_PORT: u16 = 9655;

/// Configuration for the metrics server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Port for the metrics HTTP server
    pub port: u16,

    /// Bind address (default: all interfaces)
    pub bind_address: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

impl MetricsConfig {
    /// Config listening on `port` on all interfaces
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get bind address with port
    pub fn socket_addr(&self) -> String {
        if self.bind_address.contains(':') && !self.bind_address.starts_with('[') {
            format!("[{}]:{}", self.bind_address, self.port)
        } else {
            format!("{}:{}", self.bind_address, self.port)
        }
    }
}

/// Constant labels attached to every usage gauge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointLabels {
    /// Endpoint as configured; empty for the AWS default
    pub endpoint: String,
    /// Region as configured
    pub region: String,
}

impl EndpointLabels {
    /// Labels for `endpoint` in `region`
    pub fn new(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
        }
    }
}
