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

//! s3usage Observability Module
//!
//! Structured logging for the exporter and its libraries.
//!
//! # Features
//!
//! - **Multiple Output Formats**: text, compact and JSON
//! - **Environment-based Filtering**: falls back to `RUST_LOG` when no level is given
//! - **Compatible level names**: accepts `warning`, `fatal` and `panic` aliases
//!
//! # Example
//!
//! ```ignore
//! use s3usage_observability::{init_tracing, LogFormat};
//!
//! fn main() {
//!     init_tracing(LogFormat::Text, None).unwrap();
//!     tracing::info!("Application started");
//! }
//! ```

pub mod config;
pub mod initialization;

pub use config::{normalize_level, LogConfig, LogError, LogFormat, LogOutput};
pub use initialization::{init_tracing, init_tracing_with_config};
