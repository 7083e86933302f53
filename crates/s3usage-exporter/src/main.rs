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

//! `s3usage-exporter` binary

use anyhow::{Context, Result};
use clap::Parser;
use s3usage_exporter::{Args, Exporter};
use s3usage_observability::{init_tracing_with_config, LogConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config().context("Invalid configuration")?;

    init_tracing_with_config(
        LogConfig::new()
            .with_format(config.log_format)
            .with_level(config.log_level.clone()),
    )
    .context("Failed to initialize logging")?;

    info!("Exporter configuration: {:?}", config);
    if config.refresh.bucket_names.is_empty() {
        info!("Monitoring all buckets in {} region", config.refresh.region);
    } else {
        info!(
            "Monitoring buckets: {} in {} region",
            config.refresh.bucket_names, config.refresh.region
        );
    }

    let exporter = Exporter::new(config)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                on_signal.cancel();
            }
            Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
        }
    });

    info!("Press Ctrl+C to stop");
    exporter.run(cancel).await
}
