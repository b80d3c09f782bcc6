// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! SPP bridge process.
//!
//! Reads method calls from stdin and writes responses to stdout, one JSON
//! object per line. Logs go to stderr.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use spp_bridge::bluetooth::{AdapterGateway, BluezRadio, Radio};
use spp_bridge::bridge::protocol::parse_request;
use spp_bridge::config::Config;
use spp_bridge::BridgeController;

#[derive(Parser, Debug)]
#[command(version, about = "Bluetooth SPP bridge to an embedded device")]
struct Args {
    /// Path to the config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bluetooth adapter to use, e.g. hci0.
    #[arg(long)]
    adapter: Option<String>,

    /// Connect on a fixed RFCOMM channel instead of looking up the SPP service.
    #[arg(long)]
    channel: Option<u8>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match args.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if args.adapter.is_some() {
        config.bluetooth.adapter = args.adapter;
    }
    if args.channel.is_some() {
        config.bluetooth.channel = args.channel;
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting SPP bridge v{}...", env!("CARGO_PKG_VERSION"));

    let radio = BluezRadio::open(config.bluetooth.adapter.as_deref(), config.bluetooth.channel).await;
    let gateway = AdapterGateway::new(radio);
    if !gateway.is_enabled().await {
        warn!("Bluetooth adapter missing or powered off; scans will fail until it is enabled");
    }

    let bridge = BridgeController::new(gateway, config.connection_settings());
    info!("Ready. Waiting for requests on stdin.");

    tokio::select! {
        result = serve(&bridge) => {
            if let Err(e) = result {
                error!("Request loop failed: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    if let Err(e) = bridge.disconnect().await {
        warn!("{}", e);
    }

    info!("SPP bridge stopped");
    Ok(())
}

/// Answer requests until stdin closes.
async fn serve<R: Radio>(bridge: &BridgeController<R>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match parse_request(&line) {
            Ok((id, call)) => bridge.handle(id, call).await,
            Err(response) => response,
        };

        stdout.write_all(response.to_json()?.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!("stdin closed");
    Ok(())
}
