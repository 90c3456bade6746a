// src/bin/jawsense_hub.rs
//! JawSense data hub: receives heart rate pushed by the wearable, polls the
//! EMG sheet, and serves the fused 10 Hz stream over HTTP.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::time::sleep;

use jawsense::source::{MemoryConnector, MemorySheet, SheetsConnector};
use jawsense::{server, Hub, HubConfig};

#[derive(Parser, Debug)]
#[command(name = "jawsense_hub", about = "Heart-rate + EMG fusion hub")]
struct Args {
    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    /// Spreadsheet the EMG device writes to
    #[arg(long)]
    spreadsheet_id: Option<String>,

    /// Credentials file for the Sheets API
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// Combined stream rate in Hz
    #[arg(long)]
    stream_hz: Option<u32>,

    /// Feed EMG from a synthetic in-memory sheet instead of Google Sheets
    #[arg(long)]
    demo: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(HubConfig, bool)> {
        let mut config = match &self.config {
            Some(path) => HubConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => HubConfig::default(),
        };
        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(id) = self.spreadsheet_id {
            config.spreadsheet_id = id;
        }
        if let Some(path) = self.credentials {
            config.credentials_path = path;
        }
        if let Some(hz) = self.stream_hz {
            config.stream_hz = hz;
        }
        config.validate()?;
        Ok((config, self.demo))
    }
}

/// Append a slowly varying ADC value to `sheet` once a second.
async fn run_demo_feed(sheet: Arc<MemorySheet>) {
    let mut n: u32 = 0;
    loop {
        let phase = f64::from(n) * 0.1;
        let adc = (2048.0 + phase.sin() * 900.0 + (phase * 3.0).cos() * 150.0).round();
        sheet.append_row(&[n.to_string().as_str(), adc.to_string().as_str()]);
        n = n.wrapping_add(1);
        sleep(Duration::from_secs(1)).await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (config, demo) = Args::parse().into_config()?;

    log::info!("─────────────────────────────────────────");
    log::info!("  JawSense Data Hub");
    log::info!("─────────────────────────────────────────");
    log::info!("  HR input:   POST /data  (from wearable)");
    log::info!(
        "  EMG input:  {} column {} (polled every {:?})",
        if demo { "demo sheet" } else { "Google Sheets" },
        config.emg_column,
        config.poll_interval()
    );
    log::info!("  Output:     GET /stream  (@ {} Hz)", config.stream_hz);
    if !demo {
        log::info!("  Sheet:      {}", config.spreadsheet_id);
    }
    log::info!("─────────────────────────────────────────");

    let hub = Arc::new(Hub::new(config)?);

    let tasks = if demo {
        let sheet = MemorySheet::with_header(&["sample", "emg"]);
        tokio::spawn(run_demo_feed(Arc::clone(&sheet)));
        hub.start(MemoryConnector::new(sheet))
    } else {
        let connector = SheetsConnector::new(
            hub.config().spreadsheet_id.clone(),
            &hub.config().credentials_path,
        );
        hub.start(connector)
    };

    let result = server::serve(Arc::clone(&hub)).await;
    tasks.abort();
    result.context("serving HTTP")
}
