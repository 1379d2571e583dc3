//! Mi Band heart-rate monitor.
//!
//! Connects to a band, authenticates, streams heart rate and vibrates the
//! band when the rate drops well below its running mean. Samples are plotted
//! with gnuplot on exit.
//!
//! Environment variables (each also a flag):
//! - MIBAND_ADDRESS: Bluetooth address of the band
//! - MIBAND_TYPE: 6 or 7
//! - MIBAND_AUTH_KEY_FILE: file holding the 32-hex-character auth key
//! - MIBAND_LOG_LEVEL: trace|debug|info|warn|error

mod plot;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use miband_link::ble::BluezTransport;
use miband_link::config::{BandConfig, BandType, SessionConfig};
use miband_link::core::DEFAULT_MTU;
use miband_link::session::{self, Session, SessionObserver};
use miband_link::telemetry::HeartRateSample;
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "miband-monitor", version, about = "Heart-rate monitor for Mi Band 6/7")]
struct Cli {
    /// Bluetooth address of the band
    #[arg(long, env = "MIBAND_ADDRESS")]
    address: String,

    /// Band model (6 or 7)
    #[arg(long, env = "MIBAND_TYPE", default_value = "6")]
    band_type: BandType,

    /// File holding the auth key
    #[arg(long, env = "MIBAND_AUTH_KEY_FILE", default_value = "auth_key.txt")]
    auth_key_file: PathBuf,

    /// Log level
    #[arg(long, env = "MIBAND_LOG_LEVEL", default_value = "info")]
    log_level: Level,

    /// ATT MTU for chunked writes
    #[arg(long, default_value_t = DEFAULT_MTU)]
    mtu: usize,

    /// Skip the gnuplot window
    #[arg(long)]
    no_plot: bool,
}

struct MonitorObserver {
    plot: bool,
    plots: Vec<JoinHandle<()>>,
}

impl MonitorObserver {
    fn new(plot: bool) -> Self {
        Self {
            plot,
            plots: Vec::new(),
        }
    }

    /// Wait for every plot handed to the blocking pool.
    async fn wait_for_plots(self) {
        for handle in self.plots {
            if let Err(e) = handle.await {
                warn!("Plot task failed: {}", e);
            }
        }
    }
}

impl SessionObserver for MonitorObserver {
    fn on_handshake_complete(&mut self) {
        info!("Successfully authenticated");
    }

    fn on_alert(&mut self, sample: &HeartRateSample) {
        warn!("Heart rate drop at {}s ({} bpm), alert sent", sample.timestamp_secs, sample.bpm);
    }

    fn on_sample_recorded(&mut self, sample: &HeartRateSample) {
        info!("Heart Rate Value: {}", sample.bpm);
    }

    fn on_buffer_flush(&mut self, samples: &[HeartRateSample]) {
        if !self.plot {
            return;
        }
        // plot::plot blocks until gnuplot exits
        let samples = samples.to_vec();
        self.plots.retain(|handle| !handle.is_finished());
        self.plots.push(task::spawn_blocking(move || {
            if let Err(e) = plot::plot(&samples) {
                warn!("Could not plot {} samples: {}", samples.len(), e);
            }
        }));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_target(true)
        .init();

    let config = BandConfig::new(cli.address.clone(), cli.band_type, cli.auth_key_file.clone())?;
    let auth_key = config.load_auth_key().context("loading auth key")?;
    info!("Monitoring {} at {}", config.band_type, config.address);

    let (tx, rx) = mpsc::channel(64);
    let transport = BluezTransport::connect(&config.address, tx)
        .await
        .context("connecting to band")?;

    let session_config = SessionConfig {
        mtu: cli.mtu,
        ..SessionConfig::default()
    };
    let observer = MonitorObserver::new(!cli.no_plot);
    let mut session = Session::new(transport, auth_key, observer, session_config);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Keyboard interrupt received. Quitting...");
    };
    let result = session::run(&mut session, rx, shutdown).await;

    let (transport, observer) = session.finish();
    if let Err(e) = transport.disconnect().await {
        warn!("Disconnect failed: {}", e);
    }
    observer.wait_for_plots().await;

    result.context("session ended")?;
    Ok(())
}
