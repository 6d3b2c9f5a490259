//! Continuous scan loop: every barcode read captures and saves an image

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use pbtscan::{
    resolve_port, ImageFileSink, ScanOutcome, Scanner, ScannerConfig, SerialConfig,
    SerialTransport,
};
use pbtscan_core::{constants::DEFAULT_READ_TIMEOUT, DEFAULT_VENDOR_ID};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pbtscan", version, about = "Capture images from a PBT9500 barcode imager")]
struct Args {
    /// Serial port to use instead of searching by vendor id
    #[arg(short, long, env = "PBTSCAN_PORT")]
    port: Option<String>,

    /// USB vendor id of the scanner's virtual COM port
    #[arg(long, env = "PBTSCAN_VENDOR_ID", default_value_t = DEFAULT_VENDOR_ID)]
    vendor_id: u16,

    /// Directory for captured images
    #[arg(short, long, env = "PBTSCAN_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Read timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_READ_TIMEOUT)]
    timeout: u64,

    /// Close and reopen the port on every reset
    #[arg(long)]
    reopen_on_reset: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Initializing");

    let port = match args.port {
        Some(port) => port,
        None => match resolve_port(args.vendor_id)? {
            Some(port) => port,
            None => bail!(
                "no scanner detected on virtual COM (vid=0x{:04X}); connect the device and restart",
                args.vendor_id
            ),
        },
    };

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;

    let transport = SerialTransport::new(
        SerialConfig::new(port).with_read_timeout(Duration::from_secs(args.timeout)),
    );
    let config = ScannerConfig::default().with_reopen_on_reset(args.reopen_on_reset);
    let mut scanner = Scanner::new(transport, ImageFileSink::new(&args.output_dir)).with_config(config);

    scanner.open().await?;

    let signal = scanner.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping after the current read");
            signal.trigger();
        }
    });

    loop {
        info!("Ready to scan");
        match scanner.scan().await? {
            ScanOutcome::Cancelled => break,
            ScanOutcome::Captured { barcode, received, declared, .. } => {
                debug!("Cycle complete for {} ({}/{} bytes)", barcode, received, declared)
            }
            ScanOutcome::NoBarcode => {}
            ScanOutcome::Failed { stage, error } => {
                debug!("Cycle failed at {} stage: {}", stage, error)
            }
        }
    }

    scanner.shutdown().await?;
    info!("Done");
    Ok(())
}
