//! Single capture example

use pbtscan::{ImageFileSink, ScanOutcome, Scanner, SerialConfig, SerialTransport};

#[tokio::main]
async fn main() -> pbtscan::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Change to your scanner's port
    let port = std::env::var("PBTSCAN_PORT").unwrap_or_else(|_| "COM7".to_string());

    println!("Opening {}...", port);

    let transport = SerialTransport::new(SerialConfig::new(port));
    let mut scanner = Scanner::new(transport, ImageFileSink::new("."));

    scanner.open().await?;
    println!("✓ Ready, scan a barcode");

    match scanner.scan().await? {
        ScanOutcome::Captured { barcode, received, .. } => {
            println!("✓ {}: {} bytes", barcode, received)
        }
        other => println!("✗ {:?}", other),
    }

    // Waits for the image to be written
    scanner.shutdown().await?;
    println!("✓ Closed");

    Ok(())
}
