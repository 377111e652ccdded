//! Integration tests for the LoRa APRS beacon firmware.
//!
//! Run after flashing the firmware and storing a configuration with a real
//! callsign. The tests reset the tracker and watch its console log.

mod device;
mod protocol;

use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use device::{resolve_port, DeviceClient};
use tests::{print_results, run_all_tests, Session};

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Integration tests for the LoRa APRS beacon firmware")]
struct Args {
    /// Console port of the tracker (use "auto" to auto-detect)
    #[arg(short, long, default_value = "auto")]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    baud: u32,

    /// Number of beacons to collect
    #[arg(short = 'n', long, default_value = "5")]
    beacons: usize,

    /// Longest wait for a single beacon, in seconds
    #[arg(short, long, default_value = "600")]
    timeout: u64,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Resolve port (auto-detect if "auto")
    let port = resolve_port(&args.port)?;

    println!("{}", "LoRa APRS Beacon Integration Tests".bold());
    println!("Port: {}", port);
    println!("Baud: {}", args.baud);
    println!("Beacons: {}", args.beacons);
    println!();

    println!("Connecting to tracker...");
    let device = DeviceClient::new(&port, args.baud)?;
    println!("{}", "Connected!".green());

    let mut session = Session {
        device,
        beacons: args.beacons,
        beacon_timeout: Duration::from_secs(args.timeout),
        payloads: Vec::new(),
    };

    println!("\nRunning tests...\n");

    let results = run_all_tests(&mut session);
    print_results(&results);

    // Exit with error code if any tests failed
    let failed = results.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
