// Device discovery example
//
// Lists every serial port on the host and every port that answers the WaveWriter
// handshake.

use wavewriter_rs::{ProbeOutcome, SerialBackend, SystemSerial, WaveConnector};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("WaveWriter Device Discovery");
    println!("===========================\n");

    let ports = SystemSerial.port_names()?;
    if ports.is_empty() {
        println!("No serial ports found.");
        return Ok(());
    }

    let connector = WaveConnector::new();
    for port in &ports {
        match connector.probe_port(port) {
            ProbeOutcome::Viable => println!("  {} <- WaveWriter", port),
            ProbeOutcome::NotViable(reason) => println!("  {} ({})", port, reason),
        }
    }

    Ok(())
}
