// Waveform upload example
//
// Loads a waveform from a CSV file with `v` and `t` columns, uploads it and runs the
// stimulation for a fixed time.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use wavewriter_rs::{WaveWriter, Waveform};

#[derive(Parser)]
#[command(name = "upload_waveform")]
#[command(version = "1.0")]
#[command(about = "Upload a waveform to a WaveWriter and stimulate")]
struct Args {
    /// CSV file with `v` (volts) and `t` (seconds) columns
    waveform: PathBuf,

    /// Serial port of the device; scans all ports if omitted
    #[arg(short, long)]
    port: Option<String>,

    /// Stimulation time in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    duration: u64,

    /// Upload only, do not start stimulation
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let waveform = Waveform::from_csv(&args.waveform)?;
    println!(
        "Loaded {} samples from {}",
        waveform.len(),
        args.waveform.display()
    );

    let mut device = WaveWriter::connect(args.port.as_deref())?;
    println!("✓ Connected to WaveWriter on {}", device.port());

    device.upload(waveform)?;
    println!("✓ Waveform uploaded");

    if !args.dry_run {
        device.start()?;
        println!("Stimulating for {}ms...", args.duration);
        std::thread::sleep(Duration::from_millis(args.duration));
        device.stop()?;
        println!("✓ Stopped");
    }

    device.close();
    Ok(())
}
