//! # WaveWriter RS
//!
//! Host-side driver for the WaveWriter, a serial-attached stimulation device that
//! plays back an arbitrary voltage/time waveform.
//!
//! The driver finds the device by greeting every serial port and waiting for the
//! expected acknowledgment, then uploads waveforms as comma-delimited text and
//! starts or stops stimulation.
//!
//! ## Features
//!
//! - **Device discovery**: Probes each serial port with a three-round handshake
//! - **Waveform validation**: Accepts `ndarray` arrays of any shape that squeeze to one dimension
//! - **Upload protocol**: `prep1`/`prep2` command sequencing with text-encoded buffers
//! - **CSV input**: Load waveforms from `v`/`t` tables through `polars`
//!
//! ## Examples
//!
//! ### Upload and Start
//!
//! ```rust,no_run
//! use ndarray::Array1;
//! use wavewriter_rs::WaveWriter;
//!
//! let mut device = WaveWriter::connect(None)?;
//!
//! let t = Array1::linspace(0.0, 0.01, 100);
//! let v = t.mapv(|t| (2.0 * std::f64::consts::PI * 100.0 * t).sin());
//!
//! device.send_waveform(&v, &t)?;
//! device.start()?;
//! std::thread::sleep(std::time::Duration::from_secs(1));
//! device.stop()?;
//! device.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Encoding
//!
//! ```rust
//! use ndarray::arr1;
//! use wavewriter_rs::convert_buffer;
//!
//! assert_eq!(convert_buffer(&arr1(&[0.0, 1.5, -1.5])), "0.0,1.5,-1.5");
//! ```
//!
//! ### Device Discovery
//!
//! ```rust,no_run
//! use wavewriter_rs::WaveConnector;
//!
//! let connector = WaveConnector::new();
//! for port in connector.available_devices()? {
//!     println!("WaveWriter at {}", port);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod protocol;
pub mod serial_link;
pub mod wave_connector;
pub mod wave_writer;
pub mod waveform;

#[cfg(test)]
mod mock_serial;

// Re-export the main types for convenience
pub use protocol::Command;

pub use serial_link::{LinkError, LinkSettings, SerialBackend, SystemSerial};

pub use wave_connector::{NotViableReason, ProbeOutcome, WaveConnector, WaveConnectorError};

pub use wave_writer::{WaveWriter, WaveWriterError};

pub use waveform::{convert_buffer, InputError, Signal, Waveform};
