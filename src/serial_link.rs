use crate::protocol::{BAUD_RATE, HANDSHAKE_ROUNDS, OPERATING_TIMEOUT, PROBE_TIMEOUT};
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

/// Link parameters used while probing and once a device is connected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: u32,
    pub probe_timeout: Duration,
    pub operating_timeout: Duration,
    pub handshake_rounds: usize,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            probe_timeout: PROBE_TIMEOUT,
            operating_timeout: OPERATING_TIMEOUT,
            handshake_rounds: HANDSHAKE_ROUNDS,
        }
    }
}

impl LinkSettings {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_operating_timeout(mut self, timeout: Duration) -> Self {
        self.operating_timeout = timeout;
        self
    }

    /// At least one round is always performed.
    pub fn with_handshake_rounds(mut self, rounds: usize) -> Self {
        self.handshake_rounds = rounds.max(1);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Source of serial endpoints.
///
/// The system implementation goes through `serialport`; tests substitute a scripted
/// backend so discovery can run without hardware.
pub trait SerialBackend {
    type Link: Read + Write;

    /// Names of all endpoints visible to the host, in enumeration order
    fn port_names(&self) -> Result<Vec<String>, LinkError>;

    /// Open `port` with the same timeout for reads and writes
    fn open(&self, port: &str, baud_rate: u32, timeout: Duration)
        -> Result<Self::Link, LinkError>;
}

/// Serial endpoints of the host operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSerial;

impl SerialBackend for SystemSerial {
    type Link = Box<dyn SerialPort>;

    fn port_names(&self) -> Result<Vec<String>, LinkError> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(|info| info.port_name).collect())
    }

    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self::Link, LinkError> {
        let link = serialport::new(port, baud_rate).timeout(timeout).open()?;
        Ok(link)
    }
}

/// Write one message and flush it out.
pub fn write_message<W: Write + ?Sized>(link: &mut W, message: &[u8]) -> io::Result<()> {
    link.write_all(message)?;
    link.flush()
}

/// Read bytes until a newline arrives or `timeout` elapses.
///
/// A timeout is not an error: whatever arrived so far is returned, possibly nothing.
/// The newline, if any, is kept.
pub fn read_line<R: Read + ?Sized>(link: &mut R, timeout: Duration) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    let now = Instant::now();

    loop {
        let mut byte = [0u8; 1];
        match link.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }

        if now.elapsed() >= timeout {
            log::debug!("Line read timed out after {} bytes", line.len());
            break;
        }
    }

    Ok(line)
}

/// Decode a handshake response line.
///
/// Strips the line terminator and any NUL padding the firmware leaves behind.
/// Returns `None` for bytes that are not valid UTF-8.
pub fn decode_response(line: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(line).ok()?;
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_suffix('\r').unwrap_or(text);
    Some(text.trim_end_matches('\0').to_string())
}
