//! Protocol constants for the WaveWriter text protocol.
//!
//! Everything on the wire is plain ASCII with no framing, no length prefix and no
//! acknowledgment after a command. The only exchange that reads anything back is the
//! discovery handshake.

use std::time::Duration;

/// Greeting written by the host while probing a port
pub const GREETING: &str = "Hello";

/// Line the device answers the greeting with, once trailing NULs are trimmed
pub const ACKNOWLEDGMENT: &str = "Hi there";

/// Fixed link speed of the device firmware
pub const BAUD_RATE: u32 = 115_200;

/// Read/write timeout while probing candidate ports
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Read/write timeout on the live connection
pub const OPERATING_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of greeting round-trips per probe. Only the last response is trusted.
pub const HANDSHAKE_ROUNDS: usize = 3;

/// Separator between samples in an encoded buffer
pub const DELIMITER: char = ',';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Next payload fills the voltage buffer
    PrepareVoltage,
    /// Next payload fills the time buffer
    PrepareTime,
    Start,
    Stop,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::PrepareVoltage => "prep1",
            Command::PrepareTime => "prep2",
            Command::Start => "start",
            Command::Stop => "stop",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
