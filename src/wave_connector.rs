use crate::protocol::{ACKNOWLEDGMENT, GREETING};
use crate::serial_link::{
    decode_response, read_line, write_message, LinkError, LinkSettings, SerialBackend,
    SystemSerial,
};
use std::io::{self, Read, Write};

#[derive(Debug, thiserror::Error)]
pub enum WaveConnectorError {
    #[error("Serial link error: {0}")]
    Link(#[from] LinkError),

    #[error("Port {port} is not the WaveWriter device you're looking for: {reason}")]
    InvalidPort {
        port: String,
        reason: NotViableReason,
    },

    #[error("No WaveWriter device found. Please connect a WaveWriter or specify the port manually")]
    DeviceNotFound,
}

/// Why a candidate port was passed over during discovery
#[derive(Debug, thiserror::Error)]
pub enum NotViableReason {
    #[error("could not open port: {0}")]
    OpenFailed(#[source] LinkError),

    #[error("handshake I/O failed: {0}")]
    Io(#[source] io::Error),

    #[error("response is not valid UTF-8: {0:02X?}")]
    Undecodable(Vec<u8>),

    #[error("unexpected response {0:?}")]
    UnexpectedResponse(String),
}

/// Result of probing a single candidate port. Probing never fails as such.
#[derive(Debug)]
pub enum ProbeOutcome {
    Viable,
    NotViable(NotViableReason),
}

impl ProbeOutcome {
    pub fn is_viable(&self) -> bool {
        matches!(self, ProbeOutcome::Viable)
    }
}

/// Finds the WaveWriter among the serial ports of a backend
#[derive(Debug, Clone)]
pub struct WaveConnector<B = SystemSerial> {
    backend: B,
    settings: LinkSettings,
}

impl WaveConnector<SystemSerial> {
    pub fn new() -> Self {
        Self::with_backend(SystemSerial, LinkSettings::default())
    }
}

impl Default for WaveConnector<SystemSerial> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: SerialBackend> WaveConnector<B> {
    pub fn with_backend(backend: B, settings: LinkSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Connect to a WaveWriter and return the live link along with its port name.
    ///
    /// With `port` given, only that port is probed; otherwise every port is scanned.
    /// The returned link uses the operating timeout.
    pub fn connect(&self, port: Option<&str>) -> Result<(String, B::Link), WaveConnectorError> {
        let port = match port {
            Some(port) => {
                log::debug!("Connecting to WaveWriter on port {}", port);
                match self.probe_port(port) {
                    ProbeOutcome::Viable => port.to_string(),
                    ProbeOutcome::NotViable(reason) => {
                        return Err(WaveConnectorError::InvalidPort {
                            port: port.to_string(),
                            reason,
                        })
                    }
                }
            }
            None => self.find_device()?,
        };

        let link = self.backend.open(
            &port,
            self.settings.baud_rate,
            self.settings.operating_timeout,
        )?;
        log::info!("Connected to WaveWriter on {}", port);
        Ok((port, link))
    }

    /// Scan all ports in enumeration order and return the first that acknowledges.
    #[tracing::instrument(skip(self))]
    pub fn find_device(&self) -> Result<String, WaveConnectorError> {
        let ports = self.backend.port_names()?;
        log::debug!("Scanning {} serial port(s) for a WaveWriter", ports.len());

        for port in ports {
            match self.probe_port(&port) {
                ProbeOutcome::Viable => {
                    log::debug!("WaveWriter acknowledged on {}", port);
                    return Ok(port);
                }
                ProbeOutcome::NotViable(reason) => {
                    log::debug!("Skipping {}: {}", port, reason);
                }
            }
        }

        Err(WaveConnectorError::DeviceNotFound)
    }

    /// Probe every port and list those that acknowledge the handshake.
    pub fn available_devices(&self) -> Result<Vec<String>, WaveConnectorError> {
        let ports = self.backend.port_names()?;
        Ok(ports
            .into_iter()
            .filter(|port| self.probe_port(port).is_viable())
            .collect())
    }

    /// Open `port` with the probe timeout, run the handshake and close it again.
    pub fn probe_port(&self, port: &str) -> ProbeOutcome {
        let mut link = match self.backend.open(
            port,
            self.settings.baud_rate,
            self.settings.probe_timeout,
        ) {
            Ok(link) => link,
            Err(e) => return ProbeOutcome::NotViable(NotViableReason::OpenFailed(e)),
        };

        let outcome = self.handshake(&mut link);
        drop(link);
        outcome
    }

    fn handshake(&self, link: &mut B::Link) -> ProbeOutcome {
        match self.last_response(link) {
            Ok(response) => Self::check_response(&response),
            Err(e) => ProbeOutcome::NotViable(NotViableReason::Io(e)),
        }
    }

    /// Greet the device once per round and keep only the final answer.
    fn last_response<L: Read + Write>(&self, link: &mut L) -> io::Result<Vec<u8>> {
        let mut response = Vec::new();
        for _ in 0..self.settings.handshake_rounds {
            write_message(link, GREETING.as_bytes())?;
            response = read_line(link, self.settings.probe_timeout)?;
        }
        Ok(response)
    }

    fn check_response(response: &[u8]) -> ProbeOutcome {
        match decode_response(response) {
            Some(text) if text == ACKNOWLEDGMENT => ProbeOutcome::Viable,
            Some(text) => ProbeOutcome::NotViable(NotViableReason::UnexpectedResponse(text)),
            None => ProbeOutcome::NotViable(NotViableReason::Undecodable(response.to_vec())),
        }
    }
}
