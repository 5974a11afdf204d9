use crate::protocol::Command;
use crate::serial_link::{write_message, SerialBackend, SystemSerial};
use crate::wave_connector::{WaveConnector, WaveConnectorError};
use crate::waveform::{InputError, Waveform};
use ndarray::{ArrayBase, Data, Dimension};
use serialport::SerialPort;
use std::io::{Read, Write};

#[derive(Debug, thiserror::Error)]
pub enum WaveWriterError {
    #[error("Connector error: {0}")]
    Connector(#[from] WaveConnectorError),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] InputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection to {port} is closed")]
    Closed { port: String },
}

/// A connected WaveWriter.
///
/// Owns the serial link exclusively. Uploads and start/stop are fire-and-forget:
/// nothing is read back from the device after discovery.
pub struct WaveWriter<L = Box<dyn SerialPort>> {
    port: String,
    link: Option<L>,
    waveform: Option<Waveform>,
}

impl WaveWriter<Box<dyn SerialPort>> {
    /// Connect to a WaveWriter on the host's serial ports.
    ///
    /// Scans every port unless `port` names one explicitly.
    pub fn connect(port: Option<&str>) -> Result<Self, WaveWriterError> {
        Self::connect_with(&WaveConnector::<SystemSerial>::new(), port)
    }
}

impl<L: Read + Write> WaveWriter<L> {
    pub fn connect_with<B>(
        connector: &WaveConnector<B>,
        port: Option<&str>,
    ) -> Result<Self, WaveWriterError>
    where
        B: SerialBackend<Link = L>,
    {
        let (port, link) = connector.connect(port)?;
        Ok(Self::from_link(port, link))
    }

    /// Wrap a link that is already known to lead to a WaveWriter
    pub fn from_link(port: impl Into<String>, link: L) -> Self {
        Self {
            port: port.into(),
            link: Some(link),
            waveform: None,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// The last waveform that passed validation
    pub fn waveform(&self) -> Option<&Waveform> {
        self.waveform.as_ref()
    }

    /// Validate `v` and `t` and store them as the current waveform.
    ///
    /// On error the previously stored waveform is left untouched.
    pub fn check_inputs<S1, D1, S2, D2>(
        &mut self,
        v: &ArrayBase<S1, D1>,
        t: &ArrayBase<S2, D2>,
    ) -> Result<&Waveform, InputError>
    where
        S1: Data<Elem = f64>,
        D1: Dimension,
        S2: Data<Elem = f64>,
        D2: Dimension,
    {
        let waveform = Waveform::new(v, t)?;
        Ok(self.waveform.insert(waveform))
    }

    /// Validate, encode and upload a waveform.
    ///
    /// Writes `prep1`, the voltage buffer, `prep2` and the time buffer, in that
    /// order, without waiting for any reply.
    #[tracing::instrument(skip_all, fields(port = %self.port))]
    pub fn send_waveform<S1, D1, S2, D2>(
        &mut self,
        v: &ArrayBase<S1, D1>,
        t: &ArrayBase<S2, D2>,
    ) -> Result<(), WaveWriterError>
    where
        S1: Data<Elem = f64>,
        D1: Dimension,
        S2: Data<Elem = f64>,
        D2: Dimension,
    {
        self.ensure_open()?;
        let (voltage, time) = self.check_inputs(v, t)?.encode();
        self.write_buffers(&voltage, &time)
    }

    /// Upload an already validated waveform, e.g. one loaded from CSV.
    pub fn upload(&mut self, waveform: Waveform) -> Result<(), WaveWriterError> {
        self.ensure_open()?;
        let (voltage, time) = self.waveform.insert(waveform).encode();
        self.write_buffers(&voltage, &time)
    }

    fn write_buffers(&mut self, voltage: &str, time: &str) -> Result<(), WaveWriterError> {
        log::debug!(
            "Uploading waveform ({} voltage bytes, {} time bytes)",
            voltage.len(),
            time.len()
        );
        self.send_command(Command::PrepareVoltage)?;
        self.send_message(voltage)?;
        self.send_command(Command::PrepareTime)?;
        self.send_message(time)
    }

    /// Begin stimulation with the buffers currently loaded on the device
    pub fn start(&mut self) -> Result<(), WaveWriterError> {
        self.send_command(Command::Start)
    }

    pub fn stop(&mut self) -> Result<(), WaveWriterError> {
        self.send_command(Command::Stop)
    }

    pub fn send_command(&mut self, command: Command) -> Result<(), WaveWriterError> {
        log::debug!("Sending command {}", command);
        self.send_message(command.as_str())
    }

    /// Write raw text to the device. No newline is appended.
    pub fn send_message(&mut self, message: &str) -> Result<(), WaveWriterError> {
        let port = &self.port;
        let link = self
            .link
            .as_mut()
            .ok_or_else(|| WaveWriterError::Closed { port: port.clone() })?;
        write_message(link, message.as_bytes())?;
        Ok(())
    }

    /// Release the serial link. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.link.take().is_some() {
            log::debug!("Closed connection to {}", self.port);
        }
    }

    fn ensure_open(&self) -> Result<(), WaveWriterError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(WaveWriterError::Closed {
                port: self.port.clone(),
            })
        }
    }
}

impl<L> std::fmt::Debug for WaveWriter<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveWriter")
            .field("port", &self.port)
            .field("open", &self.link.is_some())
            .field("waveform", &self.waveform)
            .finish()
    }
}
