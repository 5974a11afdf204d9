//! Scripted in-memory serial backend for tests.

use crate::protocol::GREETING;
use crate::serial_link::{LinkError, SerialBackend};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Every open attempt, including those that fail
    Open { port: String, timeout: Duration },
    Write { port: String, bytes: Vec<u8> },
    Read { port: String },
    Close { port: String },
}

/// Failure injected into a port once it is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Every write times out
    Write,
    /// Every read fails with a broken pipe
    Read,
}

#[derive(Debug, Clone)]
pub struct MockPort {
    name: String,
    fail_open: bool,
    fault: Option<Fault>,
    responses: Vec<Vec<u8>>,
}

impl MockPort {
    /// A port that answers every greeting with the matching entry of `responses`
    /// and stays silent once they run out.
    pub fn answering(name: &str, responses: &[&[u8]]) -> Self {
        Self {
            name: name.to_string(),
            fail_open: false,
            fault: None,
            responses: responses.iter().map(|r| r.to_vec()).collect(),
        }
    }

    pub fn silent(name: &str) -> Self {
        Self::answering(name, &[])
    }

    pub fn busy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail_open: true,
            fault: None,
            responses: Vec::new(),
        }
    }

    /// A device that opens fine but whose link then fails with `fault`.
    pub fn faulty(name: &str, fault: Fault) -> Self {
        Self {
            fault: Some(fault),
            ..Self::device(name)
        }
    }

    /// A device that needs two greetings to settle before it acknowledges.
    pub fn device(name: &str) -> Self {
        Self::answering(name, &[b"\0\0", b"garbage", b"Hi there\0\0"])
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    ports: Vec<MockPort>,
    events: Arc<Mutex<Vec<Event>>>,
}

impl MockBackend {
    pub fn new(ports: Vec<MockPort>) -> Self {
        Self {
            ports,
            events: Arc::default(),
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn clear_events(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    /// Opens of `port` in order, with their timeouts
    pub fn opens_of(&self, port: &str) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Open { port: p, timeout } if p == port => Some(timeout),
                _ => None,
            })
            .collect()
    }

    pub fn writes_to(&self, port: &str) -> Vec<Vec<u8>> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Write { port: p, bytes } if p == port => Some(bytes),
                _ => None,
            })
            .collect()
    }

    pub fn reads_from(&self, port: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::Read { port: p } if p == port))
            .count()
    }

    pub fn closes_of(&self, port: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, Event::Close { port: p } if p == port))
            .count()
    }
}

impl SerialBackend for MockBackend {
    type Link = MockLink;

    fn port_names(&self) -> Result<Vec<String>, LinkError> {
        Ok(self.ports.iter().map(|p| p.name.clone()).collect())
    }

    fn open(&self, port: &str, _baud_rate: u32, timeout: Duration) -> Result<MockLink, LinkError> {
        let mock = self
            .ports
            .iter()
            .find(|p| p.name == port)
            .ok_or_else(|| LinkError::Io(io::Error::from(io::ErrorKind::NotFound)))?;

        record(
            &self.events,
            Event::Open {
                port: port.to_string(),
                timeout,
            },
        );

        if mock.fail_open {
            return Err(LinkError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "port busy",
            )));
        }

        Ok(MockLink {
            port: port.to_string(),
            fault: mock.fault,
            responses: mock.responses.iter().cloned().collect(),
            pending: VecDeque::new(),
            events: Arc::clone(&self.events),
        })
    }
}

#[derive(Debug)]
pub struct MockLink {
    port: String,
    fault: Option<Fault>,
    responses: VecDeque<Vec<u8>>,
    pending: VecDeque<u8>,
    events: Arc<Mutex<Vec<Event>>>,
}

impl Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        record(
            &self.events,
            Event::Read {
                port: self.port.clone(),
            },
        );
        if self.fault == Some(Fault::Read) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        match (self.pending.pop_front(), buf.first_mut()) {
            (Some(byte), Some(slot)) => {
                *slot = byte;
                Ok(1)
            }
            _ => Err(io::Error::new(io::ErrorKind::TimedOut, "operation timed out")),
        }
    }
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        record(
            &self.events,
            Event::Write {
                port: self.port.clone(),
                bytes: buf.to_vec(),
            },
        );
        if self.fault == Some(Fault::Write) {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "write timed out"));
        }
        if buf == GREETING.as_bytes() {
            if let Some(response) = self.responses.pop_front() {
                self.pending.extend(response);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MockLink {
    fn drop(&mut self) {
        record(
            &self.events,
            Event::Close {
                port: self.port.clone(),
            },
        );
    }
}

fn record(events: &Arc<Mutex<Vec<Event>>>, event: Event) {
    if let Ok(mut events) = events.lock() {
        events.push(event);
    }
}
