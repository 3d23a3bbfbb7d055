//! Byte transport between host and sensor board.
//!
//! The protocol layers only need four primitives from the link: how many bytes
//! are waiting, a read that may return nothing, a full write and an input flush.
//! Framing, acknowledgments and timeouts all live above this trait.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serialport::{ClearBuffer, SerialPort};

use crate::errors::{DriverError, Result};

/// Default serial baud rate for the sensor board
pub const BAUD_RATE: u32 = 115200;

/// Default per-read timeout of the serial port
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Duplex byte channel with no built-in framing.
pub trait Transport {
    /// Number of bytes that can be read right now without waiting.
    fn bytes_available(&mut self) -> Result<usize>;

    /// Read up to `buf.len()` bytes. `Ok(0)` means nothing arrived (an empty poll).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write every byte of `data`.
    fn write_all(&mut self, data: &[u8]) -> Result<()>;

    /// Drop anything already buffered on the input side.
    fn reset_input_buffer(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn bytes_available(&mut self) -> Result<usize> {
        (**self).bytes_available()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        (**self).write_all(data)
    }

    fn reset_input_buffer(&mut self) -> Result<()> {
        (**self).reset_input_buffer()
    }
}

/// Where and how to open the serial link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    #[serde(with = "duration_ms")]
    pub read_timeout: Duration,
}

impl SerialSettings {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Serial port transport backed by the `serialport` crate.
///
/// The port is closed when this value is dropped.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open the port and discard any stale input.
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        let port = serialport::new(&settings.port, settings.baud_rate)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|source| DriverError::TransportOpen {
                port: settings.port.clone(),
                source,
            })?;

        let mut transport = Self { port };
        transport.reset_input_buffer()?;
        info!(
            "serial port open: port={}, baud={}",
            settings.port, settings.baud_rate
        );
        Ok(transport)
    }

    /// Wrap an already-open port.
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Transport for SerialTransport {
    fn bytes_available(&mut self) -> Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(0)
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn reset_input_buffer(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        debug!("input buffer cleared");
        Ok(())
    }
}

pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
