//! One acquisition session: configure, trigger, collect, decode.
//!
//! # Timing
//!
//! The board timestamps every frame with its own microsecond clock, so sample
//! times come from the device and not from when bytes reached the host. The
//! clock is only rebased to the first frame; a device reset mid-session would
//! show up as a negative jump and is passed through unchanged.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{DriverError, Result};
use crate::handshake::{exchange, HandshakePolicy};
use crate::pacing::{Pacer, ThreadPacer};
use crate::protocol::{clamp_capdac, decode, Command, Sample, FRAME_SIZE};
use crate::reader::{read_exact, ReadPolicy};
use crate::transport::{SerialSettings, SerialTransport, Transport};

/// Sensor sampling rate of the board firmware, in Hz
pub const DEFAULT_SAMPLING_RATE_HZ: f64 = 200.0;

/// Default acquisition length, in seconds
pub const DEFAULT_DURATION_S: f64 = 60.0;

/// Everything a session needs besides the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Requested CAPDAC level, clamped to 0..=31 when the session is built.
    pub capdac: i64,
    pub duration_s: f64,
    pub sampling_rate_hz: f64,
    pub handshake: HandshakePolicy,
    pub read: ReadPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capdac: 0,
            duration_s: DEFAULT_DURATION_S,
            sampling_rate_hz: DEFAULT_SAMPLING_RATE_HZ,
            handshake: HandshakePolicy::default(),
            read: ReadPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// `round(sampling_rate_hz * duration_s)` with ties to even, rejected when
    /// it cannot be sent or buffered.
    pub fn sample_count(&self) -> Result<u32> {
        let product = self.sampling_rate_hz * self.duration_s;
        if !product.is_finite() || product < 0.0 {
            return Err(DriverError::InvalidConfig(format!(
                "sampling rate {} Hz x duration {} s is not a valid sample count",
                self.sampling_rate_hz, self.duration_s
            )));
        }
        let count = product.round_ties_even();
        if count < 1.0 {
            return Err(DriverError::InvalidConfig(
                "session would request zero samples".into(),
            ));
        }
        if count > (u32::MAX as usize / FRAME_SIZE) as f64 {
            return Err(DriverError::InvalidConfig(format!(
                "{count} samples exceed the maximum bulk read size"
            )));
        }
        Ok(count as u32)
    }
}

/// Metadata that travels with a result to persistence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub duration_s: f64,
    pub sampling_rate_hz: f64,
    pub capdac: u8,
}

/// Outcome of a completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResult {
    /// Samples in device transmission order.
    pub samples: Vec<Sample>,
    /// Bytes received in the bulk read.
    pub bytes_received: usize,
    /// False when the byte count was not a multiple of the frame size.
    pub whole_frames: bool,
    /// Bytes of an incomplete last frame that were discarded.
    pub trailing_bytes: usize,
    pub sample_count: u32,
    pub metadata: SessionMetadata,
}

/// A configured session. The CAPDAC level and sample count are fixed at construction.
#[derive(Debug, Clone)]
pub struct AcquisitionSession {
    config: SessionConfig,
    capdac: u8,
    sample_count: u32,
}

impl AcquisitionSession {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let capdac = clamp_capdac(config.capdac);
        if capdac as i64 != config.capdac {
            warn!("CAPDAC {} out of range, using {}", config.capdac, capdac);
        }
        let sample_count = config.sample_count()?;

        Ok(Self {
            config,
            capdac,
            sample_count,
        })
    }

    pub fn capdac(&self) -> u8 {
        self.capdac
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Bytes the bulk read waits for.
    pub fn expected_bytes(&self) -> usize {
        self.sample_count as usize * FRAME_SIZE
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn metadata(&self) -> SessionMetadata {
        SessionMetadata {
            duration_s: self.config.duration_s,
            sampling_rate_hz: self.config.sampling_rate_hz,
            capdac: self.capdac,
        }
    }

    /// Run the session on `transport`. The first failing step aborts the rest.
    pub fn run<T, P>(&self, transport: &mut T, pacer: &mut P) -> Result<AcquisitionResult>
    where
        T: Transport + ?Sized,
        P: Pacer + ?Sized,
    {
        let policy = &self.config.handshake;

        exchange(transport, Command::CapdacLevel(self.capdac), policy, pacer)?;
        exchange(
            transport,
            Command::SampleCount(self.sample_count),
            policy,
            pacer,
        )?;
        exchange(transport, Command::StartTrigger, policy, pacer)?;
        info!(
            "acquisition started: samples={}, capdac={}, expecting {} bytes",
            self.sample_count,
            self.capdac,
            self.expected_bytes()
        );

        let buffer = read_exact(transport, self.expected_bytes(), &self.config.read, pacer)?;
        let result = self.decode_buffer(buffer);
        info!(
            "acquisition finished: {} samples from {} bytes",
            result.samples.len(),
            result.bytes_received
        );
        Ok(result)
    }

    /// Decode a bulk buffer received for this session.
    pub fn decode_buffer(&self, buffer: Vec<u8>) -> AcquisitionResult {
        let bytes_received = buffer.len();
        let trailing_bytes = bytes_received % FRAME_SIZE;
        if trailing_bytes != 0 {
            warn!(
                "possible data loss: {} bytes is {:.3} frames, dropping {} trailing bytes",
                bytes_received,
                bytes_received as f64 / FRAME_SIZE as f64,
                trailing_bytes
            );
        }

        let samples = decode(&buffer, self.capdac);
        debug!("decoded {} frames", samples.len());

        AcquisitionResult {
            samples,
            bytes_received,
            whole_frames: trailing_bytes == 0,
            trailing_bytes,
            sample_count: self.sample_count,
            metadata: self.metadata(),
        }
    }
}

/// Open the serial port and run a full blocking session on it.
///
/// The port is closed on return, whether the session succeeded or not.
pub fn acquire(settings: &SerialSettings, config: SessionConfig) -> Result<AcquisitionResult> {
    let session = AcquisitionSession::new(config)?;
    let mut transport = SerialTransport::open(settings)?;
    session.run(&mut transport, &mut ThreadPacer)
}

/// [`acquire`] on tokio's blocking pool, for async hosts.
pub async fn acquire_async(
    settings: SerialSettings,
    config: SessionConfig,
) -> Result<AcquisitionResult> {
    tokio::task::spawn_blocking(move || acquire(&settings, config))
        .await
        .map_err(|e| DriverError::Io(std::io::Error::other(e)))?
}
