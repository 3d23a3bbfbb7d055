//! Capacitance logger driver with optional Python bindings.
//!
//! Talks to a microcontroller that reads an FDC1004-style capacitance sensor,
//! configures it through a two-phase acknowledgment handshake, triggers a
//! fixed-length acquisition and decodes the 8-byte frames it streams back.
//!
//! ```no_run
//! use capdac_logger::{acquire, SerialSettings, SessionConfig};
//!
//! let settings = SerialSettings::new("/dev/ttyUSB0");
//! let config = SessionConfig {
//!     capdac: 2,
//!     duration_s: 10.0,
//!     ..SessionConfig::default()
//! };
//! let result = acquire(&settings, config)?;
//! println!("{} samples", result.samples.len());
//! # Ok::<(), capdac_logger::DriverError>(())
//! ```
//!
//! # Timeouts
//!
//! Every wait is counted in poll attempts handed to a [`Pacer`]. Elapsed time
//! before a timeout is `polls x interval` and a simulated device can be driven
//! with [`NoPacer`] at full speed.

pub mod errors;
pub mod handshake;
pub mod logging;
pub mod pacing;
pub mod persist;
pub mod protocol;
pub mod reader;
pub mod session;
pub mod transport;

#[cfg(feature = "python")]
mod python;

pub use errors::*;
pub use handshake::{exchange, HandshakePolicy};
pub use pacing::{NoPacer, Pacer, ThreadPacer};
pub use protocol::{clamp_capdac, decode, Command, RawFrame, Sample, FRAME_SIZE};
pub use reader::{read_exact, ReadPolicy};
pub use session::{
    acquire, acquire_async, AcquisitionResult, AcquisitionSession, SessionConfig,
    SessionMetadata,
};
pub use transport::{SerialSettings, SerialTransport, Transport};
