use std::fmt;
use std::io;
use thiserror::Error;

/// Which half of a command exchange an acknowledgment belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckPhase {
    /// Device echoes the ack code announcing the next command.
    Echo,
    /// Device reports `'O'` after acting on the command.
    Execution,
}

impl fmt::Display for AckPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckPhase::Echo => f.write_str("echo"),
            AckPhase::Execution => f.write_str("execution"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("cannot open serial port {port}: {source}")]
    TransportOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("{phase} ack mismatch: expected {expected:#04x}, received {received:#04x}")]
    ProtocolMismatch {
        phase: AckPhase,
        expected: u8,
        received: u8,
    },
    #[error("no {phase} ack {expected:#04x} after {polls} polls")]
    ProtocolTimeout {
        phase: AckPhase,
        expected: u8,
        polls: u32,
    },
    #[error("bulk read timed out: received {} of {expected} bytes", .partial.len())]
    BulkReadTimeout { expected: usize, partial: Vec<u8> },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("persistence error: {0}")]
    Persist(#[from] csv::Error),
}

impl DriverError {
    /// Bytes collected before a bulk read gave up, if this is a bulk read timeout.
    pub fn partial_data(&self) -> Option<&[u8]> {
        match self {
            DriverError::BulkReadTimeout { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// True for the timeout family (handshake or bulk read).
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            DriverError::ProtocolTimeout { .. } | DriverError::BulkReadTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
