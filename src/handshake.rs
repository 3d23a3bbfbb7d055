//! Two-phase command exchange with the sensor board.

use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{AckPhase, DriverError, Result};
use crate::pacing::Pacer;
use crate::protocol::{Command, DONE_ACK};
use crate::transport::Transport;

/// Delay between acknowledgment polls
pub const ACK_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Timing of the acknowledgment wait in each phase.
///
/// A phase polls at most `max_wait_polls + 1` times, capped at `outer_timeout`
/// polls, then fails with [`DriverError::ProtocolTimeout`]. The counter starts
/// from zero again for every phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakePolicy {
    pub max_wait_polls: u32,
    pub outer_timeout: u32,
    #[serde(with = "crate::transport::duration_ms")]
    pub poll_interval: Duration,
}

impl Default for HandshakePolicy {
    fn default() -> Self {
        Self {
            max_wait_polls: 20,
            outer_timeout: 40,
            poll_interval: ACK_POLL_INTERVAL,
        }
    }
}

impl HandshakePolicy {
    /// Polls allowed before a phase times out.
    pub fn poll_budget(&self) -> u32 {
        self.max_wait_polls
            .saturating_add(1)
            .min(self.outer_timeout)
            .max(1)
    }
}

/// Send one command and wait for both of its acknowledgments.
///
/// A wrong acknowledgment byte is fatal and nothing more is written for the
/// command. Only silence is retried, by polling.
pub fn exchange<T, P>(
    transport: &mut T,
    command: Command,
    policy: &HandshakePolicy,
    pacer: &mut P,
) -> Result<()>
where
    T: Transport + ?Sized,
    P: Pacer + ?Sized,
{
    let ack = command.ack_code();

    transport.write_all(&[ack])?;
    debug!("sent ack code {} for {:?}", ack, command);
    await_ack(transport, AckPhase::Echo, ack, policy, pacer)?;

    let payload = command.payload();
    transport.write_all(payload.as_bytes())?;
    debug!("sent payload {:?}", payload);
    await_ack(transport, AckPhase::Execution, DONE_ACK, policy, pacer)?;

    debug!("{:?} acknowledged", command);
    Ok(())
}

fn await_ack<T, P>(
    transport: &mut T,
    phase: AckPhase,
    expected: u8,
    policy: &HandshakePolicy,
    pacer: &mut P,
) -> Result<()>
where
    T: Transport + ?Sized,
    P: Pacer + ?Sized,
{
    let budget = policy.poll_budget();
    let mut polls = 0u32;

    loop {
        if transport.bytes_available()? > 0 {
            let mut byte = [0u8; 1];
            if transport.read(&mut byte)? == 1 {
                if byte[0] == expected {
                    return Ok(());
                }
                warn!(
                    "{} ack mismatch: expected {:#04x}, received {:#04x}",
                    phase, expected, byte[0]
                );
                return Err(DriverError::ProtocolMismatch {
                    phase,
                    expected,
                    received: byte[0],
                });
            }
        }

        polls += 1;
        if polls >= budget {
            return Err(DriverError::ProtocolTimeout {
                phase,
                expected,
                polls,
            });
        }
        pacer.pause(policy.poll_interval);
    }
}
