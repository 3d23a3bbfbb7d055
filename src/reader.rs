//! Bulk read of the acquisition stream.

use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::{DriverError, Result};
use crate::pacing::Pacer;
use crate::transport::Transport;

/// Empty polls tolerated over a whole bulk read
pub const DEFAULT_MAX_EMPTY_POLLS: u32 = 40;

/// Budget for [`read_exact`].
///
/// `max_empty_polls` is a total for the whole read: receiving data does not
/// refill it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadPolicy {
    pub max_empty_polls: u32,
    #[serde(with = "crate::transport::duration_ms")]
    pub poll_interval: Duration,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            max_empty_polls: DEFAULT_MAX_EMPTY_POLLS,
            poll_interval: Duration::ZERO,
        }
    }
}

/// Read exactly `n_bytes` from the transport.
///
/// Each attempt asks for what is available, at least one byte and never more
/// than still missing. Fails with [`DriverError::BulkReadTimeout`], carrying
/// the bytes collected so far, once `max_empty_polls` attempts came back empty.
pub fn read_exact<T, P>(
    transport: &mut T,
    n_bytes: usize,
    policy: &ReadPolicy,
    pacer: &mut P,
) -> Result<Vec<u8>>
where
    T: Transport + ?Sized,
    P: Pacer + ?Sized,
{
    let mut buf = Vec::with_capacity(n_bytes);
    let mut chunk = Vec::new();
    let mut empty_polls = 0u32;

    while buf.len() < n_bytes {
        let remaining = n_bytes - buf.len();
        let want = transport.bytes_available()?.min(remaining).max(1);
        chunk.resize(want, 0);

        let got = transport.read(&mut chunk)?.min(want);
        if got == 0 {
            empty_polls += 1;
            if empty_polls >= policy.max_empty_polls {
                warn!(
                    "bulk read gave up after {} empty polls: {}/{} bytes",
                    empty_polls,
                    buf.len(),
                    n_bytes
                );
                return Err(DriverError::BulkReadTimeout {
                    expected: n_bytes,
                    partial: buf,
                });
            }
            pacer.pause(policy.poll_interval);
        } else {
            buf.extend_from_slice(&chunk[..got]);
        }
    }

    debug!(
        "bulk read complete: {} bytes, {} empty polls",
        buf.len(),
        empty_polls
    );
    Ok(buf)
}
