//! Waiting between poll attempts.
//!
//! Every protocol timeout is counted in attempts, never measured on a clock.
//! Code that polls hands the interval to a [`Pacer`] and carries on, so the
//! same loops run on a blocking thread, under a simulator, or in tests with no
//! real delay.

use std::thread;
use std::time::Duration;

pub trait Pacer {
    /// Wait `interval` before the next poll.
    fn pause(&mut self, interval: Duration);
}

impl<P: Pacer + ?Sized> Pacer for &mut P {
    fn pause(&mut self, interval: Duration) {
        (**self).pause(interval)
    }
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, interval: Duration) {
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
}

/// Never waits. Useful against simulated devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacer;

impl Pacer for NoPacer {
    fn pause(&mut self, _interval: Duration) {}
}
