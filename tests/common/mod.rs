//! Simulated transports shared by the integration tests

// Not every test file uses every helper
#![allow(dead_code)]

use std::collections::VecDeque;
use std::time::Duration;

#[allow(unused_imports)]
pub use capdac_logger::errors::{AckPhase, DriverError};
#[allow(unused_imports)]
pub use capdac_logger::{
    decode, exchange, read_exact, AcquisitionSession, Command, HandshakePolicy, NoPacer, Pacer,
    RawFrame, ReadPolicy, SessionConfig, Transport, FRAME_SIZE,
};

/// Records every pause instead of sleeping.
#[derive(Debug, Default)]
pub struct CountingPacer {
    pub pauses: Vec<Duration>,
}

impl Pacer for CountingPacer {
    fn pause(&mut self, interval: Duration) {
        self.pauses.push(interval);
    }
}

/// One scripted read outcome.
#[derive(Debug, Clone)]
pub enum Step {
    Data(Vec<u8>),
    Empty,
}

/// Plays back a fixed script of reads, one step per `read` call.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    pub reads: u32,
    pub empty_reads: u32,
    pub largest_request: usize,
    pub written: Vec<u8>,
}

impl ScriptedSource {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Deliver `data` in chunks of the given sizes, cycling through them.
    pub fn chunked(data: &[u8], sizes: &[usize]) -> Self {
        let mut steps = Vec::new();
        let mut offset = 0;
        let mut i = 0;
        while offset < data.len() {
            let size = sizes[i % sizes.len()].max(1);
            let end = (offset + size).min(data.len());
            steps.push(Step::Data(data[offset..end].to_vec()));
            offset = end;
            i += 1;
        }
        Self::new(steps)
    }
}

impl Transport for ScriptedSource {
    fn bytes_available(&mut self) -> capdac_logger::Result<usize> {
        Ok(match self.steps.front() {
            Some(Step::Data(d)) => d.len(),
            _ => 0,
        })
    }

    fn read(&mut self, buf: &mut [u8]) -> capdac_logger::Result<usize> {
        self.reads += 1;
        self.largest_request = self.largest_request.max(buf.len());
        match self.steps.pop_front() {
            Some(Step::Data(mut d)) => {
                let n = d.len().min(buf.len());
                buf[..n].copy_from_slice(&d[..n]);
                if n < d.len() {
                    d.drain(..n);
                    self.steps.push_front(Step::Data(d));
                }
                Ok(n)
            }
            Some(Step::Empty) | None => {
                self.empty_reads += 1;
                Ok(0)
            }
        }
    }

    fn write_all(&mut self, data: &[u8]) -> capdac_logger::Result<()> {
        self.written.extend_from_slice(data);
        Ok(())
    }

    fn reset_input_buffer(&mut self) -> capdac_logger::Result<()> {
        self.steps.clear();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitAck,
    AwaitPayload(u8),
}

/// Behaves like the sensor board firmware.
#[derive(Debug)]
pub struct SimDevice {
    pub stage: Stage,
    pub outbox: VecDeque<u8>,
    pub delay_left: u32,
    /// Every write call made by the host, in order.
    pub writes: Vec<Vec<u8>>,
    /// (ack code, payload) of every completed command.
    pub commands: Vec<(u8, String)>,
    /// Reply with this byte instead of echoing the ack code.
    pub wrong_echo: Option<u8>,
    /// Reply with this byte instead of 'O'.
    pub wrong_done: Option<u8>,
    /// Never answer the given ack code.
    pub mute_on: Option<u8>,
    /// Empty polls before each acknowledgment becomes readable.
    pub ack_delay_polls: u32,
    /// Bytes streamed after the start trigger.
    pub stream: Vec<u8>,
    /// Most bytes handed out per read.
    pub chunk: usize,
    /// `bytes_available` calls.
    pub polls: u32,
}

impl Default for SimDevice {
    fn default() -> Self {
        Self {
            stage: Stage::AwaitAck,
            outbox: VecDeque::new(),
            delay_left: 0,
            writes: Vec::new(),
            commands: Vec::new(),
            wrong_echo: None,
            wrong_done: None,
            mute_on: None,
            ack_delay_polls: 0,
            stream: Vec::new(),
            chunk: usize::MAX,
            polls: 0,
        }
    }
}

impl SimDevice {
    pub fn streaming(stream: Vec<u8>) -> Self {
        Self {
            stream,
            ..Self::default()
        }
    }

    pub fn written(&self) -> Vec<u8> {
        self.writes.concat()
    }

    fn reply(&mut self, byte: u8) {
        self.outbox.push_back(byte);
        self.delay_left = self.ack_delay_polls;
    }
}

impl Transport for SimDevice {
    fn bytes_available(&mut self) -> capdac_logger::Result<usize> {
        self.polls += 1;
        if self.delay_left > 0 {
            self.delay_left -= 1;
            return Ok(0);
        }
        Ok(self.outbox.len().min(self.chunk))
    }

    fn read(&mut self, buf: &mut [u8]) -> capdac_logger::Result<usize> {
        let n = buf.len().min(self.outbox.len()).min(self.chunk);
        for slot in buf.iter_mut().take(n) {
            *slot = self.outbox.pop_front().unwrap();
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> capdac_logger::Result<()> {
        self.writes.push(data.to_vec());
        match self.stage {
            Stage::AwaitAck => {
                let code = data[0];
                self.stage = Stage::AwaitPayload(code);
                if self.mute_on == Some(code) {
                    return Ok(());
                }
                let echo = self.wrong_echo.unwrap_or(code);
                self.reply(echo);
            }
            Stage::AwaitPayload(code) => {
                let payload = String::from_utf8(data.to_vec()).unwrap();
                self.stage = Stage::AwaitAck;
                let done = self.wrong_done.unwrap_or(b'O');
                self.reply(done);
                if payload == "S" {
                    let stream = std::mem::take(&mut self.stream);
                    self.outbox.extend(stream);
                }
                self.commands.push((code, payload));
            }
        }
        Ok(())
    }

    fn reset_input_buffer(&mut self) -> capdac_logger::Result<()> {
        self.outbox.clear();
        Ok(())
    }
}

/// Encode (timestamp, raw) pairs as a device stream.
pub fn frames(pairs: impl IntoIterator<Item = (u32, i32)>) -> Vec<u8> {
    pairs
        .into_iter()
        .flat_map(|(timestamp, raw)| RawFrame { timestamp, raw }.to_bytes())
        .collect()
}
