//! Scripted in-memory endpoint for exercising the capture pipeline without
//! audio hardware.
//!
//! A `MockScript` decides how activation, the format query, setup and start
//! respond, and lists the wake-ups the endpoint delivers. Every call is
//! recorded in a shared `MockLog` that outlives the endpoint, so tests can
//! check call order after the session has released it.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::activation::ActivationRequest;
use crate::models::error::{CaptureError, PlatformStatus};
use crate::models::format::WaveFormat;
use crate::processing::negotiator::NegotiatedFormat;
use crate::session::shutdown::ShutdownSignal;
use crate::traits::capture_endpoint::{CaptureEndpoint, CapturePacket, PacketFlags, WaitOutcome};
use crate::traits::endpoint_activator::EndpointActivator;

/// A call made against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Activate(ActivationRequest),
    MixFormat,
    Initialize(WaveFormat),
    Start,
    Wait(Duration),
    Acquire,
    Release(u32),
    Stop,
    Dropped,
}

/// Shared, append-only record of mock calls.
#[derive(Debug, Clone, Default)]
pub struct MockLog {
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockLog {
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &MockCall) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    fn push(&self, call: MockCall) {
        self.calls.lock().push(call);
    }
}

/// One scripted capture packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPacket {
    pub frames: u32,
    pub flags: PacketFlags,
    pub data: Vec<u8>,
}

impl MockPacket {
    /// A packet carrying `data`, which must be whole frames of `frame_size`.
    pub fn audio(data: Vec<u8>, frame_size: usize) -> Self {
        assert_eq!(data.len() % frame_size, 0, "mock packet must hold whole frames");
        Self {
            frames: (data.len() / frame_size) as u32,
            flags: PacketFlags::default(),
            data,
        }
    }

    /// A packet flagged silent. Its contents are garbage and must not be forwarded.
    pub fn silent(frames: u32) -> Self {
        Self {
            frames,
            flags: PacketFlags {
                silent: true,
                discontinuity: false,
            },
            data: vec![0xEE; 4],
        }
    }

    pub fn empty() -> Self {
        Self {
            frames: 0,
            flags: PacketFlags::default(),
            data: Vec::new(),
        }
    }
}

/// One wake-up of the capture loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEvent {
    Timeout,
    Signal(Vec<MockPacket>),
    /// Signaled, but acquiring the first buffer fails.
    SignalFailing(PlatformStatus),
}

/// How the mock endpoint behaves.
#[derive(Debug, Clone)]
pub struct MockScript {
    pub activation: Result<(), CaptureError>,
    pub mix_format: Result<WaveFormat, PlatformStatus>,
    pub initialize: Result<(), CaptureError>,
    pub start: Result<(), CaptureError>,
    pub events: Vec<MockEvent>,
    /// Requested once the scripted events run out; without it the endpoint
    /// keeps timing out.
    pub shutdown_when_exhausted: Option<ShutdownSignal>,
    /// Requested right after the given number of packets has been acquired.
    pub shutdown_after_acquires: Option<(usize, ShutdownSignal)>,
}

impl MockScript {
    pub fn with_mix_format(mix_format: Result<WaveFormat, PlatformStatus>) -> Self {
        Self {
            mix_format,
            ..Self::default()
        }
    }

    pub fn event(mut self, event: MockEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn shutdown_when_exhausted(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown_when_exhausted = Some(shutdown);
        self
    }

    pub fn shutdown_after_acquires(mut self, count: usize, shutdown: ShutdownSignal) -> Self {
        self.shutdown_after_acquires = Some((count, shutdown));
        self
    }
}

impl Default for MockScript {
    fn default() -> Self {
        Self {
            activation: Ok(()),
            mix_format: Ok(WaveFormat::fallback()),
            initialize: Ok(()),
            start: Ok(()),
            events: Vec::new(),
            shutdown_when_exhausted: None,
            shutdown_after_acquires: None,
        }
    }
}

/// Scripted `CaptureEndpoint`.
pub struct MockEndpoint {
    script: MockScript,
    events: VecDeque<MockEvent>,
    pending: VecDeque<MockPacket>,
    pending_error: Option<PlatformStatus>,
    current: Option<MockPacket>,
    acquired: usize,
    log: MockLog,
}

impl MockEndpoint {
    pub fn new(script: MockScript) -> Self {
        Self::with_log(script, MockLog::default())
    }

    pub fn with_log(script: MockScript, log: MockLog) -> Self {
        Self {
            events: script.events.iter().cloned().collect(),
            script,
            pending: VecDeque::new(),
            pending_error: None,
            current: None,
            acquired: 0,
            log,
        }
    }

    pub fn log(&self) -> MockLog {
        self.log.clone()
    }
}

impl CaptureEndpoint for MockEndpoint {
    fn mix_format(&self) -> Result<WaveFormat, PlatformStatus> {
        self.log.push(MockCall::MixFormat);
        self.script.mix_format
    }

    fn initialize(&mut self, format: &NegotiatedFormat) -> Result<(), CaptureError> {
        self.log.push(MockCall::Initialize(format.wave_format));
        self.script.initialize.clone()
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.log.push(MockCall::Start);
        self.script.start.clone()
    }

    fn wait_for_buffer(&mut self, timeout: Duration) -> WaitOutcome {
        self.log.push(MockCall::Wait(timeout));
        match self.events.pop_front() {
            Some(MockEvent::Timeout) => WaitOutcome::TimedOut,
            Some(MockEvent::Signal(packets)) => {
                self.pending = packets.into();
                WaitOutcome::Signaled
            }
            Some(MockEvent::SignalFailing(status)) => {
                self.pending_error = Some(status);
                WaitOutcome::Signaled
            }
            None => {
                if let Some(shutdown) = &self.script.shutdown_when_exhausted {
                    shutdown.request_shutdown();
                }
                WaitOutcome::TimedOut
            }
        }
    }

    fn acquire_buffer(&mut self) -> Result<Option<CapturePacket<'_>>, PlatformStatus> {
        self.log.push(MockCall::Acquire);
        if let Some(status) = self.pending_error.take() {
            return Err(status);
        }
        let Some(next) = self.pending.pop_front() else {
            return Ok(None);
        };
        self.acquired += 1;
        if let Some((count, shutdown)) = &self.script.shutdown_after_acquires {
            if self.acquired == *count {
                shutdown.request_shutdown();
            }
        }
        let packet = self.current.insert(next);
        Ok(Some(CapturePacket {
            data: &packet.data,
            frames: packet.frames,
            flags: packet.flags,
        }))
    }

    fn release_buffer(&mut self, frames: u32) -> Result<(), PlatformStatus> {
        self.log.push(MockCall::Release(frames));
        self.current = None;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlatformStatus> {
        self.log.push(MockCall::Stop);
        Ok(())
    }
}

impl Drop for MockEndpoint {
    fn drop(&mut self) {
        self.log.push(MockCall::Dropped);
    }
}

/// Scripted `EndpointActivator` handing out `MockEndpoint`s.
pub struct MockActivator {
    script: MockScript,
    log: MockLog,
}

impl MockActivator {
    pub fn new(script: MockScript) -> Self {
        Self {
            script,
            log: MockLog::default(),
        }
    }

    pub fn log(&self) -> MockLog {
        self.log.clone()
    }
}

impl EndpointActivator for MockActivator {
    type Endpoint = MockEndpoint;

    fn activate(&mut self, request: &ActivationRequest) -> Result<MockEndpoint, CaptureError> {
        self.log.push(MockCall::Activate(*request));
        self.script.activation.clone()?;
        Ok(MockEndpoint::with_log(self.script.clone(), self.log.clone()))
    }
}

/// In-memory data channel that can simulate the consumer closing its end.
#[derive(Debug, Default)]
pub struct MockOutput {
    bytes: Vec<u8>,
    capacity: Option<usize>,
}

impl MockOutput {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Accept `capacity` bytes, then fail every write with `BrokenPipe`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::new(),
            capacity: Some(capacity),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Write for MockOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let accepted = match self.capacity {
            None => buf.len(),
            Some(capacity) => {
                let room = capacity.saturating_sub(self.bytes.len());
                if room == 0 {
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "consumer closed the pipe"));
                }
                room.min(buf.len())
            }
        };
        self.bytes.extend_from_slice(&buf[..accepted]);
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
