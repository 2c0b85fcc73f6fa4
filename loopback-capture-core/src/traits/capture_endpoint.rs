use std::time::Duration;

use crate::models::error::{CaptureError, PlatformStatus};
use crate::models::format::WaveFormat;
use crate::processing::negotiator::NegotiatedFormat;

/// Result of a bounded wait on the capture-ready event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Signaled,
    TimedOut,
}

/// Platform flags attached to a capture packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketFlags {
    /// Contents are not meaningful and must be treated as silence.
    pub silent: bool,
    pub discontinuity: bool,
}

/// One buffer of captured frames, borrowed from the endpoint until released.
///
/// `data` holds `frames * frame_size` bytes, except for silent packets where
/// it may be empty.
#[derive(Debug)]
pub struct CapturePacket<'a> {
    pub data: &'a [u8],
    pub frames: u32,
    pub flags: PacketFlags,
}

/// A loopback capture endpoint, exclusively owned by the control thread.
///
/// Implemented by:
/// - `WasapiProcessLoopback` (Windows)
/// - `MockEndpoint` (tests)
pub trait CaptureEndpoint {
    /// Query the endpoint's shared-mode mix format.
    ///
    /// Process-loopback endpoints may answer `E_NOTIMPL`.
    fn mix_format(&self) -> Result<WaveFormat, PlatformStatus>;

    /// Initialize for shared-mode, event-driven loopback capture in `format`,
    /// bind the capture-ready event and acquire the capture interface.
    fn initialize(&mut self, format: &NegotiatedFormat) -> Result<(), CaptureError>;

    fn start(&mut self) -> Result<(), CaptureError>;

    /// Block until a capture buffer is ready or `timeout` elapses.
    fn wait_for_buffer(&mut self, timeout: Duration) -> WaitOutcome;

    /// Fetch the next queued packet; `Ok(None)` when the queue is empty.
    ///
    /// Every packet returned must be handed back with `release_buffer`.
    fn acquire_buffer(&mut self) -> Result<Option<CapturePacket<'_>>, PlatformStatus>;

    fn release_buffer(&mut self, frames: u32) -> Result<(), PlatformStatus>;

    fn stop(&mut self) -> Result<(), PlatformStatus>;
}
