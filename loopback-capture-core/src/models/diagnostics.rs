use std::fmt;

/// Counters accumulated by the capture loop, logged when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureDiagnostics {
    pub wake_ups: u64,
    pub timeouts: u64,
    pub packets: u64,
    pub frames: u64,
    pub silent_packets: u64,
    pub silent_frames: u64,
    pub discontinuities: u64,
    pub bytes_written: u64,
}

impl fmt::Display for CaptureDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} packets, {} frames ({} silent), {} discontinuities, {} bytes written, {} wake-ups, {} timeouts",
            self.packets,
            self.frames,
            self.silent_frames,
            self.discontinuities,
            self.bytes_written,
            self.wake_ups,
            self.timeouts
        )
    }
}
