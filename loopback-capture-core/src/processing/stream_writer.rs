use std::io::{self, Write};

use crate::models::error::CaptureError;
use crate::processing::stream_header::StreamHeader;
use crate::session::shutdown::ShutdownSignal;

/// Writes the stream header and raw interleaved frames to the data channel.
///
/// Every write is whole (write-all semantics) and flushed immediately. A write
/// that fails or makes no progress means the consumer closed its end.
pub struct StreamWriter<W: Write> {
    output: W,
    zeros: Vec<u8>,
}

impl<W: Write> StreamWriter<W> {
    /// `silence_chunk_bytes` is rounded down to whole frames (at least one).
    pub fn new(output: W, silence_chunk_bytes: usize, frame_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        let chunk = (silence_chunk_bytes - silence_chunk_bytes % frame_size).max(frame_size);
        Self {
            output,
            zeros: vec![0u8; chunk],
        }
    }

    /// Write the 12-byte header. Any failure is fatal to the session.
    pub fn write_header(&mut self, header: &StreamHeader) -> Result<(), CaptureError> {
        let bytes = header.to_bytes();
        write_flushed(&mut self.output, &bytes).map_err(|e| CaptureError::HeaderWriteFailed(e.to_string()))
    }

    /// Forward one packet's bytes unchanged.
    pub fn write_samples(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        write_flushed(&mut self.output, data).map_err(disconnected)
    }

    /// Write `byte_count` zero bytes, chunk by chunk.
    ///
    /// Stops between chunks once `shutdown` has been requested. Returns the
    /// number of zero bytes written.
    pub fn write_silence(&mut self, byte_count: usize, shutdown: &ShutdownSignal) -> Result<usize, CaptureError> {
        let mut remaining = byte_count;
        while remaining > 0 && shutdown.is_running() {
            let chunk = remaining.min(self.zeros.len());
            let zeros = &self.zeros[..chunk];
            write_flushed(&mut self.output, zeros).map_err(disconnected)?;
            remaining -= chunk;
        }
        Ok(byte_count - remaining)
    }

    pub fn silence_chunk_len(&self) -> usize {
        self.zeros.len()
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

fn write_flushed<W: Write>(output: &mut W, data: &[u8]) -> io::Result<()> {
    output.write_all(data)?;
    output.flush()
}

fn disconnected(e: io::Error) -> CaptureError {
    log::debug!("data channel write failed: {}", e);
    CaptureError::ConsumerDisconnected
}
