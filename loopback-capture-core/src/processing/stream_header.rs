//! Binary stream header written before any PCM data.
//!
//! The consumer reads it to configure its playback graph.

use crate::models::format::{AudioFormatDescriptor, SampleEncoding};

/// Size of the stream header in bytes.
pub const STREAM_HEADER_SIZE: usize = 12;

/// Fixed-size stream header.
///
/// Layout (little-endian, packed):
/// ```text
/// [0-3]    sample_rate      u32
/// [4-5]    channels         u16
/// [6-7]    bits_per_sample  u16
/// [8-11]   format_tag       u32   1 = integer PCM, 3 = IEEE float
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHeader {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub format_tag: u32,
}

impl StreamHeader {
    pub fn to_bytes(&self) -> [u8; STREAM_HEADER_SIZE] {
        let mut header = [0u8; STREAM_HEADER_SIZE];
        header[0..4].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[4..6].copy_from_slice(&self.channels.to_le_bytes());
        header[6..8].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        header[8..12].copy_from_slice(&self.format_tag.to_le_bytes());
        header
    }

    /// Decode a header from the first 12 bytes of a stream.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..STREAM_HEADER_SIZE)?;
        Some(Self {
            sample_rate: u32::from_le_bytes([header[0], header[1], header[2], header[3]]),
            channels: u16::from_le_bytes([header[4], header[5]]),
            bits_per_sample: u16::from_le_bytes([header[6], header[7]]),
            format_tag: u32::from_le_bytes([header[8], header[9], header[10], header[11]]),
        })
    }

    pub fn descriptor(&self) -> AudioFormatDescriptor {
        AudioFormatDescriptor {
            sample_rate: self.sample_rate,
            channels: self.channels,
            bits_per_sample: self.bits_per_sample,
            encoding: SampleEncoding::from_tag(self.format_tag),
        }
    }
}

impl From<&AudioFormatDescriptor> for StreamHeader {
    fn from(descriptor: &AudioFormatDescriptor) -> Self {
        Self {
            sample_rate: descriptor.sample_rate,
            channels: descriptor.channels,
            bits_per_sample: descriptor.bits_per_sample,
            format_tag: descriptor.encoding.tag(),
        }
    }
}
