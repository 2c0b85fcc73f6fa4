use std::fmt;

use super::error::CaptureError;

pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Bytes that `WAVEFORMATEXTENSIBLE` appends after `WAVEFORMATEX` (its `cbSize`).
pub const EXTENSIBLE_EXTRA_BYTES: u16 = 22;

pub const SPEAKER_FRONT_LEFT: u32 = 0x1;
pub const SPEAKER_FRONT_RIGHT: u32 = 0x2;

pub const FALLBACK_SAMPLE_RATE: u32 = 48_000;
pub const FALLBACK_CHANNELS: u16 = 2;
pub const FALLBACK_BITS_PER_SAMPLE: u16 = 32;

/// A `KSDATAFORMAT_SUBTYPE_*` GUID, field for field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubFormat {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl SubFormat {
    /// `{XXXXXXXX-0000-0010-8000-00AA00389B71}` with the wave format tag in `data1`.
    pub const fn from_wave_tag(tag: u32) -> Self {
        Self {
            data1: tag,
            data2: 0x0000,
            data3: 0x0010,
            data4: [0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71],
        }
    }

    pub const PCM: Self = Self::from_wave_tag(WAVE_FORMAT_PCM as u32);
    pub const IEEE_FLOAT: Self = Self::from_wave_tag(WAVE_FORMAT_IEEE_FLOAT as u32);
}

/// The extension block of `WAVEFORMATEXTENSIBLE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensibleFormat {
    pub valid_bits_per_sample: u16,
    pub channel_mask: u32,
    pub sub_format: SubFormat,
}

/// Platform-neutral copy of a `WAVEFORMATEX`, with the extensible block when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveFormat {
    pub format_tag: u16,
    pub channels: u16,
    pub samples_per_sec: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub extensible: Option<ExtensibleFormat>,
}

impl WaveFormat {
    /// 48 kHz stereo 32-bit float, in extensible form.
    ///
    /// Used when the endpoint does not implement the mix format query.
    pub fn fallback() -> Self {
        let block_align = FALLBACK_CHANNELS * (FALLBACK_BITS_PER_SAMPLE / 8);
        Self {
            format_tag: WAVE_FORMAT_EXTENSIBLE,
            channels: FALLBACK_CHANNELS,
            samples_per_sec: FALLBACK_SAMPLE_RATE,
            avg_bytes_per_sec: FALLBACK_SAMPLE_RATE * block_align as u32,
            block_align,
            bits_per_sample: FALLBACK_BITS_PER_SAMPLE,
            extensible: Some(ExtensibleFormat {
                valid_bits_per_sample: FALLBACK_BITS_PER_SAMPLE,
                channel_mask: SPEAKER_FRONT_LEFT | SPEAKER_FRONT_RIGHT,
                sub_format: SubFormat::IEEE_FLOAT,
            }),
        }
    }

    pub fn is_extensible(&self) -> bool {
        self.format_tag == WAVE_FORMAT_EXTENSIBLE
    }

    /// Unwrap the effective encoding and bit depth.
    ///
    /// Extensible formats report the sub-format tag and the valid bit depth.
    pub fn descriptor(&self) -> Result<AudioFormatDescriptor, CaptureError> {
        let (encoding, bits_per_sample) = match (self.is_extensible(), self.extensible) {
            (true, Some(ext)) => {
                let bits = if ext.valid_bits_per_sample == 0 {
                    self.bits_per_sample
                } else {
                    ext.valid_bits_per_sample
                };
                (SampleEncoding::from_tag(ext.sub_format.data1), bits)
            }
            _ => (SampleEncoding::from_tag(self.format_tag as u32), self.bits_per_sample),
        };

        let descriptor = AudioFormatDescriptor {
            sample_rate: self.samples_per_sec,
            channels: self.channels,
            bits_per_sample,
            encoding,
        };

        if descriptor.frame_size() == 0 {
            return Err(CaptureError::UnsupportedFormat {
                channels: descriptor.channels,
                bits_per_sample: descriptor.bits_per_sample,
            });
        }
        Ok(descriptor)
    }
}

/// Sample encoding as reported in the stream header's format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    Pcm,
    IeeeFloat,
    Other(u32),
}

impl SampleEncoding {
    pub fn from_tag(tag: u32) -> Self {
        match tag {
            1 => Self::Pcm,
            3 => Self::IeeeFloat,
            other => Self::Other(other),
        }
    }

    pub fn tag(self) -> u32 {
        match self {
            Self::Pcm => 1,
            Self::IeeeFloat => 3,
            Self::Other(tag) => tag,
        }
    }
}

/// The effective stream format for one capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormatDescriptor {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub encoding: SampleEncoding,
}

impl AudioFormatDescriptor {
    /// Bytes per interleaved frame: `channels * (bits_per_sample / 8)`.
    pub fn frame_size(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }
}

impl fmt::Display for AudioFormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {} ch, {} bit, tag={}",
            self.sample_rate,
            self.channels,
            self.bits_per_sample,
            self.encoding.tag()
        )
    }
}
