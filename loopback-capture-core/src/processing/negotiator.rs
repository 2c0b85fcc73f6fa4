use crate::models::error::CaptureError;
use crate::models::format::{AudioFormatDescriptor, WaveFormat};
use crate::traits::capture_endpoint::CaptureEndpoint;

/// The format a capture session is initialized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    /// Passed to the endpoint's initialize call.
    pub wave_format: WaveFormat,
    /// What the stream header reports and frame sizes derive from.
    pub descriptor: AudioFormatDescriptor,
    pub is_fallback: bool,
}

impl NegotiatedFormat {
    pub fn frame_size(&self) -> usize {
        self.descriptor.frame_size()
    }
}

/// Resolve the stream format for `endpoint`.
///
/// Uses the mix format when the endpoint reports one. `E_NOTIMPL` selects the
/// 48 kHz stereo float fallback; any other failure is `FormatQueryFailed`.
pub fn negotiate_format<E: CaptureEndpoint + ?Sized>(endpoint: &E) -> Result<NegotiatedFormat, CaptureError> {
    let (wave_format, is_fallback) = match endpoint.mix_format() {
        Ok(format) => (format, false),
        Err(status) if status.is_not_implemented() => {
            log::warn!("GetMixFormat returned {}, using fallback 48kHz/stereo/float32", status);
            (WaveFormat::fallback(), true)
        }
        Err(status) => return Err(CaptureError::FormatQueryFailed { status }),
    };

    let descriptor = wave_format.descriptor()?;
    log::info!(
        "Format: {}{}",
        descriptor,
        if is_fallback { " (fallback)" } else { "" }
    );

    Ok(NegotiatedFormat {
        wave_format,
        descriptor,
        is_fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCall, MockEndpoint, MockScript};
    use crate::models::error::PlatformStatus;
    use crate::models::format::{SampleEncoding, WAVE_FORMAT_PCM};

    #[test]
    fn uses_mix_format_when_available() {
        let mix = WaveFormat {
            format_tag: WAVE_FORMAT_PCM,
            channels: 2,
            samples_per_sec: 44_100,
            avg_bytes_per_sec: 176_400,
            block_align: 4,
            bits_per_sample: 16,
            extensible: None,
        };
        let endpoint = MockEndpoint::new(MockScript::with_mix_format(Ok(mix)));

        let negotiated = negotiate_format(&endpoint).unwrap();
        assert!(!negotiated.is_fallback);
        assert_eq!(negotiated.wave_format, mix);
        assert_eq!(negotiated.descriptor.encoding, SampleEncoding::Pcm);
        assert_eq!(negotiated.frame_size(), 4);
    }

    #[test]
    fn not_implemented_falls_back() {
        let endpoint = MockEndpoint::new(MockScript::with_mix_format(Err(PlatformStatus::E_NOTIMPL)));

        let negotiated = negotiate_format(&endpoint).unwrap();
        assert!(negotiated.is_fallback);
        assert_eq!(negotiated.wave_format, WaveFormat::fallback());
        assert_eq!(negotiated.descriptor.sample_rate, 48_000);
        assert_eq!(negotiated.descriptor.channels, 2);
        assert_eq!(negotiated.descriptor.bits_per_sample, 32);
        assert_eq!(negotiated.descriptor.encoding, SampleEncoding::IeeeFloat);
    }

    #[test]
    fn other_failures_propagate() {
        for status in [PlatformStatus::E_FAIL, PlatformStatus::E_ACCESSDENIED] {
            let endpoint = MockEndpoint::new(MockScript::with_mix_format(Err(status)));
            assert_eq!(negotiate_format(&endpoint), Err(CaptureError::FormatQueryFailed { status }));
            assert_eq!(endpoint.log().calls(), vec![MockCall::MixFormat]);
        }
    }
}
