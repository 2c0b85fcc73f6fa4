//! Conversion between the platform `WAVEFORMATEX` family and the core
//! `WaveFormat`.
//!
//! Both Win32 structs are `#[repr(packed(1))]`, so fields are always copied
//! out by value and raw pointers are read unaligned.

use windows::core::GUID;
use windows::Win32::Media::Audio::{WAVEFORMATEX, WAVEFORMATEXTENSIBLE, WAVEFORMATEXTENSIBLE_0};

use loopback_capture_core::models::format::{
    ExtensibleFormat, SubFormat, WaveFormat, EXTENSIBLE_EXTRA_BYTES, WAVE_FORMAT_EXTENSIBLE,
};

/// Copy a platform-owned format description.
///
/// # Safety
/// `ptr` must point to a valid `WAVEFORMATEX`, followed by the extension
/// block whenever the tag is `WAVE_FORMAT_EXTENSIBLE` and `cbSize` covers it.
pub unsafe fn read_wave_format(ptr: *const WAVEFORMATEX) -> WaveFormat {
    let base = ptr.read_unaligned();
    let mut format = from_base(&base);

    let cb_size = base.cbSize;
    if format.is_extensible() && cb_size >= EXTENSIBLE_EXTRA_BYTES {
        let ext = ptr.cast::<WAVEFORMATEXTENSIBLE>().read_unaligned();
        format.extensible = Some(extension_of(&ext));
    }
    format
}

/// Build the platform struct handed to `IAudioClient::Initialize`.
///
/// Non-extensible formats leave the extension zeroed with `cbSize` 0, so
/// passing `&result.Format` is valid for either shape.
pub fn to_platform(format: &WaveFormat) -> WAVEFORMATEXTENSIBLE {
    let (cb_size, valid_bits, channel_mask, sub_format) = match (format.is_extensible(), format.extensible) {
        (true, Some(ext)) => (
            EXTENSIBLE_EXTRA_BYTES,
            ext.valid_bits_per_sample,
            ext.channel_mask,
            to_guid(ext.sub_format),
        ),
        _ => (0, 0, 0, GUID::zeroed()),
    };

    WAVEFORMATEXTENSIBLE {
        Format: WAVEFORMATEX {
            wFormatTag: format.format_tag,
            nChannels: format.channels,
            nSamplesPerSec: format.samples_per_sec,
            nAvgBytesPerSec: format.avg_bytes_per_sec,
            nBlockAlign: format.block_align,
            wBitsPerSample: format.bits_per_sample,
            cbSize: cb_size,
        },
        Samples: WAVEFORMATEXTENSIBLE_0 {
            wValidBitsPerSample: valid_bits,
        },
        dwChannelMask: channel_mask,
        SubFormat: sub_format,
    }
}

fn from_base(base: &WAVEFORMATEX) -> WaveFormat {
    WaveFormat {
        format_tag: base.wFormatTag,
        channels: base.nChannels,
        samples_per_sec: base.nSamplesPerSec,
        avg_bytes_per_sec: base.nAvgBytesPerSec,
        block_align: base.nBlockAlign,
        bits_per_sample: base.wBitsPerSample,
        extensible: None,
    }
}

fn extension_of(ext: &WAVEFORMATEXTENSIBLE) -> ExtensibleFormat {
    let valid_bits_per_sample = unsafe { ext.Samples.wValidBitsPerSample };
    let sub_format = ext.SubFormat;
    ExtensibleFormat {
        valid_bits_per_sample,
        channel_mask: ext.dwChannelMask,
        sub_format: SubFormat {
            data1: sub_format.data1,
            data2: sub_format.data2,
            data3: sub_format.data3,
            data4: sub_format.data4,
        },
    }
}

fn to_guid(sub_format: SubFormat) -> GUID {
    GUID::from_values(sub_format.data1, sub_format.data2, sub_format.data3, sub_format.data4)
}
