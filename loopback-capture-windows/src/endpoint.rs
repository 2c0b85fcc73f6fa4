//! `IAudioClient` + `IAudioCaptureClient` capture endpoint.
//!
//! Opens the activated process-loopback client in shared mode with
//! `AUDCLNT_STREAMFLAGS_LOOPBACK | AUDCLNT_STREAMFLAGS_EVENTCALLBACK`, letting
//! the engine convert to the negotiated format. DRM-protected audio is
//! silenced by the engine.
//!
//! Handles are released in field order on drop: MMCSS registration, capture
//! client, audio client, event, then the COM apartment.

use std::ffi::c_void;
use std::ptr;
use std::slice;
use std::thread;
use std::time::Duration;

use windows::core::{w, Error, PCWSTR};
use windows::Win32::Foundation::{CloseHandle, GetLastError, HANDLE, WAIT_OBJECT_0, WAIT_TIMEOUT};
use windows::Win32::Media::Audio::{
    IAudioCaptureClient, IAudioClient, AUDCLNT_BUFFERFLAGS_DATA_DISCONTINUITY, AUDCLNT_BUFFERFLAGS_SILENT,
    AUDCLNT_E_NOT_INITIALIZED, AUDCLNT_SHAREMODE_SHARED, AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM,
    AUDCLNT_STREAMFLAGS_EVENTCALLBACK, AUDCLNT_STREAMFLAGS_LOOPBACK, AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY,
};
use windows::Win32::System::Com::CoTaskMemFree;
use windows::Win32::System::Threading::{
    AvRevertMmThreadCharacteristics, AvSetMmThreadCharacteristicsW, CreateEventW, WaitForSingleObject,
};

use loopback_capture_core::models::error::{CaptureError, InitStage, PlatformStatus};
use loopback_capture_core::models::format::WaveFormat;
use loopback_capture_core::processing::negotiator::NegotiatedFormat;
use loopback_capture_core::traits::capture_endpoint::{CaptureEndpoint, CapturePacket, PacketFlags, WaitOutcome};

use crate::com::{hresult_status, status_of, ComApartment};
use crate::wave_format::{read_wave_format, to_platform};

const STREAM_FLAGS: u32 = AUDCLNT_STREAMFLAGS_LOOPBACK
    | AUDCLNT_STREAMFLAGS_EVENTCALLBACK
    | AUDCLNT_STREAMFLAGS_AUTOCONVERTPCM
    | AUDCLNT_STREAMFLAGS_SRC_DEFAULT_QUALITY;

/// Process-loopback capture endpoint.
///
/// Confined to the thread that activated it.
pub struct WasapiProcessLoopback {
    mmcss: Option<MmcssTask>,
    capture_client: Option<IAudioCaptureClient>,
    audio_client: IAudioClient,
    event: Option<CaptureEvent>,
    frame_size: usize,
    _com: ComApartment,
}

impl WasapiProcessLoopback {
    pub(crate) fn new(audio_client: IAudioClient, com: ComApartment) -> Self {
        Self {
            mmcss: None,
            capture_client: None,
            audio_client,
            event: None,
            frame_size: 0,
            _com: com,
        }
    }

    fn capture_client(&self) -> Result<&IAudioCaptureClient, PlatformStatus> {
        self.capture_client
            .as_ref()
            .ok_or(hresult_status(AUDCLNT_E_NOT_INITIALIZED))
    }
}

impl CaptureEndpoint for WasapiProcessLoopback {
    fn mix_format(&self) -> Result<WaveFormat, PlatformStatus> {
        let mix_format_ptr = unsafe { self.audio_client.GetMixFormat() }.map_err(|e| status_of(&e))?;
        let format = unsafe { read_wave_format(mix_format_ptr) };
        unsafe { CoTaskMemFree(Some(mix_format_ptr as *const c_void)) };
        Ok(format)
    }

    fn initialize(&mut self, format: &NegotiatedFormat) -> Result<(), CaptureError> {
        let platform_format = to_platform(&format.wave_format);

        // Zero buffer duration and periodicity select the engine defaults.
        unsafe {
            self.audio_client.Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                STREAM_FLAGS,
                0,
                0,
                &platform_format.Format,
                None,
            )
        }
        .map_err(init_failed(InitStage::Initialize))?;

        let event = CaptureEvent::new().map_err(init_failed(InitStage::EventBinding))?;
        unsafe { self.audio_client.SetEventHandle(event.0) }.map_err(init_failed(InitStage::EventBinding))?;
        self.event = Some(event);

        let capture_client: IAudioCaptureClient =
            unsafe { self.audio_client.GetService() }.map_err(init_failed(InitStage::CaptureService))?;
        self.capture_client = Some(capture_client);
        self.frame_size = format.frame_size();
        Ok(())
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        unsafe { self.audio_client.Start() }.map_err(init_failed(InitStage::Start))?;

        match MmcssTask::register() {
            Ok(task) => self.mmcss = Some(task),
            Err(e) => log::warn!("MMCSS registration failed: {}", status_of(&e)),
        }
        Ok(())
    }

    fn wait_for_buffer(&mut self, timeout: Duration) -> WaitOutcome {
        let Some(event) = &self.event else {
            thread::sleep(timeout);
            return WaitOutcome::TimedOut;
        };

        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        let result = unsafe { WaitForSingleObject(event.0, millis) };
        if result == WAIT_OBJECT_0 {
            WaitOutcome::Signaled
        } else if result == WAIT_TIMEOUT {
            WaitOutcome::TimedOut
        } else {
            // WAIT_FAILED; sleep so a broken handle cannot spin the loop.
            log::warn!(
                "WaitForSingleObject failed: {}",
                hresult_status(unsafe { GetLastError() }.to_hresult())
            );
            thread::sleep(timeout);
            WaitOutcome::TimedOut
        }
    }

    fn acquire_buffer(&mut self) -> Result<Option<CapturePacket<'_>>, PlatformStatus> {
        let frame_size = self.frame_size;
        let capture_client = self.capture_client()?;

        // GetBuffer reports AUDCLNT_S_BUFFER_EMPTY as success, so check the queue first.
        let queued = unsafe { capture_client.GetNextPacketSize() }.map_err(|e| status_of(&e))?;
        if queued == 0 {
            return Ok(None);
        }

        let mut data: *mut u8 = ptr::null_mut();
        let mut frames: u32 = 0;
        let mut raw_flags: u32 = 0;
        unsafe { capture_client.GetBuffer(&mut data, &mut frames, &mut raw_flags, None, None) }
            .map_err(|e| status_of(&e))?;

        let flags = PacketFlags {
            silent: raw_flags & AUDCLNT_BUFFERFLAGS_SILENT.0 as u32 != 0,
            discontinuity: raw_flags & AUDCLNT_BUFFERFLAGS_DATA_DISCONTINUITY.0 as u32 != 0,
        };

        let byte_count = frames as usize * frame_size;
        let data: &[u8] = if flags.silent || data.is_null() || byte_count == 0 {
            &[]
        } else {
            // Valid until ReleaseBuffer, which needs `&mut self` and so cannot
            // run while the packet is borrowed.
            unsafe { slice::from_raw_parts(data, byte_count) }
        };

        Ok(Some(CapturePacket { data, frames, flags }))
    }

    fn release_buffer(&mut self, frames: u32) -> Result<(), PlatformStatus> {
        let capture_client = self.capture_client()?;
        unsafe { capture_client.ReleaseBuffer(frames) }.map_err(|e| status_of(&e))
    }

    fn stop(&mut self) -> Result<(), PlatformStatus> {
        self.mmcss = None;
        unsafe { self.audio_client.Stop() }.map_err(|e| status_of(&e))
    }
}

fn init_failed(stage: InitStage) -> impl Fn(Error) -> CaptureError {
    move |e| CaptureError::InitializationFailed {
        stage,
        status: status_of(&e),
    }
}

/// Auto-reset event the engine signals when a capture packet is ready.
struct CaptureEvent(HANDLE);

impl CaptureEvent {
    fn new() -> windows::core::Result<Self> {
        unsafe { CreateEventW(None, false, false, PCWSTR::null()) }.map(Self)
    }
}

impl Drop for CaptureEvent {
    fn drop(&mut self) {
        if let Err(e) = unsafe { CloseHandle(self.0) } {
            log::warn!("CloseHandle failed: {}", e);
        }
    }
}

/// "Pro Audio" multimedia class scheduler registration for the calling thread.
struct MmcssTask(HANDLE);

impl MmcssTask {
    fn register() -> windows::core::Result<Self> {
        let mut task_index: u32 = 0;
        unsafe { AvSetMmThreadCharacteristicsW(w!("Pro Audio"), &mut task_index) }.map(Self)
    }
}

impl Drop for MmcssTask {
    fn drop(&mut self) {
        if let Err(e) = unsafe { AvRevertMmThreadCharacteristics(self.0) } {
            log::debug!("AvRevertMmThreadCharacteristics failed: {}", e);
        }
    }
}
