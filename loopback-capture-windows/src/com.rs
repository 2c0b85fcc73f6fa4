//! COM apartment lifetime and HRESULT conversion.

use windows::core::{Error, HRESULT};
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_MULTITHREADED};

use loopback_capture_core::models::error::{CaptureError, InitStage, PlatformStatus};

/// Membership of the calling thread in the multithreaded apartment.
///
/// Dropping it uninitializes COM, so it must outlive every COM handle the
/// thread holds.
pub struct ComApartment {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl ComApartment {
    pub fn enter() -> Result<Self, CaptureError> {
        unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }
            .ok()
            .map_err(|e| CaptureError::InitializationFailed {
                stage: InitStage::ComRuntime,
                status: status_of(&e),
            })?;
        Ok(Self {
            _not_send: std::marker::PhantomData,
        })
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}

pub fn status_of(error: &Error) -> PlatformStatus {
    hresult_status(error.code())
}

pub fn hresult_status(hr: HRESULT) -> PlatformStatus {
    PlatformStatus(hr.0)
}
