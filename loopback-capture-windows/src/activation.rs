//! Process-loopback activation through `ActivateAudioInterfaceAsync`.
//!
//! The platform completes activation on one of its own worker threads. The
//! completion handler only signals a `CompletionSlot`; the activating thread
//! blocks on it and then reads the result from the async operation.
//!
//! Handlers generated by `#[implement]` are agile and aggregate the
//! free-threaded marshaler, which this API requires.

use std::mem::size_of;
use std::sync::Arc;

use windows::core::{IUnknown, Interface, Ref, HRESULT};
use windows::Win32::Foundation::E_FAIL;
use windows::Win32::Media::Audio::{
    ActivateAudioInterfaceAsync, IActivateAudioInterfaceAsyncOperation, IActivateAudioInterfaceCompletionHandler,
    IActivateAudioInterfaceCompletionHandler_Impl, IAudioClient, AUDIOCLIENT_ACTIVATION_PARAMS,
    AUDIOCLIENT_ACTIVATION_PARAMS_0, AUDIOCLIENT_ACTIVATION_TYPE_PROCESS_LOOPBACK,
    AUDIOCLIENT_PROCESS_LOOPBACK_PARAMS, PROCESS_LOOPBACK_MODE, PROCESS_LOOPBACK_MODE_EXCLUDE_TARGET_PROCESS_TREE,
    PROCESS_LOOPBACK_MODE_INCLUDE_TARGET_PROCESS_TREE, VIRTUAL_AUDIO_DEVICE_PROCESS_LOOPBACK,
};
use windows::Win32::System::Com::StructuredStorage::PROPVARIANT;
use windows::Win32::System::Variant::VT_BLOB;
use windows_core::implement;

use loopback_capture_core::models::activation::{ActivationRequest, LoopbackMode};
use loopback_capture_core::models::error::CaptureError;
use loopback_capture_core::session::completion::CompletionSlot;
use loopback_capture_core::traits::endpoint_activator::EndpointActivator;

use crate::com::{hresult_status, status_of, ComApartment};
use crate::endpoint::WasapiProcessLoopback;

#[implement(IActivateAudioInterfaceCompletionHandler)]
struct ActivationCompletion {
    done: Arc<CompletionSlot<()>>,
}

impl IActivateAudioInterfaceCompletionHandler_Impl for ActivationCompletion_Impl {
    fn ActivateCompleted(&self, _operation: Ref<'_, IActivateAudioInterfaceAsyncOperation>) -> windows::core::Result<()> {
        self.done.complete(());
        Ok(())
    }
}

/// `PROPVARIANT` prefix for a `VT_BLOB` value: the type tag, three reserved
/// words, then the inline `BLOB`. Matches the platform layout on 32 and
/// 64-bit targets.
#[repr(C)]
struct BlobPropVariant {
    vt: u16,
    reserved: [u16; 3],
    size: u32,
    data: *mut u8,
}

/// Activates `IAudioClient`s on the process-loopback virtual device.
///
/// Each activation enters the multithreaded COM apartment on the calling
/// thread; the apartment is handed to the endpoint and left when it drops.
#[derive(Debug, Default)]
pub struct WasapiActivator;

impl WasapiActivator {
    pub fn new() -> Self {
        Self
    }
}

impl EndpointActivator for WasapiActivator {
    type Endpoint = WasapiProcessLoopback;

    fn activate(&mut self, request: &ActivationRequest) -> Result<WasapiProcessLoopback, CaptureError> {
        let com = ComApartment::enter()?;
        let audio_client = activate_process_loopback(request)?;
        log::info!("Process loopback activated ({})", request);
        Ok(WasapiProcessLoopback::new(audio_client, com))
    }
}

fn loopback_mode(mode: LoopbackMode) -> PROCESS_LOOPBACK_MODE {
    match mode {
        LoopbackMode::IncludeTargetProcessTree => PROCESS_LOOPBACK_MODE_INCLUDE_TARGET_PROCESS_TREE,
        LoopbackMode::ExcludeTargetProcessTree => PROCESS_LOOPBACK_MODE_EXCLUDE_TARGET_PROCESS_TREE,
    }
}

/// Run one activation and wait for it with no timeout.
fn activate_process_loopback(request: &ActivationRequest) -> Result<IAudioClient, CaptureError> {
    let mut params = AUDIOCLIENT_ACTIVATION_PARAMS {
        ActivationType: AUDIOCLIENT_ACTIVATION_TYPE_PROCESS_LOOPBACK,
        Anonymous: AUDIOCLIENT_ACTIVATION_PARAMS_0 {
            ProcessLoopbackParams: AUDIOCLIENT_PROCESS_LOOPBACK_PARAMS {
                TargetProcessId: request.target_process_id(),
                ProcessLoopbackMode: loopback_mode(request.mode()),
            },
        },
    };
    let blob = BlobPropVariant {
        vt: VT_BLOB.0,
        reserved: [0; 3],
        size: size_of::<AUDIOCLIENT_ACTIVATION_PARAMS>() as u32,
        data: (&mut params as *mut AUDIOCLIENT_ACTIVATION_PARAMS).cast::<u8>(),
    };
    let activation_params = (&blob as *const BlobPropVariant).cast::<PROPVARIANT>();

    let done = Arc::new(CompletionSlot::new());
    let handler: IActivateAudioInterfaceCompletionHandler = ActivationCompletion {
        done: Arc::clone(&done),
    }
    .into();

    let operation = unsafe {
        ActivateAudioInterfaceAsync(
            VIRTUAL_AUDIO_DEVICE_PROCESS_LOOPBACK,
            &IAudioClient::IID,
            Some(activation_params),
            &handler,
        )
    }
    .map_err(|e| CaptureError::ActivationFailed { status: status_of(&e) })?;

    done.wait();

    let mut result = HRESULT(0);
    let mut activated: Option<IUnknown> = None;
    unsafe { operation.GetActivateResult(&mut result, &mut activated) }
        .map_err(|e| CaptureError::ActivationFailed { status: status_of(&e) })?;

    if result.is_err() {
        return Err(CaptureError::ActivationFailed {
            status: hresult_status(result),
        });
    }
    let activated = activated.ok_or(CaptureError::ActivationFailed {
        status: hresult_status(E_FAIL),
    })?;

    activated
        .cast::<IAudioClient>()
        .map_err(|e| CaptureError::UnsupportedEndpoint { status: status_of(&e) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_prefix_fits_in_propvariant() {
        assert!(size_of::<BlobPropVariant>() <= size_of::<PROPVARIANT>());
        assert_eq!(std::mem::offset_of!(BlobPropVariant, size), 8);
    }

    #[test]
    fn loopback_modes_map_to_platform_values() {
        assert_eq!(
            loopback_mode(LoopbackMode::ExcludeTargetProcessTree),
            PROCESS_LOOPBACK_MODE_EXCLUDE_TARGET_PROCESS_TREE
        );
        assert_eq!(
            loopback_mode(LoopbackMode::IncludeTargetProcessTree).0,
            LoopbackMode::IncludeTargetProcessTree.raw()
        );
    }
}
