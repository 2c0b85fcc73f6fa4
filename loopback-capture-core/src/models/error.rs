use std::fmt;

use thiserror::Error;

/// A 32-bit platform status code (an `HRESULT` on Windows).
///
/// Displayed as `0x%08x` so diagnostics match what platform tooling prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformStatus(pub i32);

impl PlatformStatus {
    pub const OK: Self = Self(0);
    pub const E_NOTIMPL: Self = Self(0x8000_4001_u32 as i32);
    pub const E_NOINTERFACE: Self = Self(0x8000_4002_u32 as i32);
    pub const E_FAIL: Self = Self(0x8000_4005_u32 as i32);
    pub const E_ACCESSDENIED: Self = Self(0x8007_0005_u32 as i32);

    /// Negative codes are failures; zero and positive codes are success.
    pub fn is_failure(self) -> bool {
        self.0 < 0
    }

    pub fn is_not_implemented(self) -> bool {
        self == Self::E_NOTIMPL
    }
}

impl fmt::Display for PlatformStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0 as u32)
    }
}

/// The endpoint setup step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitStage {
    ComRuntime,
    Initialize,
    EventBinding,
    CaptureService,
    Start,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ComRuntime => "COM runtime",
            Self::Initialize => "Initialize",
            Self::EventBinding => "SetEventHandle",
            Self::CaptureService => "GetService(IAudioCaptureClient)",
            Self::Start => "Start",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while setting up or running a loopback capture.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("{0}")]
    Usage(String),

    #[error("process loopback activation failed: {status}")]
    ActivationFailed { status: PlatformStatus },

    #[error("activated endpoint does not expose an audio client: {status}")]
    UnsupportedEndpoint { status: PlatformStatus },

    #[error("mix format query failed: {status}")]
    FormatQueryFailed { status: PlatformStatus },

    #[error("unsupported stream format: {channels} ch, {bits_per_sample} bit")]
    UnsupportedFormat { channels: u16, bits_per_sample: u16 },

    #[error("endpoint setup failed at {stage}: {status}")]
    InitializationFailed { stage: InitStage, status: PlatformStatus },

    #[error("failed to write stream header: {0}")]
    HeaderWriteFailed(String),

    #[error("consumer disconnected")]
    ConsumerDisconnected,

    #[error("process loopback capture is only supported on Windows")]
    PlatformUnavailable,
}

impl CaptureError {
    /// Process exit code for this outcome.
    ///
    /// A disconnected consumer is the normal end of a capture and exits 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConsumerDisconnected => 0,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_displays_as_hex() {
        assert_eq!(PlatformStatus::E_NOTIMPL.to_string(), "0x80004001");
        assert_eq!(PlatformStatus::OK.to_string(), "0x00000000");
    }

    #[test]
    fn failure_is_sign_bit() {
        assert!(PlatformStatus::E_FAIL.is_failure());
        assert!(!PlatformStatus::OK.is_failure());
        // AUDCLNT_S_BUFFER_EMPTY is a success code
        assert!(!PlatformStatus(0x0889_0001).is_failure());
    }

    #[test]
    fn only_disconnect_exits_zero() {
        assert_eq!(CaptureError::ConsumerDisconnected.exit_code(), 0);
        assert_eq!(
            CaptureError::ActivationFailed { status: PlatformStatus::E_FAIL }.exit_code(),
            1
        );
        assert_eq!(CaptureError::HeaderWriteFailed("short".into()).exit_code(), 1);
        assert_eq!(CaptureError::Usage("usage".into()).exit_code(), 1);
    }

    #[test]
    fn initialization_error_names_stage() {
        let err = CaptureError::InitializationFailed {
            stage: InitStage::EventBinding,
            status: PlatformStatus::E_FAIL,
        };
        assert_eq!(err.to_string(), "endpoint setup failed at SetEventHandle: 0x80004005");
    }
}
