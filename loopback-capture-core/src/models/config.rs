use std::time::Duration;

use super::activation::{ActivationRequest, LoopbackMode};
use super::error::CaptureError;

/// Usage line printed when the command line cannot be parsed.
pub const USAGE: &str = "Usage: audio-capture <PID-to-exclude> [--include]";

/// Configuration for a loopback capture run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfiguration {
    /// Process whose audio session tree is excluded (or, with
    /// `IncludeTargetProcessTree`, the only one captured).
    pub target_process_id: u32,

    /// Default: `ExcludeTargetProcessTree`.
    pub loopback_mode: LoopbackMode,

    /// Bounded wait on the capture event before re-checking shutdown (default: 100ms).
    pub wait_timeout: Duration,

    /// Size of the reusable zero buffer used for silent packets (default: 8 KiB).
    pub silence_chunk_bytes: usize,
}

impl CaptureConfiguration {
    /// Parse the command line (without the program name).
    ///
    /// Accepts one decimal PID and an optional `--include` flag.
    pub fn from_args<I, S>(args: I) -> Result<Self, CaptureError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pid = None;
        let mut mode = LoopbackMode::ExcludeTargetProcessTree;

        for arg in args {
            let arg = arg.as_ref();
            match arg {
                "--include" => mode = LoopbackMode::IncludeTargetProcessTree,
                flag if flag.starts_with('-') => {
                    return Err(CaptureError::Usage(format!("unknown option '{}'\n{}", flag, USAGE)));
                }
                value if pid.is_none() => {
                    let parsed = value
                        .parse::<u32>()
                        .map_err(|_| CaptureError::Usage(format!("invalid PID '{}'\n{}", value, USAGE)))?;
                    pid = Some(parsed);
                }
                extra => {
                    return Err(CaptureError::Usage(format!("unexpected argument '{}'\n{}", extra, USAGE)));
                }
            }
        }

        let target_process_id = pid.ok_or_else(|| CaptureError::Usage(USAGE.to_string()))?;
        let config = Self {
            target_process_id,
            loopback_mode: mode,
            ..Self::default()
        };
        config.validate().map_err(CaptureError::Usage)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.wait_timeout.is_zero() || self.wait_timeout > Duration::from_secs(1) {
            return Err(format!("wait timeout out of range: {:?}", self.wait_timeout));
        }
        if self.silence_chunk_bytes == 0 {
            return Err("silence chunk size must be positive".into());
        }
        Ok(())
    }

    pub fn activation_request(&self) -> ActivationRequest {
        ActivationRequest::new(self.target_process_id, self.loopback_mode)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            target_process_id: 0,
            loopback_mode: LoopbackMode::ExcludeTargetProcessTree,
            wait_timeout: Duration::from_millis(100),
            silence_chunk_bytes: 8192,
        }
    }
}
