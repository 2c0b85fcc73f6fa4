//! `audio-capture <PID-to-exclude> [--include]`
//!
//! Streams system audio, minus the given process tree, to stdout as a
//! 12-byte format header followed by raw interleaved PCM. Diagnostics go to
//! stderr through env_logger (`RUST_LOG`, default `info`).

use std::process::ExitCode;

use loopback_capture_core::{CaptureConfiguration, CaptureError, CaptureSummary};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match CaptureConfiguration::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(1);
        }
    };

    finish(capture(&config))
}

#[cfg(target_os = "windows")]
fn capture(config: &CaptureConfiguration) -> Result<CaptureSummary, CaptureError> {
    use loopback_capture_core::{run_capture, ShutdownSignal};
    use loopback_capture_windows::{console, stdout::RawStdout, WasapiActivator};

    let shutdown = ShutdownSignal::new();
    if let Err(status) = console::install_ctrl_handler(&shutdown) {
        log::warn!("SetConsoleCtrlHandler failed: {}", status);
    }

    run_capture(&mut WasapiActivator::new(), config, RawStdout::new(), &shutdown)
}

#[cfg(not(target_os = "windows"))]
fn capture(_config: &CaptureConfiguration) -> Result<CaptureSummary, CaptureError> {
    Err(CaptureError::PlatformUnavailable)
}

fn finish(result: Result<CaptureSummary, CaptureError>) -> ExitCode {
    match result {
        Ok(summary) => {
            log::debug!("Capture ended: {:?}", summary.exit);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = e.exit_code();
            if code == 0 {
                log::info!("{}", e);
            } else {
                log::error!("{}", e);
            }
            ExitCode::from(code as u8)
        }
    }
}
