//! Console control handler (Ctrl+C, Ctrl+Break, close, logoff, shutdown).
//!
//! The OS runs the handler on its own thread; it only clears the shared
//! shutdown signal and returns, leaving teardown to the capture thread.

use std::sync::OnceLock;

use windows::core::BOOL;
use windows::Win32::System::Console::SetConsoleCtrlHandler;

use loopback_capture_core::models::error::PlatformStatus;
use loopback_capture_core::session::shutdown::ShutdownSignal;

use crate::com::status_of;

static SHUTDOWN: OnceLock<ShutdownSignal> = OnceLock::new();

/// Route every console control event to `shutdown`.
///
/// Only the first installed signal is used; later calls keep the existing
/// handler.
pub fn install_ctrl_handler(shutdown: &ShutdownSignal) -> Result<(), PlatformStatus> {
    if SHUTDOWN.set(shutdown.clone()).is_err() {
        log::debug!("Console control handler already installed");
        return Ok(());
    }
    unsafe { SetConsoleCtrlHandler(Some(on_console_control), true) }.map_err(|e| status_of(&e))
}

unsafe extern "system" fn on_console_control(ctrl_type: u32) -> BOOL {
    if let Some(shutdown) = SHUTDOWN.get() {
        shutdown.request_shutdown();
    }
    log::info!("Console control event {}, stopping", ctrl_type);
    BOOL::from(true)
}
