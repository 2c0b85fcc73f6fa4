//! # loopback-capture-windows
//!
//! WASAPI process-loopback backend for loopback-capture-core.
//!
//! Provides:
//! - `WasapiActivator`: activates the process-loopback virtual device for a
//!   target process tree through `ActivateAudioInterfaceAsync`
//! - `WasapiProcessLoopback`: event-driven shared-mode `IAudioClient` capture
//! - `console`: console control handler feeding the shutdown signal
//! - `stdout`: binary writer on the raw standard output handle
//! - `wave_format`: `WAVEFORMATEX`/`WAVEFORMATEXTENSIBLE` conversion
//!
//! ## Platform Requirements
//! - Windows 10 21H2 (build 20348) or later for process loopback
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use loopback_capture_core::{run_capture, CaptureConfiguration, ShutdownSignal};
//! use loopback_capture_windows::{stdout::RawStdout, WasapiActivator};
//!
//! let config = CaptureConfiguration::from_args(["1234"])?;
//! let shutdown = ShutdownSignal::new();
//! let summary = run_capture(&mut WasapiActivator::new(), &config, RawStdout::new(), &shutdown)?;
//! ```

#[cfg(target_os = "windows")]
pub mod activation;
#[cfg(target_os = "windows")]
pub mod com;
#[cfg(target_os = "windows")]
pub mod console;
#[cfg(target_os = "windows")]
pub mod endpoint;
#[cfg(target_os = "windows")]
pub mod stdout;
#[cfg(target_os = "windows")]
pub mod wave_format;

#[cfg(target_os = "windows")]
pub use activation::WasapiActivator;
#[cfg(target_os = "windows")]
pub use endpoint::WasapiProcessLoopback;
