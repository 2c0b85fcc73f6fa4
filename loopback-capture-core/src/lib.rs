//! # loopback-capture-core
//!
//! Platform-agnostic core of the process-loopback capture engine.
//!
//! Negotiates the stream format, runs the event-driven capture loop, and
//! emits the binary PCM stream protocol. Platform backends (Windows WASAPI)
//! implement `EndpointActivator` and `CaptureEndpoint` and plug into
//! `run_capture`.
//!
//! ## Architecture
//!
//! ```text
//! loopback-capture-core (this crate)
//! ├── traits/       ← EndpointActivator, CaptureEndpoint
//! ├── models/       ← CaptureError, CaptureConfiguration, ActivationRequest, formats, LoopState
//! ├── processing/   ← format negotiation, StreamHeader, StreamWriter
//! ├── session/      ← CaptureLoop, run_capture, ShutdownSignal, CompletionSlot
//! └── mock          ← scripted endpoint for tests (`test-util` feature)
//! ```
//!
//! ## Stream protocol
//!
//! ```text
//! [0-11]  StreamHeader: sample_rate u32 | channels u16 | bits_per_sample u16 | format_tag u32
//! [12..]  raw interleaved frames, no framing
//! ```

#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::activation::{ActivationRequest, LoopbackMode};
pub use models::config::{CaptureConfiguration, USAGE};
pub use models::diagnostics::CaptureDiagnostics;
pub use models::error::{CaptureError, InitStage, PlatformStatus};
pub use models::format::{AudioFormatDescriptor, ExtensibleFormat, SampleEncoding, SubFormat, WaveFormat};
pub use models::state::LoopState;
pub use processing::negotiator::{negotiate_format, NegotiatedFormat};
pub use processing::stream_header::{StreamHeader, STREAM_HEADER_SIZE};
pub use processing::stream_writer::StreamWriter;
pub use session::capture_loop::{CaptureLoop, LoopExit};
pub use session::completion::CompletionSlot;
pub use session::runner::{run_capture, CaptureSummary};
pub use session::shutdown::ShutdownSignal;
pub use traits::capture_endpoint::{CaptureEndpoint, CapturePacket, PacketFlags, WaitOutcome};
pub use traits::endpoint_activator::EndpointActivator;
