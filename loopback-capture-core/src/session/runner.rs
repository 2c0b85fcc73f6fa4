use std::io::Write;

use crate::models::config::CaptureConfiguration;
use crate::models::diagnostics::CaptureDiagnostics;
use crate::models::error::CaptureError;
use crate::processing::negotiator::{negotiate_format, NegotiatedFormat};
use crate::processing::stream_header::StreamHeader;
use crate::processing::stream_writer::StreamWriter;
use crate::session::capture_loop::{CaptureLoop, LoopExit};
use crate::session::shutdown::ShutdownSignal;
use crate::traits::capture_endpoint::CaptureEndpoint;
use crate::traits::endpoint_activator::EndpointActivator;

/// Outcome of a capture session that got as far as streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSummary {
    pub exit: LoopExit,
    pub format: NegotiatedFormat,
    pub diagnostics: CaptureDiagnostics,
}

/// Run one capture session end to end.
///
/// Sequence:
/// 1. Activate the process-loopback endpoint
/// 2. Negotiate the stream format (falling back on `E_NOTIMPL`)
/// 3. Initialize the endpoint for event-driven loopback capture
/// 4. Write the 12-byte stream header
/// 5. Start, then run the capture loop until shutdown or disconnect
/// 6. Stop the endpoint and release it
///
/// Any error before step 5 is fatal. The endpoint is released on every path.
pub fn run_capture<A, W>(
    activator: &mut A,
    config: &CaptureConfiguration,
    output: W,
    shutdown: &ShutdownSignal,
) -> Result<CaptureSummary, CaptureError>
where
    A: EndpointActivator,
    W: Write,
{
    config.validate().map_err(CaptureError::Usage)?;

    let request = config.activation_request();
    log::info!("Activating process loopback ({})", request);

    let mut endpoint = activator.activate(&request)?;
    let format = negotiate_format(&endpoint)?;
    endpoint.initialize(&format)?;

    let mut writer = StreamWriter::new(output, config.silence_chunk_bytes, format.frame_size());
    writer.write_header(&StreamHeader::from(&format.descriptor))?;

    endpoint.start()?;
    log::info!("Capture started ({})", request);

    let mut capture = CaptureLoop::new(shutdown.clone(), config.wait_timeout, format.frame_size());
    let exit = capture.run(&mut endpoint, &mut writer);

    log::info!("Stopping capture");
    if let Err(status) = endpoint.stop() {
        log::warn!("Stop failed: {}", status);
    }
    drop(endpoint);

    let diagnostics = capture.diagnostics();
    log::info!("Capture stopped: {}", diagnostics);

    Ok(CaptureSummary {
        exit,
        format,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockActivator, MockCall, MockEvent, MockOutput, MockPacket, MockScript};
    use crate::models::error::{InitStage, PlatformStatus};
    use crate::processing::stream_header::STREAM_HEADER_SIZE;
    use std::time::Duration;

    fn config() -> CaptureConfiguration {
        CaptureConfiguration::from_args(["1234"]).unwrap()
    }

    #[test]
    fn header_precedes_samples() {
        let shutdown = ShutdownSignal::new();
        let script = MockScript::default()
            .shutdown_when_exhausted(shutdown.clone())
            .event(MockEvent::Signal(vec![MockPacket::audio(vec![0x11; 16], 8)]));
        let mut activator = MockActivator::new(script);
        let mut output = MockOutput::unbounded();

        let summary = run_capture(&mut activator, &config(), &mut output, &shutdown).unwrap();

        assert_eq!(summary.exit, LoopExit::ShutdownRequested);
        let bytes = output.bytes();
        assert_eq!(bytes.len(), STREAM_HEADER_SIZE + 16);
        assert_eq!(StreamHeader::from_bytes(bytes).unwrap(), StreamHeader::from(&summary.format.descriptor));
        assert!(bytes[STREAM_HEADER_SIZE..].iter().all(|&b| b == 0x11));
    }

    fn waits(calls: &[MockCall]) -> Vec<Duration> {
        calls
            .iter()
            .filter_map(|c| match c {
                MockCall::Wait(timeout) => Some(*timeout),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn every_wait_is_bounded_by_100ms() {
        let shutdown = ShutdownSignal::new();
        let script = MockScript::default()
            .shutdown_when_exhausted(shutdown.clone())
            .event(MockEvent::Timeout)
            .event(MockEvent::Signal(vec![MockPacket::audio(vec![0x22; 8], 8)]))
            .event(MockEvent::Timeout);
        let mut activator = MockActivator::new(script);
        let log = activator.log();

        run_capture(&mut activator, &config(), MockOutput::unbounded(), &shutdown).unwrap();

        let waits = waits(&log.calls());
        assert_eq!(waits.len(), 4);
        assert!(waits.iter().all(|&t| t == Duration::from_millis(100)));
    }

    #[test]
    fn configured_wait_timeout_reaches_endpoint() {
        let shutdown = ShutdownSignal::new();
        let script = MockScript::default()
            .shutdown_when_exhausted(shutdown.clone())
            .event(MockEvent::Timeout);
        let mut activator = MockActivator::new(script);
        let log = activator.log();
        let mut config = config();
        config.wait_timeout = Duration::from_millis(25);

        run_capture(&mut activator, &config, MockOutput::unbounded(), &shutdown).unwrap();

        assert_eq!(waits(&log.calls()), vec![Duration::from_millis(25); 2]);
    }

    #[test]
    fn teardown_stops_then_releases() {
        let shutdown = ShutdownSignal::new();
        let script = MockScript::default().shutdown_when_exhausted(shutdown.clone());
        let mut activator = MockActivator::new(script);
        let log = activator.log();

        run_capture(&mut activator, &config(), MockOutput::unbounded(), &shutdown).unwrap();

        let calls = log.calls();
        let tail = &calls[calls.len() - 2..];
        assert_eq!(tail, &[MockCall::Stop, MockCall::Dropped]);
    }

    #[test]
    fn initialization_failure_releases_endpoint_without_writing() {
        let shutdown = ShutdownSignal::new();
        let mut script = MockScript::default();
        script.initialize = Err(CaptureError::InitializationFailed {
            stage: InitStage::EventBinding,
            status: PlatformStatus::E_FAIL,
        });
        let mut activator = MockActivator::new(script);
        let log = activator.log();
        let mut output = MockOutput::unbounded();

        let err = run_capture(&mut activator, &config(), &mut output, &shutdown).unwrap_err();

        assert!(matches!(err, CaptureError::InitializationFailed { stage: InitStage::EventBinding, .. }));
        assert!(output.bytes().is_empty());
        assert_eq!(log.calls().last(), Some(&MockCall::Dropped));
        assert!(!log.calls().contains(&MockCall::Start));
    }

    #[test]
    fn header_write_failure_never_starts() {
        let shutdown = ShutdownSignal::new();
        let mut activator = MockActivator::new(MockScript::default());
        let log = activator.log();
        let mut output = MockOutput::with_capacity(6);

        let err = run_capture(&mut activator, &config(), &mut output, &shutdown).unwrap_err();

        assert!(matches!(err, CaptureError::HeaderWriteFailed(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(!log.calls().contains(&MockCall::Start));
    }

    #[test]
    fn start_failure_is_fatal() {
        let shutdown = ShutdownSignal::new();
        let mut script = MockScript::default();
        script.start = Err(CaptureError::InitializationFailed {
            stage: InitStage::Start,
            status: PlatformStatus::E_FAIL,
        });
        let mut activator = MockActivator::new(script);

        let err = run_capture(&mut activator, &config(), MockOutput::unbounded(), &shutdown).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn invalid_config_is_rejected_before_activation() {
        let shutdown = ShutdownSignal::new();
        let mut activator = MockActivator::new(MockScript::default());
        let log = activator.log();
        let mut config = config();
        config.silence_chunk_bytes = 0;

        let err = run_capture(&mut activator, &config, MockOutput::unbounded(), &shutdown).unwrap_err();
        assert!(matches!(err, CaptureError::Usage(_)));
        assert!(log.calls().is_empty());
    }
}
