use std::io::Write;
use std::time::Duration;

use crate::models::diagnostics::CaptureDiagnostics;
use crate::models::error::CaptureError;
use crate::models::state::LoopState;
use crate::processing::stream_writer::StreamWriter;
use crate::session::shutdown::ShutdownSignal;
use crate::traits::capture_endpoint::{CaptureEndpoint, CapturePacket, WaitOutcome};

/// Why the capture loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    ShutdownRequested,
    ConsumerDisconnected,
}

/// Event-driven capture loop.
///
/// Waits on the endpoint's capture event with a bounded timeout, drains every
/// queued packet per wake-up, and forwards the bytes (or zeros for silent
/// packets) to the stream writer until shutdown.
pub struct CaptureLoop {
    shutdown: ShutdownSignal,
    wait_timeout: Duration,
    frame_size: usize,
    state: LoopState,
    diagnostics: CaptureDiagnostics,
}

impl CaptureLoop {
    pub fn new(shutdown: ShutdownSignal, wait_timeout: Duration, frame_size: usize) -> Self {
        Self {
            shutdown,
            wait_timeout,
            frame_size,
            state: LoopState::Running,
            diagnostics: CaptureDiagnostics::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn diagnostics(&self) -> CaptureDiagnostics {
        self.diagnostics
    }

    /// Run until the shutdown signal clears or the consumer disconnects.
    ///
    /// A write failure clears the shutdown signal itself, so no further
    /// buffers are acquired after it.
    pub fn run<E, W>(&mut self, endpoint: &mut E, writer: &mut StreamWriter<W>) -> LoopExit
    where
        E: CaptureEndpoint + ?Sized,
        W: Write,
    {
        let mut exit = LoopExit::ShutdownRequested;

        while self.shutdown.is_running() {
            if endpoint.wait_for_buffer(self.wait_timeout) == WaitOutcome::TimedOut {
                self.diagnostics.timeouts += 1;
                continue;
            }

            self.diagnostics.wake_ups += 1;
            self.transition(LoopState::Draining);

            if let Err(CaptureError::ConsumerDisconnected) = self.drain(endpoint, writer) {
                log::info!("Consumer closed the data channel");
                self.shutdown.request_shutdown();
                exit = LoopExit::ConsumerDisconnected;
            }

            if self.shutdown.is_running() {
                self.transition(LoopState::Running);
            }
        }

        self.transition(LoopState::Stopped);
        exit
    }

    /// Drain all queued packets for one wake-up.
    fn drain<E, W>(&mut self, endpoint: &mut E, writer: &mut StreamWriter<W>) -> Result<(), CaptureError>
    where
        E: CaptureEndpoint + ?Sized,
        W: Write,
    {
        while self.shutdown.is_running() {
            let packet = match endpoint.acquire_buffer() {
                Ok(Some(packet)) => packet,
                Ok(None) => break,
                Err(status) => {
                    log::warn!("GetBuffer failed: {}", status);
                    break;
                }
            };

            let frames = packet.frames;
            if frames == 0 {
                release(endpoint, 0);
                break;
            }

            let forwarded = self.forward(&packet, writer);
            release(endpoint, frames);
            forwarded?;
        }
        Ok(())
    }

    fn forward<W: Write>(&mut self, packet: &CapturePacket<'_>, writer: &mut StreamWriter<W>) -> Result<(), CaptureError> {
        let byte_count = packet.frames as usize * self.frame_size;

        self.diagnostics.packets += 1;
        self.diagnostics.frames += packet.frames as u64;
        if packet.flags.discontinuity {
            self.diagnostics.discontinuities += 1;
            log::debug!("Data discontinuity before packet of {} frames", packet.frames);
        }

        if packet.flags.silent {
            self.diagnostics.silent_packets += 1;
            self.diagnostics.silent_frames += packet.frames as u64;
            let written = writer.write_silence(byte_count, &self.shutdown)?;
            self.diagnostics.bytes_written += written as u64;
        } else {
            debug_assert_eq!(packet.data.len(), byte_count);
            writer.write_samples(packet.data)?;
            self.diagnostics.bytes_written += packet.data.len() as u64;
        }
        Ok(())
    }

    fn transition(&mut self, next: LoopState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal capture loop transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }
}

fn release<E: CaptureEndpoint + ?Sized>(endpoint: &mut E, frames: u32) {
    if let Err(status) = endpoint.release_buffer(frames) {
        log::warn!("ReleaseBuffer failed: {}", status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCall, MockEndpoint, MockEvent, MockOutput, MockPacket, MockScript};
    use crate::models::error::PlatformStatus;

    const FRAME: usize = 8;

    fn run_script(script: MockScript, output: &mut MockOutput) -> (CaptureLoop, LoopExit, Vec<MockCall>) {
        let shutdown = script
            .shutdown_when_exhausted
            .clone()
            .expect("script needs a shutdown signal");
        let mut endpoint = MockEndpoint::new(script);
        let log = endpoint.log();
        let mut writer = StreamWriter::new(output, 8192, FRAME);
        let mut capture = CaptureLoop::new(shutdown, Duration::from_millis(100), FRAME);
        let exit = capture.run(&mut endpoint, &mut writer);
        (capture, exit, log.calls())
    }

    fn script() -> MockScript {
        MockScript::default().shutdown_when_exhausted(ShutdownSignal::new())
    }

    #[test]
    fn forwards_audio_packets_in_order() {
        let script = script()
            .event(MockEvent::Signal(vec![
                MockPacket::audio(vec![1; 2 * FRAME], FRAME),
                MockPacket::audio(vec![2; 3 * FRAME], FRAME),
            ]))
            .event(MockEvent::Signal(vec![MockPacket::audio(vec![3; FRAME], FRAME)]));

        let mut output = MockOutput::unbounded();
        let (capture, exit, _) = run_script(script, &mut output);

        assert_eq!(exit, LoopExit::ShutdownRequested);
        assert_eq!(capture.state(), LoopState::Stopped);

        let mut expected = vec![1u8; 2 * FRAME];
        expected.extend(vec![2u8; 3 * FRAME]);
        expected.extend(vec![3u8; FRAME]);
        assert_eq!(output.bytes(), expected.as_slice());

        let diagnostics = capture.diagnostics();
        assert_eq!(diagnostics.packets, 3);
        assert_eq!(diagnostics.frames, 6);
        assert_eq!(diagnostics.bytes_written, 6 * FRAME as u64);
        assert_eq!(diagnostics.wake_ups, 2);
    }

    #[test]
    fn timeouts_move_no_data() {
        let script = script().event(MockEvent::Timeout).event(MockEvent::Timeout);
        let mut output = MockOutput::unbounded();
        let (capture, exit, calls) = run_script(script, &mut output);

        assert_eq!(exit, LoopExit::ShutdownRequested);
        assert!(output.bytes().is_empty());
        assert!(!calls.contains(&MockCall::Acquire));
        // two scripted timeouts plus the one that exhausts the script
        assert_eq!(capture.diagnostics().timeouts, 3);
    }

    #[test]
    fn silent_packets_become_exact_zero_runs() {
        let script = script().event(MockEvent::Signal(vec![
            MockPacket::audio(vec![9; FRAME], FRAME),
            MockPacket::silent(1500),
            MockPacket::audio(vec![7; FRAME], FRAME),
        ]));
        let mut output = MockOutput::unbounded();
        let (capture, _, _) = run_script(script, &mut output);

        let bytes = output.bytes();
        assert_eq!(bytes.len(), FRAME + 1500 * FRAME + FRAME);
        assert!(bytes[..FRAME].iter().all(|&b| b == 9));
        assert!(bytes[FRAME..FRAME + 1500 * FRAME].iter().all(|&b| b == 0));
        assert!(bytes[FRAME + 1500 * FRAME..].iter().all(|&b| b == 7));
        assert_eq!(capture.diagnostics().silent_frames, 1500);
        assert_eq!(capture.diagnostics().silent_packets, 1);
    }

    #[test]
    fn zero_frame_packet_is_released_and_ends_drain() {
        let script = script().event(MockEvent::Signal(vec![
            MockPacket::empty(),
            MockPacket::audio(vec![5; FRAME], FRAME),
        ]));
        let mut output = MockOutput::unbounded();
        let (_, _, calls) = run_script(script, &mut output);

        assert!(output.bytes().is_empty());
        let drain: Vec<_> = calls
            .iter()
            .filter(|c| matches!(c, MockCall::Acquire | MockCall::Release(_)))
            .cloned()
            .collect();
        assert_eq!(drain, vec![MockCall::Acquire, MockCall::Release(0)]);
    }

    #[test]
    fn every_acquired_packet_is_released_once() {
        let script = script().event(MockEvent::Signal(vec![
            MockPacket::audio(vec![1; 4 * FRAME], FRAME),
            MockPacket::silent(10),
            MockPacket::audio(vec![1; FRAME], FRAME),
        ]));
        let mut output = MockOutput::unbounded();
        let (_, _, calls) = run_script(script, &mut output);

        let releases: Vec<_> = calls.iter().filter(|c| matches!(c, MockCall::Release(_))).collect();
        assert_eq!(releases, vec![&MockCall::Release(4), &MockCall::Release(10), &MockCall::Release(1)]);
        // three packets plus the acquire that finds the queue empty
        assert_eq!(calls.iter().filter(|c| **c == MockCall::Acquire).count(), 4);
    }

    #[test]
    fn broken_pipe_stops_acquiring() {
        let script = script()
            .event(MockEvent::Signal(vec![
                MockPacket::audio(vec![1; FRAME], FRAME),
                MockPacket::audio(vec![2; FRAME], FRAME),
                MockPacket::audio(vec![3; FRAME], FRAME),
            ]))
            .event(MockEvent::Signal(vec![MockPacket::audio(vec![4; FRAME], FRAME)]));
        let mut output = MockOutput::with_capacity(FRAME + 3);
        let (capture, exit, calls) = run_script(script, &mut output);

        assert_eq!(exit, LoopExit::ConsumerDisconnected);
        assert_eq!(capture.state(), LoopState::Stopped);
        assert_eq!(calls.iter().filter(|c| **c == MockCall::Acquire).count(), 2);
        assert_eq!(calls.iter().filter(|c| matches!(c, MockCall::Release(_))).count(), 2);
        assert_eq!(calls.iter().filter(|c| matches!(c, MockCall::Wait(_))).count(), 1);
    }

    #[test]
    fn broken_pipe_during_silence_stops_acquiring() {
        let script = script().event(MockEvent::Signal(vec![
            MockPacket::silent(10_000),
            MockPacket::audio(vec![2; FRAME], FRAME),
        ]));
        let mut output = MockOutput::with_capacity(20_000);
        let (_, exit, calls) = run_script(script, &mut output);

        assert_eq!(exit, LoopExit::ConsumerDisconnected);
        assert_eq!(calls.iter().filter(|c| **c == MockCall::Acquire).count(), 1);
        assert_eq!(calls.last(), Some(&MockCall::Release(10_000)));
        assert_eq!(output.bytes().len(), 20_000);
    }

    #[test]
    fn shutdown_mid_drain_stops_before_next_acquire() {
        let shutdown = ShutdownSignal::new();
        let script = MockScript::default()
            .shutdown_when_exhausted(shutdown.clone())
            .shutdown_after_acquires(1, shutdown.clone())
            .event(MockEvent::Signal(vec![
                MockPacket::audio(vec![1; FRAME], FRAME),
                MockPacket::audio(vec![2; FRAME], FRAME),
                MockPacket::audio(vec![3; FRAME], FRAME),
            ]));
        let mut output = MockOutput::unbounded();
        let (capture, exit, calls) = run_script(script, &mut output);

        assert_eq!(exit, LoopExit::ShutdownRequested);
        assert_eq!(capture.state(), LoopState::Stopped);
        assert_eq!(output.bytes(), &[1u8; FRAME]);
        assert_eq!(calls.iter().filter(|c| **c == MockCall::Acquire).count(), 1);
        assert_eq!(calls.last(), Some(&MockCall::Release(1)));
    }

    #[test]
    fn acquire_error_ends_drain_but_not_capture() {
        let script = script()
            .event(MockEvent::SignalFailing(PlatformStatus::E_FAIL))
            .event(MockEvent::Signal(vec![MockPacket::audio(vec![6; FRAME], FRAME)]));
        let mut output = MockOutput::unbounded();
        let (_, exit, _) = run_script(script, &mut output);

        assert_eq!(exit, LoopExit::ShutdownRequested);
        assert_eq!(output.bytes(), &[6u8; FRAME]);
    }

    #[test]
    fn discontinuities_are_counted() {
        let mut packet = MockPacket::audio(vec![1; FRAME], FRAME);
        packet.flags.discontinuity = true;
        let script = script().event(MockEvent::Signal(vec![packet]));
        let mut output = MockOutput::unbounded();
        let (capture, _, _) = run_script(script, &mut output);

        assert_eq!(capture.diagnostics().discontinuities, 1);
        assert_eq!(output.bytes().len(), FRAME);
    }

    #[test]
    fn already_stopped_signal_skips_loop() {
        let shutdown = ShutdownSignal::new();
        shutdown.request_shutdown();
        let mut endpoint = MockEndpoint::new(MockScript::default());
        let log = endpoint.log();
        let mut writer = StreamWriter::new(Vec::new(), 8192, FRAME);
        let mut capture = CaptureLoop::new(shutdown, Duration::from_millis(100), FRAME);

        assert_eq!(capture.run(&mut endpoint, &mut writer), LoopExit::ShutdownRequested);
        assert_eq!(capture.state(), LoopState::Stopped);
        assert!(log.calls().is_empty());
    }
}
