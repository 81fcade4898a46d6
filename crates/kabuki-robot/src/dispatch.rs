//! ---
//! kabuki_section: "04-robot-control"
//! kabuki_subsection: "module"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Robot-side command dispatch and safety interlock."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
use kabuki_link::{FrameHandler, LinkHandle};
use kabuki_metrics::DispatchMetrics;
use kabuki_proto::{classify, DriveVerb, Frame, Inbound};
use tracing::{info, warn};

use crate::interlock::{ButtonOutcome, DriveInterlock, InterlockState};
use crate::motion::MotionSink;

/// Body of the acknowledgement returned after each sensor command.
pub const ACK_BODY: &str = "[kabuki] kinect message received";

/// Robot-side interpreter.
///
/// Demultiplexes inbound frames by tag, applies the safety interlock,
/// and forwards admitted drive commands to the motion sink. Runs
/// synchronously inside the link's read loop and never blocks it.
pub struct CommandDispatcher<S> {
    interlock: DriveInterlock,
    sink: S,
    ack: bool,
    metrics: Option<DispatchMetrics>,
}

impl<S: MotionSink> CommandDispatcher<S> {
    /// Dispatcher with acknowledgements enabled and no metrics attached.
    pub fn new(sink: S) -> Self {
        Self {
            interlock: DriveInterlock::new(),
            sink,
            ack: true,
            metrics: None,
        }
    }

    /// Enable or disable `[kabuki]` acknowledgement replies.
    pub fn with_ack(mut self, ack: bool) -> Self {
        self.ack = ack;
        self
    }

    /// Attach dispatch counters.
    pub fn with_metrics(mut self, metrics: DispatchMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Current interlock position, exposed for diagnostics and tests.
    pub fn interlock_state(&self) -> InterlockState {
        self.interlock.state()
    }

    /// Apply the drive verb table to a payload and publish on success.
    ///
    /// Returns whether a velocity command was published.
    pub fn drive(&mut self, payload: &str) -> bool {
        let Some(verb) = DriveVerb::parse(payload) else {
            warn!(command = payload, "unknown command");
            self.reject("unknown_verb");
            return false;
        };
        let twist = verb.twist();
        match self.sink.publish(twist) {
            Ok(()) => {
                info!(
                    command = payload,
                    verb = verb.name(),
                    linear = twist.linear,
                    angular = twist.angular,
                    "command accepted"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.command_accepted();
                }
                true
            }
            Err(err) => {
                warn!(command = payload, error = %err, "motion sink rejected command");
                self.reject("sink_error");
                false
            }
        }
    }

    fn handle_sensor(&mut self, payload: &str, link: &LinkHandle) {
        info!(command = payload, "sensor command received");
        if payload.starts_with("button") {
            match self.interlock.press_button() {
                ButtonOutcome::Armed => info!("arm button pressed; drive commands enabled"),
                ButtonOutcome::AlreadyArmed => info!("arm button pressed again; already armed"),
                ButtonOutcome::Disarmed => {
                    info!("arm button pressed while active; interlock reset")
                }
            }
        } else if self.interlock.admits_drive() {
            if self.drive(payload) {
                self.interlock.note_drive();
            }
        } else {
            info!(command = payload, "drive command discarded; arm button required");
            self.reject("not_armed");
        }
        if self.ack {
            // ACK_BODY is far below the body bound; see the unit test.
            if let Ok(frame) = Frame::from_text(ACK_BODY) {
                link.write(frame);
            }
        }
    }

    fn reject(&self, reason: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.command_rejected(reason);
        }
    }

    fn count_frame(&self, tag: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.frame_received(tag);
        }
    }
}

impl<S: MotionSink + 'static> FrameHandler for CommandDispatcher<S> {
    fn on_frame(&mut self, frame: Frame, link: &LinkHandle) {
        let body = match frame.body_text() {
            Ok(body) => body,
            Err(err) => {
                warn!(error = %err, "non-text frame discarded");
                self.count_frame("invalid");
                return;
            }
        };
        match classify(body) {
            Inbound::Sensor(payload) => {
                self.count_frame("kinect");
                self.handle_sensor(payload, link);
            }
            Inbound::Echo(payload) => {
                self.count_frame("kabuki");
                info!(payload = payload, "kabuki echo received");
            }
            Inbound::Unknown(body) => {
                self.count_frame("unknown");
                warn!(body = body, "frame without recognized tag discarded");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::RecordingMotion;
    use anyhow::anyhow;
    use kabuki_proto::Twist;

    fn frame(body: &str) -> Frame {
        Frame::from_text(body).expect("test body within bounds")
    }

    fn feed(dispatcher: &mut CommandDispatcher<RecordingMotion>, bodies: &[&str]) {
        let link = LinkHandle::detached();
        for body in bodies {
            dispatcher.on_frame(frame(body), &link);
        }
    }

    #[test]
    fn ack_body_fits_in_a_frame() {
        assert!(Frame::from_text(ACK_BODY).is_ok());
    }

    #[test]
    fn drive_is_blocked_until_the_arm_button() {
        let recorder = RecordingMotion::new();
        let mut dispatcher = CommandDispatcher::new(recorder.clone());

        feed(&mut dispatcher, &["[kinect] left"]);
        assert_eq!(dispatcher.interlock_state(), InterlockState::Idle);
        assert!(recorder.published().is_empty());

        feed(&mut dispatcher, &["[kinect] button"]);
        assert_eq!(dispatcher.interlock_state(), InterlockState::Armed);

        feed(&mut dispatcher, &["[kinect] left"]);
        assert_eq!(dispatcher.interlock_state(), InterlockState::Active);
        assert_eq!(
            recorder.published(),
            vec![Twist {
                linear: 0.25,
                angular: 0.75
            }]
        );

        feed(&mut dispatcher, &["[kinect] button"]);
        assert_eq!(dispatcher.interlock_state(), InterlockState::Idle);
    }

    #[test]
    fn unknown_verb_fails_without_publishing() {
        let recorder = RecordingMotion::new();
        let mut dispatcher = CommandDispatcher::new(recorder.clone());

        feed(&mut dispatcher, &["[kinect] button"]);
        feed(&mut dispatcher, &["[kinect] jump"]);

        assert!(recorder.published().is_empty());
        // A failed drive does not latch the interlock forward.
        assert_eq!(dispatcher.interlock_state(), InterlockState::Armed);
    }

    #[test]
    fn untagged_and_echo_frames_never_drive() {
        let recorder = RecordingMotion::new();
        let mut dispatcher = CommandDispatcher::new(recorder.clone());

        feed(
            &mut dispatcher,
            &["[kinect] button", "[kabuki] forward", "forward"],
        );

        assert!(recorder.published().is_empty());
        assert_eq!(dispatcher.interlock_state(), InterlockState::Armed);
    }

    #[test]
    fn drive_returns_boolean_outcome() {
        let mut dispatcher = CommandDispatcher::new(RecordingMotion::new());
        assert!(dispatcher.drive("stop"));
        assert!(!dispatcher.drive("jump"));
    }

    struct FailingMotion;

    impl MotionSink for FailingMotion {
        fn publish(&mut self, _twist: Twist) -> anyhow::Result<()> {
            Err(anyhow!("actuator offline"))
        }
    }

    #[test]
    fn sink_failure_keeps_the_interlock_armed() {
        let mut dispatcher = CommandDispatcher::new(FailingMotion);
        let link = LinkHandle::detached();
        dispatcher.on_frame(frame("[kinect] button"), &link);
        dispatcher.on_frame(frame("[kinect] forward"), &link);
        assert_eq!(dispatcher.interlock_state(), InterlockState::Armed);
    }
}
