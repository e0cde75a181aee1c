//! Act task: exchange one observation for one position per cycle and move there.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use ts_common::Position;

use super::device::{Actuator, DeviceError};
use super::joints::{JointMap, JOINT_NAMES, MOVE_SPEEDS, PROBE_SPEEDS};
use super::touch::SharedTouchState;
use crate::channel::{ChannelError, RobotTransport};
use crate::logging::{event_names, Stage};

pub const TOUCH_UTTERANCE: &str = "Ooh";
pub const FINISH_UTTERANCE: &str = "Moving down";

#[derive(Debug, Clone, PartialEq)]
pub struct ActSettings {
    /// Cycles to run before sending the end token.
    pub cycles: u64,
    pub probe_after_move: bool,
    pub speak: bool,
    /// Longest wait for the Sense task to observe the previous cycle.
    pub sense_timeout: Duration,
}

impl Default for ActSettings {
    fn default() -> Self {
        ActSettings {
            cycles: 60,
            probe_after_move: true,
            speak: true,
            sense_timeout: Duration::from_secs(1),
        }
    }
}

/// Counters and trajectory of one Act run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActReport {
    pub cycles_completed: u64,
    /// Touched observations sent.
    pub touches: u64,
    /// Touch writes folded into an earlier unread touch.
    pub coalesced_writes: u64,
    pub device_errors: u64,
    /// Position received in each cycle, in order.
    pub positions: Vec<Position>,
}

/// Run the Act loop for `settings.cycles` cycles, then signal the end.
///
/// Device failures abort only the current cycle. Channel failures are fatal:
/// the transport is closed and the error returned.
pub fn run_act<T, A>(
    transport: &mut T,
    actuator: &mut A,
    touch: &SharedTouchState,
    joints: &JointMap,
    settings: &ActSettings,
) -> Result<ActReport, ChannelError>
where
    T: RobotTransport + ?Sized,
    A: Actuator + ?Sized,
{
    let mut report = ActReport::default();
    let result = act_cycles(transport, actuator, touch, joints, settings, &mut report)
        .and_then(|()| finish(transport, actuator, settings, &mut report));
    transport.close();

    match &result {
        Ok(()) => crate::log_event!(
            INFO,
            event_names::ACT_FINISHED,
            Stage::Shutdown,
            "Act task finished",
            cycles = report.cycles_completed,
            touches = report.touches,
            device_errors = report.device_errors,
        ),
        Err(err) => crate::log_event!(
            ERROR,
            event_names::CHANNEL_ERROR,
            Stage::Channel,
            "Channel failed; stopping Act task",
            error = tracing::field::display(err),
            cycles = report.cycles_completed,
        ),
    }
    result.map(|()| report)
}

fn act_cycles<T, A>(
    transport: &mut T,
    actuator: &mut A,
    touch: &SharedTouchState,
    joints: &JointMap,
    settings: &ActSettings,
    report: &mut ActReport,
) -> Result<(), ChannelError>
where
    T: RobotTransport + ?Sized,
    A: Actuator + ?Sized,
{
    let mut last_position: Option<Position> = None;

    for cycle in 1..=settings.cycles {
        let span = tracing::info_span!("cycle", cycle);
        let _guard = span.enter();

        if !touch.wait_polled(cycle - 1, settings.sense_timeout) {
            crate::log_event!(
                WARN,
                event_names::ACT_SENSE_LAGGING,
                Stage::Act,
                "Sense task has not polled the previous cycle; reading anyway",
                waited_ms = settings.sense_timeout.as_millis() as u64,
            );
        }

        let reading = touch.read_and_reset();
        report.coalesced_writes += reading.writes.saturating_sub(1);
        crate::log_event!(
            DEBUG,
            event_names::ACT_READ,
            Stage::Act,
            "Touch flag read",
            touched = reading.observation.is_touched(),
            writes = reading.writes,
        );
        if reading.observation.is_touched() {
            report.touches += 1;
            if settings.speak {
                if let Err(err) = actuator.post_say(TOUCH_UTTERANCE) {
                    device_failure(report, &err);
                }
            }
        }

        transport.send_observation(reading.observation)?;
        let position = transport.receive_position()?;
        report.positions.push(position);

        let target = joints.target(position);
        match actuator.move_to(&JOINT_NAMES, &target.angles, &MOVE_SPEEDS) {
            Ok(()) => {
                last_position = Some(position);
                touch.publish(last_position, cycle);
                crate::log_event!(
                    INFO,
                    event_names::ACT_MOVED,
                    Stage::Act,
                    "Arm moved",
                    position = position.index() as u64,
                    label = tracing::field::display(position.label()),
                );
                if settings.probe_after_move {
                    for waypoint in joints.probe(position) {
                        let moved = actuator.move_to(&JOINT_NAMES, &waypoint.angles, &PROBE_SPEEDS);
                        if let Err(err) = moved {
                            device_failure(report, &err);
                            break;
                        }
                    }
                }
            }
            Err(err) => {
                // The arm stays where it was; the cycle still counts for Sense.
                touch.publish(last_position, cycle);
                device_failure(report, &err);
            }
        }
        report.cycles_completed = cycle;
    }
    Ok(())
}

fn finish<T, A>(
    transport: &mut T,
    actuator: &mut A,
    settings: &ActSettings,
    report: &mut ActReport,
) -> Result<(), ChannelError>
where
    T: RobotTransport + ?Sized,
    A: Actuator + ?Sized,
{
    if settings.speak {
        if let Err(err) = actuator.say(FINISH_UTTERANCE) {
            device_failure(report, &err);
        }
    }
    transport.send_end()
}

fn device_failure(report: &mut ActReport, err: &DeviceError) {
    report.device_errors += 1;
    crate::log_event!(
        WARN,
        event_names::ACT_DEVICE_ERROR,
        Stage::Act,
        "Device call failed; continuing",
        error = tracing::field::display(err),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::device::{ActuatorCommand, SimulatedActuator};
    use std::collections::VecDeque;
    use ts_common::Observation;

    /// Replies with a fixed position sequence and records what it was sent.
    #[derive(Default)]
    struct Replay {
        replies: VecDeque<Result<Position, ChannelError>>,
        sent: Vec<Observation>,
        ended: bool,
        closed: bool,
    }

    impl Replay {
        fn positions(ps: &[usize]) -> Self {
            Replay {
                replies: ps.iter().map(|&p| Ok(Position::new(p).unwrap())).collect(),
                ..Default::default()
            }
        }
    }

    impl RobotTransport for Replay {
        fn send_observation(&mut self, observation: Observation) -> Result<(), ChannelError> {
            self.sent.push(observation);
            Ok(())
        }

        fn receive_position(&mut self) -> Result<Position, ChannelError> {
            self.replies.pop_front().unwrap_or(Err(ChannelError::Closed))
        }

        fn send_end(&mut self) -> Result<(), ChannelError> {
            self.ended = true;
            Ok(())
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    struct FailingArm;

    impl Actuator for FailingArm {
        fn move_to(&mut self, _: &[&str], _: &[f64], _: &[f64]) -> Result<(), DeviceError> {
            Err(DeviceError::Motion("servo fault".into()))
        }
        fn say(&mut self, _: &str) -> Result<(), DeviceError> {
            Ok(())
        }
        fn post_say(&mut self, _: &str) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    fn settings(cycles: u64) -> ActSettings {
        ActSettings {
            cycles,
            probe_after_move: false,
            speak: true,
            sense_timeout: Duration::from_millis(1),
        }
    }

    #[test]
    fn runs_requested_cycles_then_ends() {
        let mut transport = Replay::positions(&[0, 1, 2]);
        let mut arm = SimulatedActuator::new();
        let log = arm.log();
        let touch = SharedTouchState::new();
        let report =
            run_act(&mut transport, &mut arm, &touch, &JointMap::default(), &settings(3)).unwrap();

        assert_eq!(report.cycles_completed, 3);
        assert_eq!(report.positions.len(), 3);
        assert_eq!(transport.sent, vec![Observation::NotTouched; 3]);
        assert!(transport.ended && transport.closed);
        assert_eq!(touch.view().cycle, 3);
        assert_eq!(touch.view().position, Position::new(2));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 4);
        assert_eq!(log[3], ActuatorCommand::Say { text: FINISH_UTTERANCE.into() });
    }

    #[test]
    fn pending_touch_is_sent_and_spoken() {
        let mut transport = Replay::positions(&[0]);
        let mut arm = SimulatedActuator::new();
        let log = arm.log();
        let touch = SharedTouchState::new();
        touch.mark_touched();
        touch.mark_touched();
        let report =
            run_act(&mut transport, &mut arm, &touch, &JointMap::default(), &settings(1)).unwrap();

        assert_eq!(transport.sent, vec![Observation::Touched]);
        assert_eq!(report.touches, 1);
        assert_eq!(report.coalesced_writes, 1);
        assert_eq!(
            log.lock().unwrap()[0],
            ActuatorCommand::PostSay {
                text: TOUCH_UTTERANCE.into()
            }
        );
    }

    #[test]
    fn probe_adds_two_moves_per_cycle() {
        let mut transport = Replay::positions(&[4, 5]);
        let mut arm = SimulatedActuator::new();
        let log = arm.log();
        let touch = SharedTouchState::new();
        let s = ActSettings {
            probe_after_move: true,
            speak: false,
            ..settings(2)
        };
        run_act(&mut transport, &mut arm, &touch, &JointMap::default(), &s).unwrap();
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 6);
        assert!(log.iter().all(|c| matches!(c, ActuatorCommand::MoveTo { .. })));
    }

    #[test]
    fn device_failure_does_not_stop_the_run() {
        let mut transport = Replay::positions(&[0, 1]);
        let touch = SharedTouchState::new();
        let report = run_act(
            &mut transport,
            &mut FailingArm,
            &touch,
            &JointMap::default(),
            &settings(2),
        )
        .unwrap();
        assert_eq!(report.cycles_completed, 2);
        assert_eq!(report.device_errors, 2);
        assert!(transport.ended);
        assert_eq!(touch.view().cycle, 2);
        assert_eq!(touch.view().position, None);
    }

    #[test]
    fn channel_failure_is_fatal_and_closes() {
        let mut transport = Replay::positions(&[0]);
        let mut arm = SimulatedActuator::new();
        let touch = SharedTouchState::new();
        let err = run_act(
            &mut transport,
            &mut arm,
            &touch,
            &JointMap::default(),
            &settings(5),
        )
        .unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
        assert!(transport.closed);
        assert!(!transport.ended);
    }
}
