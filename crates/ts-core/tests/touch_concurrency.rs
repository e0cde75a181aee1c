//! Concurrency tests for the shared touch cell and the Sense/Act pair.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use ts_common::{Observation, Position};
use ts_core::channel::{ChannelError, RobotTransport};
use ts_core::robot::{
    run_robot, ActSettings, JointMap, RandomTouch, RobotSettings, SharedTouchState,
    SimulatedActuator, StateTouch,
};

#[test]
fn no_write_is_lost_or_duplicated() {
    let touch = SharedTouchState::new();
    let done = Arc::new(AtomicBool::new(false));
    let writers = 4;
    let per_writer = 2_000u64;

    let reader = {
        let touch = touch.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut seen = 0u64;
            loop {
                let finished = done.load(Ordering::Acquire);
                let r = touch.read_and_reset();
                assert_eq!(r.observation == Observation::Touched, r.writes > 0);
                seen += r.writes;
                if finished {
                    return seen;
                }
                thread::yield_now();
            }
        })
    };

    let handles: Vec<_> = (0..writers)
        .map(|_| {
            let touch = touch.clone();
            thread::spawn(move || {
                for _ in 0..per_writer {
                    touch.mark_touched();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    done.store(true, Ordering::Release);

    let seen = reader.join().unwrap();
    assert_eq!(seen, writers * per_writer);
}

/// Robot side stand-in for the decision endpoint: walks forward one position per cycle.
struct Walker {
    at: usize,
    observations: Vec<Observation>,
}

impl RobotTransport for Walker {
    fn send_observation(&mut self, observation: Observation) -> Result<(), ChannelError> {
        self.observations.push(observation);
        Ok(())
    }

    fn receive_position(&mut self) -> Result<Position, ChannelError> {
        self.at = (self.at + 1) % 8;
        Position::new(self.at).ok_or(ChannelError::Closed)
    }

    fn send_end(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    fn close(&mut self) {}
}

fn settings(cycles: u64) -> RobotSettings {
    RobotSettings {
        act: ActSettings {
            cycles,
            probe_after_move: false,
            speak: false,
            sense_timeout: Duration::from_secs(5),
        },
        poll_interval: Duration::from_millis(1),
        joints: JointMap::default(),
    }
}

#[test]
fn certain_random_touch_reaches_every_cycle() {
    let mut transport = Walker {
        at: 7,
        observations: Vec::new(),
    };
    let mut arm = SimulatedActuator::new();
    let mut probe = RandomTouch::new(1.0, StdRng::seed_from_u64(9));
    let report = run_robot(&mut transport, &mut arm, &mut probe, &settings(12)).unwrap();

    assert_eq!(transport.observations, vec![Observation::Touched; 12]);
    assert_eq!(report.act.touches, 12);
    assert!(report.sense.touches >= 12);
}

#[test]
fn impossible_random_touch_never_fires() {
    let mut transport = Walker {
        at: 7,
        observations: Vec::new(),
    };
    let mut arm = SimulatedActuator::new();
    let mut probe = RandomTouch::new(0.0, StdRng::seed_from_u64(9));
    let report = run_robot(&mut transport, &mut arm, &mut probe, &settings(10)).unwrap();
    assert!(transport.observations.iter().all(|o| *o == Observation::NotTouched));
    assert_eq!(report.sense.touches, 0);
}

#[test]
fn state_touch_only_after_visiting_the_target_zone() {
    let mut transport = Walker {
        at: 7,
        observations: Vec::new(),
    };
    let mut arm = SimulatedActuator::new().with_motion_delay(Duration::from_millis(10));
    let mut probe = StateTouch::new(Position::new(3).unwrap());
    run_robot(&mut transport, &mut arm, &mut probe, &settings(8)).unwrap();

    // the walk reaches position 3 in cycle 4; nothing can be read before cycle 5
    assert!(transport.observations[..4]
        .iter()
        .all(|o| *o == Observation::NotTouched));
    assert!(transport.observations[4..].contains(&Observation::Touched));
}
