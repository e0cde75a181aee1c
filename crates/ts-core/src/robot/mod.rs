//! Robot endpoint: two cooperating tasks over one shared touch cell.
//!
//! - **Sense** polls a [`TouchProbe`] and marks the shared flag.
//! - **Act** reads-and-resets the flag, exchanges it for a position over the
//!   channel, and drives the [`Actuator`] there.
//!
//! [`run_robot`] owns both threads. It waits for Act to finish, then signals
//! Sense to stop and joins Sense before Act.

pub mod act;
pub mod bridge;
pub mod device;
pub mod joints;
pub mod sense;
pub mod touch;

pub use act::{run_act, ActReport, ActSettings};
pub use bridge::{BridgeActuator, BridgeSensor};
pub use device::{Actuator, DeviceError, SensorSource, SimulatedActuator, SimulatedSensor};
pub use joints::JointMap;
pub use sense::{
    run_sense, RandomTouch, ScheduledTouch, SenseReport, SensorProbe, StateTouch, TouchProbe,
};
pub use touch::{SharedTouchState, TouchReading, TouchView};

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use ts_common::{Error, Position};

use crate::channel::{RobotLink, RobotTransport};
use crate::config::{Config, DeviceKind, SenseMode};
use crate::logging::{event_names, Stage};

/// How often the supervisor checks whether Act has finished.
const SUPERVISE_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq)]
pub struct RobotSettings {
    pub act: ActSettings,
    pub poll_interval: Duration,
    pub joints: JointMap,
}

impl Default for RobotSettings {
    fn default() -> Self {
        RobotSettings {
            act: ActSettings::default(),
            poll_interval: Duration::from_millis(100),
            joints: JointMap::default(),
        }
    }
}

impl RobotSettings {
    pub fn from_config(config: &Config) -> Self {
        RobotSettings {
            act: ActSettings {
                cycles: config.robot.cycles,
                probe_after_move: config.robot.probe_after_move,
                speak: config.robot.speak,
                sense_timeout: Duration::from_secs(config.channel.timeout_secs),
            },
            poll_interval: Duration::from_millis(config.sense.poll_interval_ms),
            joints: JointMap::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotReport {
    pub act: ActReport,
    pub sense: SenseReport,
}

fn task_panicked(name: &str) -> Error {
    Error::Io(std::io::Error::other(format!("{name} task panicked")))
}

/// Run Sense and Act to completion on two named threads.
pub fn run_robot<T, A, P>(
    transport: &mut T,
    actuator: &mut A,
    probe: &mut P,
    settings: &RobotSettings,
) -> Result<RobotReport, Error>
where
    T: RobotTransport + Send + ?Sized,
    A: Actuator + ?Sized,
    P: TouchProbe + ?Sized,
{
    let touch = SharedTouchState::new();
    let stop = AtomicBool::new(false);
    let parent = tracing::Span::current();

    let (touch, stop, parent) = (&touch, &stop, &parent);
    thread::scope(|scope| {
        let sense = thread::Builder::new()
            .name("ts-sense".to_string())
            .spawn_scoped(scope, move || {
                parent.in_scope(|| run_sense(probe, touch, stop, settings.poll_interval))
            })?;

        let act = thread::Builder::new()
            .name("ts-act".to_string())
            .spawn_scoped(scope, move || {
                parent.in_scope(|| {
                    run_act(transport, actuator, touch, &settings.joints, &settings.act)
                })
            });
        let act = match act {
            Ok(handle) => handle,
            Err(err) => {
                stop.store(true, Ordering::Release);
                let _ = sense.join();
                return Err(Error::Io(err));
            }
        };

        while !act.is_finished() {
            thread::sleep(SUPERVISE_INTERVAL);
        }
        stop.store(true, Ordering::Release);

        let sense_report = sense.join().map_err(|_| task_panicked("sense"))?;
        let act_report = act.join().map_err(|_| task_panicked("act"))??;
        Ok(RobotReport {
            act: act_report,
            sense: sense_report,
        })
    })
}

/// Actuator selected by `robot.device`.
pub fn build_actuator(config: &Config) -> Result<Box<dyn Actuator>, Error> {
    match config.robot.device {
        DeviceKind::Simulated => {
            let delay = Duration::from_millis(config.robot.motion_delay_ms);
            Ok(Box::new(SimulatedActuator::new().with_motion_delay(delay)))
        }
        DeviceKind::Bridge => {
            let addr = format!("{}:{}", config.robot.address, config.robot.port);
            let timeout = Duration::from_secs(config.channel.timeout_secs);
            Ok(Box::new(BridgeActuator::connect(&addr, timeout)?))
        }
    }
}

/// Touch source selected by `sense.mode`.
pub fn build_probe(config: &Config) -> Result<Box<dyn TouchProbe>, Error> {
    let sense = &config.sense;
    match sense.mode {
        SenseMode::Sensor => {
            if config.robot.device != DeviceKind::Bridge {
                return Err(Error::Configuration(
                    "sense.mode = \"sensor\" needs robot.device = \"bridge\"".to_string(),
                ));
            }
            let addr = format!("{}:{}", config.robot.address, config.robot.port);
            let timeout = Duration::from_secs(config.channel.timeout_secs);
            Ok(Box::new(SensorProbe::new(BridgeSensor::connect(&addr, timeout)?)))
        }
        SenseMode::Random => {
            let rng = match sense.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            Ok(Box::new(RandomTouch::new(sense.touch_probability, rng)))
        }
        SenseMode::State => {
            let target = Position::new(sense.target_position).ok_or_else(|| {
                Error::Configuration(format!(
                    "sense.target_position {} is not a position",
                    sense.target_position
                ))
            })?;
            Ok(Box::new(StateTouch::new(target)))
        }
        SenseMode::List => Ok(Box::new(ScheduledTouch::new(sense.touch_timesteps.iter().copied()))),
    }
}

/// Full robot endpoint: build devices, dial the decision endpoint, run.
pub fn run_endpoint(config: &Config) -> Result<RobotReport, Error> {
    let mut actuator = build_actuator(config)?;
    let mut probe = build_probe(config)?;

    let addr = config.channel.address();
    let mut link = RobotLink::connect(&addr, Duration::from_secs(config.channel.timeout_secs))?;
    crate::log_event!(
        INFO,
        event_names::CHANNEL_CONNECTED,
        Stage::Channel,
        "Connected to decision endpoint",
        addr = tracing::field::display(&addr),
        probe = probe.name(),
        device = config.robot.device.as_str(),
    );

    run_robot(&mut link, &mut actuator, &mut probe, &RobotSettings::from_config(config))
}
