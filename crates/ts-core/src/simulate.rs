//! Both endpoints in one process over localhost TCP.
//!
//! The decision endpoint runs on the calling thread. The robot endpoint runs
//! on its own thread with simulated devices and its usual Sense/Act tasks.

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ts_common::Error;

use crate::channel::{DecisionListener, RobotLink};
use crate::config::{Config, DeviceKind, SenseMode};
use crate::control::{serve, DecisionEngine, RunHistory};
use crate::logging::{event_names, Stage};
use crate::robot::{build_probe, run_robot, RobotReport, RobotSettings, SimulatedActuator};

/// Outcome of a simulated run: the decision history and the robot counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub history: RunHistory,
    pub robot: RobotReport,
}

/// Run a full episode against the simulated robot.
///
/// `channel.port = 0` binds an ephemeral port. The robot device is always
/// simulated; `sense.mode = "sensor"` is rejected.
pub fn run_simulation(config: &Config, run_id: &str) -> Result<SimulationReport, Error> {
    if config.sense.mode == SenseMode::Sensor {
        return Err(Error::Configuration(
            "simulate needs a simulated touch source (random, state or list)".to_string(),
        ));
    }
    if config.robot.device != DeviceKind::Simulated {
        crate::log_event!(
            WARN,
            event_names::CONFIG_DEFAULT_USED,
            Stage::Init,
            "Ignoring robot.device; simulate always uses the simulated actuator",
            device = config.robot.device.as_str(),
        );
    }

    let timeout = Duration::from_secs(config.channel.timeout_secs);
    let engine = DecisionEngine::from_config(config)?.with_run_id(run_id);
    let listener = DecisionListener::bind(&config.channel.address(), timeout)?;
    let local = listener.local_addr()?;
    crate::log_event!(
        INFO,
        event_names::CHANNEL_LISTENING,
        Stage::Channel,
        "Simulation listening",
        addr = tracing::field::display(local),
    );

    let delay = Duration::from_millis(config.robot.motion_delay_ms);
    let mut actuator = SimulatedActuator::new().with_motion_delay(delay);
    let mut probe = build_probe(config)?;
    let settings = RobotSettings::from_config(config);
    // The listener backlog completes the handshake before accept().
    let mut link = RobotLink::connect(&local.to_string(), timeout)?;

    let parent = tracing::Span::current();
    thread::scope(|scope| {
        let robot = thread::Builder::new()
            .name("ts-robot".to_string())
            .spawn_scoped(scope, || {
                parent.in_scope(|| run_robot(&mut link, &mut actuator, &mut probe, &settings))
            })?;

        let decision = serve(&listener, engine);
        let robot = robot
            .join()
            .map_err(|_| Error::Io(std::io::Error::other("robot endpoint panicked")))?;

        Ok(SimulationReport {
            history: decision?,
            robot: robot?,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> Config {
        let mut cfg = Config::default();
        cfg.channel.host = "127.0.0.1".to_string();
        cfg.channel.port = 0;
        cfg.channel.timeout_secs = 5;
        cfg.robot.cycles = 10;
        cfg.robot.speak = false;
        cfg.robot.probe_after_move = false;
        cfg.sense.poll_interval_ms = 1;
        cfg.sense.touch_timesteps = vec![4, 6];
        cfg.inference.seed = Some(11);
        cfg
    }

    #[test]
    fn simulation_runs_to_the_end_token() {
        let report = run_simulation(&quick_config(), "run-test").unwrap();
        assert_eq!(report.history.steps.len(), 10);
        assert_eq!(report.robot.act.cycles_completed, 10);
        let touched: Vec<u64> = report
            .history
            .steps
            .iter()
            .filter(|s| s.observation == 1)
            .map(|s| s.cycle)
            .collect();
        assert_eq!(touched, vec![5, 7]);
        let sent: Vec<_> = report.history.steps.iter().map(|s| s.position).collect();
        assert_eq!(sent, report.robot.act.positions);
        assert_eq!(report.history.run_id.as_deref(), Some("run-test"));
    }

    #[test]
    fn sensor_mode_is_rejected() {
        let mut cfg = quick_config();
        cfg.sense.mode = SenseMode::Sensor;
        assert!(matches!(run_simulation(&cfg, "r"), Err(Error::Configuration(_))));
    }
}
