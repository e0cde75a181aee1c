//! Sense task: poll a touch source and mark the shared flag.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use ts_common::Position;

use super::device::{DeviceError, SensorSource};
use super::touch::{SharedTouchState, TouchView};
use crate::logging::{event_names, Stage};

/// Polls after which `state` mode starts reporting contact.
pub const STATE_DWELL_POLLS: u32 = 2;

/// One source of touch events for the Sense task.
pub trait TouchProbe: Send {
    /// One poll against the latest published view. `Ok(true)` registers contact.
    fn poll(&mut self, view: &TouchView) -> Result<bool, DeviceError>;

    fn name(&self) -> &'static str;
}

impl<P: TouchProbe + ?Sized> TouchProbe for Box<P> {
    fn poll(&mut self, view: &TouchView) -> Result<bool, DeviceError> {
        (**self).poll(view)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Hardware sensor: contact when the intensity is above zero.
pub struct SensorProbe<S> {
    sensor: S,
}

impl<S: SensorSource> SensorProbe<S> {
    pub fn new(sensor: S) -> Self {
        SensorProbe { sensor }
    }
}

impl<S: SensorSource> TouchProbe for SensorProbe<S> {
    fn poll(&mut self, _view: &TouchView) -> Result<bool, DeviceError> {
        Ok(self.sensor.read_touch_intensity()? > 0.0)
    }

    fn name(&self) -> &'static str {
        "sensor"
    }
}

/// Independent contact with probability `p` on every poll.
pub struct RandomTouch {
    rng: StdRng,
    probability: f64,
}

impl RandomTouch {
    pub fn new(probability: f64, rng: StdRng) -> Self {
        RandomTouch {
            rng,
            probability: probability.clamp(0.0, 1.0),
        }
    }
}

impl TouchProbe for RandomTouch {
    fn poll(&mut self, _view: &TouchView) -> Result<bool, DeviceError> {
        Ok(self.rng.random::<f64>() < self.probability)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Contact once the arm has been seen at the target zone for more than
/// [`STATE_DWELL_POLLS`] polls in total.
pub struct StateTouch {
    target: Position,
    dwell: u32,
}

impl StateTouch {
    pub fn new(target: Position) -> Self {
        StateTouch { target, dwell: 0 }
    }
}

impl TouchProbe for StateTouch {
    fn poll(&mut self, view: &TouchView) -> Result<bool, DeviceError> {
        let at_target = view
            .position
            .is_some_and(|p| p == self.target || p == self.target.mirror());
        if at_target {
            self.dwell = self.dwell.saturating_add(1);
        }
        Ok(at_target && self.dwell > STATE_DWELL_POLLS)
    }

    fn name(&self) -> &'static str {
        "state"
    }
}

/// Contact right after the Act task publishes one of the scripted cycles.
pub struct ScheduledTouch {
    pending: VecDeque<u64>,
    last_seen: u64,
}

impl ScheduledTouch {
    pub fn new(timesteps: impl IntoIterator<Item = u64>) -> Self {
        let mut pending: Vec<u64> = timesteps.into_iter().collect();
        pending.sort_unstable();
        pending.dedup();
        ScheduledTouch {
            pending: pending.into(),
            last_seen: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl TouchProbe for ScheduledTouch {
    fn poll(&mut self, view: &TouchView) -> Result<bool, DeviceError> {
        if view.cycle == self.last_seen {
            return Ok(false);
        }
        self.last_seen = view.cycle;

        while let Some(&next) = self.pending.front() {
            if next >= view.cycle {
                break;
            }
            self.pending.pop_front();
            crate::log_event!(
                WARN,
                event_names::SENSE_SKIPPED_TIMESTEP,
                Stage::Sense,
                "Scripted touch timestep already passed; skipping",
                timestep = next,
                cycle = view.cycle,
            );
        }

        if self.pending.front() == Some(&view.cycle) {
            self.pending.pop_front();
            return Ok(true);
        }
        Ok(false)
    }

    fn name(&self) -> &'static str {
        "list"
    }
}

/// Counters for one Sense run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseReport {
    pub polls: u64,
    pub touches: u64,
    pub device_errors: u64,
}

/// Poll until `stop` is set. The stop flag is checked after every poll.
///
/// Each poll marks the flag on contact, then acknowledges the cycle it saw so
/// a waiting Act task can read.
pub fn run_sense<P: TouchProbe + ?Sized>(
    probe: &mut P,
    touch: &SharedTouchState,
    stop: &AtomicBool,
    poll_interval: Duration,
) -> SenseReport {
    let mut report = SenseReport::default();
    crate::log_event!(
        INFO,
        event_names::SENSE_STARTED,
        Stage::Sense,
        "Sense task started",
        probe = probe.name(),
        poll_interval_ms = poll_interval.as_millis() as u64,
    );

    loop {
        let view = touch.view();
        report.polls += 1;
        match probe.poll(&view) {
            Ok(true) => {
                touch.mark_touched();
                report.touches += 1;
                crate::log_event!(
                    INFO,
                    event_names::SENSE_TOUCH,
                    Stage::Sense,
                    "Touch registered",
                    cycle = view.cycle,
                    position = view.position.map(|p| p.index() as u64),
                );
            }
            Ok(false) => {}
            Err(err) => {
                report.device_errors += 1;
                crate::log_event!(
                    WARN,
                    event_names::SENSE_DEVICE_ERROR,
                    Stage::Sense,
                    "Touch source failed",
                    error = tracing::field::display(&err),
                );
            }
        }
        touch.acknowledge(view.cycle);

        if stop.load(Ordering::Acquire) {
            break;
        }
        std::thread::sleep(poll_interval);
    }

    crate::log_event!(
        INFO,
        event_names::SENSE_STOPPED,
        Stage::Sense,
        "Sense task stopped",
        polls = report.polls,
        touches = report.touches,
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::device::SimulatedSensor;
    use rand::SeedableRng;

    fn view(cycle: u64, position: Option<usize>) -> TouchView {
        TouchView {
            position: position.and_then(Position::new),
            cycle,
            pending: false,
        }
    }

    #[test]
    fn schedule_fires_once_per_listed_cycle() {
        let mut s = ScheduledTouch::new([2, 4]);
        assert!(!s.poll(&view(1, Some(0))).unwrap());
        assert!(s.poll(&view(2, Some(1))).unwrap());
        // repeated polls of the same cycle do not fire again
        assert!(!s.poll(&view(2, Some(1))).unwrap());
        assert!(!s.poll(&view(3, Some(2))).unwrap());
        assert!(s.poll(&view(4, Some(3))).unwrap());
        assert_eq!(s.remaining(), 0);
    }

    #[test]
    fn schedule_skips_passed_timesteps() {
        let mut s = ScheduledTouch::new([2, 3, 6]);
        assert!(!s.poll(&view(5, Some(0))).unwrap());
        assert_eq!(s.remaining(), 1);
        assert!(s.poll(&view(6, Some(0))).unwrap());
    }

    #[test]
    fn state_touch_needs_dwell_at_target_or_mirror() {
        let mut s = StateTouch::new(Position::new(3).unwrap());
        assert!(!s.poll(&view(1, Some(3))).unwrap());
        assert!(!s.poll(&view(1, Some(0))).unwrap());
        assert!(!s.poll(&view(2, Some(5))).unwrap());
        assert!(s.poll(&view(2, Some(5))).unwrap());
        assert!(!s.poll(&view(3, Some(4))).unwrap());
        assert!(s.poll(&view(4, Some(3))).unwrap());
    }

    #[test]
    fn random_touch_extremes() {
        let mut never = RandomTouch::new(0.0, StdRng::seed_from_u64(1));
        let mut always = RandomTouch::new(1.0, StdRng::seed_from_u64(1));
        for _ in 0..100 {
            assert!(!never.poll(&view(0, None)).unwrap());
            assert!(always.poll(&view(0, None)).unwrap());
        }
    }

    #[test]
    fn sensor_probe_thresholds_at_zero() {
        let mut p = SensorProbe::new(SimulatedSensor::new([0.0, 0.01, -1.0]));
        assert!(!p.poll(&view(0, None)).unwrap());
        assert!(p.poll(&view(0, None)).unwrap());
        assert!(!p.poll(&view(0, None)).unwrap());
    }

    #[test]
    fn sense_loop_stops_and_acknowledges() {
        let touch = SharedTouchState::new();
        let stop = AtomicBool::new(true);
        let mut probe = ScheduledTouch::new([]);
        let report = run_sense(&mut probe, &touch, &stop, Duration::from_millis(1));
        // stop is checked after the first poll
        assert_eq!(report.polls, 1);
        assert!(touch.wait_polled(0, Duration::from_millis(1)));
    }
}
